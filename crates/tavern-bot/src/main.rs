//! Tavern bot process.
//!
//! Wires the data layer together: loads configuration, opens the chosen
//! storage engine, brings its schema up to date, and builds the shared
//! [`Tavern`] state that command handlers run against.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tavern-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing), then apply env overrides
//! 3. Connect to `SQLite` or `PostgreSQL` and run migrations
//! 4. Build the entity cache and ledger, warm the tag index
//! 5. Wait for Ctrl-C, then close the pool

use std::path::Path;

use tavern_db::{Backend, PostgresBackend, PostgresConfig, SqliteBackend, SqliteConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tavern_bot::config::{LoggingConfig, StorageConfig};
use tavern_bot::{BotConfig, BotError, StorageEngine, Tavern};

/// Default location of the configuration file.
const CONFIG_PATH: &str = "tavern-config.yaml";

/// Application entry point for the bot.
///
/// # Errors
///
/// Returns an error if configuration, storage or start-up fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = Path::new(CONFIG_PATH);
    let mut config = BotConfig::load_or_default(config_path).map_err(BotError::from)?;

    // 2. Initialize structured logging, then apply env overrides.
    init_tracing(&config.logging);
    config.storage.apply_env_overrides();
    info!(
        config_file = config_path.exists(),
        engine = %config.storage.engine,
        default_prefix = %config.guild.default_prefix,
        daily_first_time = config.economy.daily_first_time,
        daily_repeat = config.economy.daily_repeat,
        "tavern-bot starting"
    );

    // 3. Open storage.
    let backend = connect_backend(&config.storage).await?;

    // 4. Build shared state.
    let tavern = Tavern::open(
        backend,
        config.economy.daily_bonus(),
        config.guild.default_prefix.clone(),
    )
    .await
    .map_err(BotError::from)?;
    info!(
        tag_sites = tavern.tags.sites().len(),
        daily_bonus = ?tavern.ledger.bonus(),
        "Data layer ready"
    );

    // 5. Run until interrupted.
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BotError::Signal {
            message: format!("failed to listen for Ctrl-C: {e}"),
        })?;

    let cached = tavern.cached();
    info!(
        guilds = cached.guilds,
        members = cached.members,
        users = cached.users,
        "Shutting down"
    );
    tavern.shutdown().await;
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Connect to the configured engine and bring its schema up to date.
async fn connect_backend(storage: &StorageConfig) -> Result<Backend, BotError> {
    let backend: Backend = match storage.engine {
        StorageEngine::Sqlite => {
            let sqlite = SqliteConfig::file(&storage.sqlite_path)
                .with_max_connections(storage.max_connections)
                .with_connect_timeout(storage.connect_timeout());
            SqliteBackend::connect(&sqlite).await?.into()
        }
        StorageEngine::Postgres => {
            let postgres = PostgresConfig::new(&storage.postgres_url)
                .with_max_connections(storage.max_connections)
                .with_connect_timeout(storage.connect_timeout());
            PostgresBackend::connect(&postgres).await?.into()
        }
    };
    backend.run_migrations().await?;
    info!(engine = backend.name(), "Storage ready");
    Ok(backend)
}
