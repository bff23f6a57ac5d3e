//! `SQLite` backend: the embedded single-file storage engine.
//!
//! Shares its SQL shape with the `PostgreSQL` backend (`ON CONFLICT` upserts
//! with `COALESCE` so unset fields are preserved), differing only in
//! placeholder syntax and pool setup.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, Sqlite, SqlitePool};
use tavern_types::records::{datetime_to_timestamp, timestamp_to_datetime};
use tavern_types::roles::{decode_roles, encode_roles};
use tavern_types::{ChannelId, GuildId, GuildRecord, MemberKey, MemberRecord, UserId, UserRecord};

use crate::error::DbError;

/// URL of a private in-memory database.
const MEMORY_URL: &str = "sqlite::memory:";

/// Default maximum number of connections for file-backed databases.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default time to wait for a connection.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database URL, e.g. `sqlite://tavern.db` or `sqlite::memory:`.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl SqliteConfig {
    /// Configuration for a database file at `path`, created if missing.
    pub fn file(path: &str) -> Self {
        Self {
            url: format!("sqlite://{path}"),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Configuration for a private in-memory database.
    ///
    /// Every `SQLite` memory connection is its own database, so the pool is
    /// pinned to a single long-lived connection.
    pub fn in_memory() -> Self {
        Self {
            url: MEMORY_URL.to_owned(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Backend over an `SQLite` connection pool.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Sqlx`] if the database cannot be opened.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::Config(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout);

        if config.is_memory() {
            // Dropping the only connection would drop the database with it.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options.connect_with(options).await?;

        tracing::info!(
            url = config.url,
            max_connections = config.max_connections,
            "Opened SQLite database"
        );

        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, DbError> {
        let backend = Self::connect(&SqliteConfig::in_memory()).await?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Run all pending migrations from `migrations/sqlite`.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        tracing::info!("SQLite migrations completed");
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }

    pub(crate) async fn get_guild(&self, guild_id: GuildId) -> Result<GuildRecord, DbError> {
        let row = sqlx::query(
            "SELECT prefix, language, mod_log_channel, roles FROM guild_info WHERE guild_id = ?",
        )
        .bind(guild_id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map_or_else(|| Ok(GuildRecord::default()), |r| guild_from_row(&r))
    }

    pub(crate) async fn set_guild(
        &self,
        guild_id: GuildId,
        record: &GuildRecord,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO guild_info (guild_id, prefix, language, mod_log_channel, roles)
              VALUES (?, ?, ?, ?, ?)
              ON CONFLICT (guild_id) DO UPDATE SET
                  prefix = COALESCE(excluded.prefix, guild_info.prefix),
                  language = COALESCE(excluded.language, guild_info.language),
                  mod_log_channel = COALESCE(excluded.mod_log_channel, guild_info.mod_log_channel),
                  roles = COALESCE(excluded.roles, guild_info.roles)",
        )
        .bind(guild_id.get())
        .bind(record.prefix.clone())
        .bind(record.language.clone())
        .bind(record.mod_log_channel.map(ChannelId::get))
        .bind(record.roles.as_deref().map(encode_roles))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn get_member(&self, key: MemberKey) -> Result<MemberRecord, DbError> {
        let row =
            sqlx::query("SELECT warn_count FROM member_info WHERE member_id = ? AND guild_id = ?")
                .bind(key.member_id.get())
                .bind(key.guild_id.get())
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(r) => Ok(MemberRecord {
                warn_count: r.try_get("warn_count")?,
            }),
            None => Ok(MemberRecord::default()),
        }
    }

    pub(crate) async fn set_member(
        &self,
        key: MemberKey,
        record: &MemberRecord,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO member_info (member_id, guild_id, warn_count)
              VALUES (?, ?, ?)
              ON CONFLICT (member_id, guild_id) DO UPDATE SET
                  warn_count = COALESCE(excluded.warn_count, member_info.warn_count)",
        )
        .bind(key.member_id.get())
        .bind(key.guild_id.get())
        .bind(record.warn_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn get_user(&self, user_id: UserId) -> Result<UserRecord, DbError> {
        let row = sqlx::query("SELECT balance, last_daily_claim FROM user_info WHERE user_id = ?")
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(UserRecord {
                balance: r.try_get("balance")?,
                last_daily_claim: timestamp_to_datetime(r.try_get("last_daily_claim")?),
            }),
            None => Ok(UserRecord::default()),
        }
    }

    pub(crate) async fn set_user(&self, user_id: UserId, record: &UserRecord) -> Result<(), DbError> {
        upsert_user(user_id, record).execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) async fn set_user_pair(
        &self,
        first: (UserId, &UserRecord),
        second: (UserId, &UserRecord),
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        upsert_user(first.0, first.1).execute(&mut *tx).await?;
        upsert_user(second.0, second.1).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub(crate) async fn get_all_tags(&self) -> Result<BTreeMap<String, Vec<String>>, DbError> {
        let rows = sqlx::query("SELECT site, tag FROM nsfw_tags ORDER BY site, tag")
            .fetch_all(&self.pool)
            .await?;
        let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in &rows {
            let site: String = row.try_get("site")?;
            let tag: String = row.try_get("tag")?;
            tags.entry(site).or_default().push(tag);
        }
        Ok(tags)
    }

    pub(crate) async fn append_tags(&self, site: &str, tags: &[String]) -> Result<(), DbError> {
        if tags.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for tag in tags {
            sqlx::query("INSERT INTO nsfw_tags (site, tag) VALUES (?, ?) ON CONFLICT (site, tag) DO NOTHING")
                .bind(site.to_owned())
                .bind(tag.clone())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::debug!(site, count = tags.len(), "Appended tags");
        Ok(())
    }
}

/// Build the upsert statement for one `user_info` row.
fn upsert_user(user_id: UserId, record: &UserRecord) -> Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(
        r"INSERT INTO user_info (user_id, balance, last_daily_claim)
          VALUES (?, ?, ?)
          ON CONFLICT (user_id) DO UPDATE SET
              balance = COALESCE(excluded.balance, user_info.balance),
              last_daily_claim = COALESCE(excluded.last_daily_claim, user_info.last_daily_claim)",
    )
    .bind(user_id.get())
    .bind(record.balance)
    .bind(datetime_to_timestamp(record.last_daily_claim))
}

fn guild_from_row(row: &SqliteRow) -> Result<GuildRecord, DbError> {
    let roles: Option<String> = row.try_get("roles")?;
    let mod_log: Option<i64> = row.try_get("mod_log_channel")?;
    Ok(GuildRecord {
        prefix: row.try_get("prefix")?,
        language: row.try_get("language")?,
        mod_log_channel: mod_log.map(ChannelId),
        roles: roles.map(|r| decode_roles(&r)),
    })
}
