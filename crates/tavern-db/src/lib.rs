//! Storage layer for the Tavern data core (`SQLite` + `PostgreSQL`).
//!
//! Both engines persist the same four tables and satisfy the same
//! read-after-write contract, exposed through the [`Backend`] enum. A
//! [`Backend`] is constructed once at start-up and handed to every
//! component that needs storage; there is no process-wide connection.
//!
//! # Layout
//!
//! ```text
//! guild_info  (guild_id PK, prefix, language, mod_log_channel, roles JSON)
//! member_info (member_id, guild_id) PK, warn_count
//! user_info   (user_id PK, balance, last_daily_claim unix-seconds)
//! nsfw_tags   (site, tag) PK, append-only
//! ```
//!
//! # Modules
//!
//! - [`backend`] -- The [`Backend`] enum (storage contract)
//! - [`sqlite`] -- Embedded single-file engine
//! - [`postgres`] -- Networked engine over a connection pool
//! - [`memory`] -- In-process engine for tests
//! - [`error`] -- Shared error type

pub mod backend;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use backend::Backend;
pub use error::DbError;
pub use memory::{MemoryBackend, MemoryStats};
pub use postgres::{PostgresBackend, PostgresConfig};
pub use sqlite::{SqliteBackend, SqliteConfig};
