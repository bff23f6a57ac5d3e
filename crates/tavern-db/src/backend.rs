//! The storage contract shared by every engine.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible. Each variant wraps one adapter; all adapters give the
//! same read-after-write result for a given key.

use std::collections::BTreeMap;

use tavern_types::{GuildId, GuildRecord, MemberKey, MemberRecord, UserId, UserRecord};

use crate::error::DbError;
use crate::memory::MemoryBackend;
use crate::postgres::PostgresBackend;
use crate::sqlite::SqliteBackend;

/// A relational store holding guild, member, user and tag rows.
///
/// Cheap to clone: every variant is a handle onto a shared pool.
#[derive(Clone)]
pub enum Backend {
    /// Embedded single-file `SQLite` database.
    Sqlite(SqliteBackend),
    /// Networked `PostgreSQL` database.
    Postgres(PostgresBackend),
    /// In-process storage (tests).
    Memory(MemoryBackend),
}

impl Backend {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Create the schema if it does not exist yet.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.run_migrations().await,
            Self::Postgres(b) => b.run_migrations().await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Close the underlying pool. Later calls fail.
    pub async fn close(&self) {
        match self {
            Self::Sqlite(b) => b.close().await,
            Self::Postgres(b) => b.close().await,
            Self::Memory(_) => {}
        }
    }

    /// Read a guild row. Absence is an all-`None` record, never an error.
    pub async fn get_guild(&self, guild_id: GuildId) -> Result<GuildRecord, DbError> {
        match self {
            Self::Sqlite(b) => b.get_guild(guild_id).await,
            Self::Postgres(b) => b.get_guild(guild_id).await,
            Self::Memory(b) => b.get_guild(guild_id).await,
        }
    }

    /// Upsert a guild row. `None` fields keep their stored values.
    pub async fn set_guild(&self, guild_id: GuildId, record: &GuildRecord) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.set_guild(guild_id, record).await,
            Self::Postgres(b) => b.set_guild(guild_id, record).await,
            Self::Memory(b) => b.set_guild(guild_id, record).await,
        }
    }

    /// Read a member row.
    pub async fn get_member(&self, key: MemberKey) -> Result<MemberRecord, DbError> {
        match self {
            Self::Sqlite(b) => b.get_member(key).await,
            Self::Postgres(b) => b.get_member(key).await,
            Self::Memory(b) => b.get_member(key).await,
        }
    }

    /// Upsert a member row.
    pub async fn set_member(&self, key: MemberKey, record: &MemberRecord) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.set_member(key, record).await,
            Self::Postgres(b) => b.set_member(key, record).await,
            Self::Memory(b) => b.set_member(key, record).await,
        }
    }

    /// Read a user row.
    pub async fn get_user(&self, user_id: UserId) -> Result<UserRecord, DbError> {
        match self {
            Self::Sqlite(b) => b.get_user(user_id).await,
            Self::Postgres(b) => b.get_user(user_id).await,
            Self::Memory(b) => b.get_user(user_id).await,
        }
    }

    /// Upsert a user row.
    pub async fn set_user(&self, user_id: UserId, record: &UserRecord) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.set_user(user_id, record).await,
            Self::Postgres(b) => b.set_user(user_id, record).await,
            Self::Memory(b) => b.set_user(user_id, record).await,
        }
    }

    /// Upsert two user rows in one transaction: both persist or neither does.
    pub async fn set_user_pair(
        &self,
        first: (UserId, &UserRecord),
        second: (UserId, &UserRecord),
    ) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.set_user_pair(first, second).await,
            Self::Postgres(b) => b.set_user_pair(first, second).await,
            Self::Memory(b) => b.set_user_pair(first, second).await,
        }
    }

    /// Load every known tag, grouped by site. Used once at start-up.
    pub async fn get_all_tags(&self) -> Result<BTreeMap<String, Vec<String>>, DbError> {
        match self {
            Self::Sqlite(b) => b.get_all_tags().await,
            Self::Postgres(b) => b.get_all_tags().await,
            Self::Memory(b) => b.get_all_tags().await,
        }
    }

    /// Record tags for `site`. Pairs that already exist are ignored.
    pub async fn append_tags(&self, site: &str, tags: &[String]) -> Result<(), DbError> {
        match self {
            Self::Sqlite(b) => b.append_tags(site, tags).await,
            Self::Postgres(b) => b.append_tags(site, tags).await,
            Self::Memory(b) => b.append_tags(site, tags).await,
        }
    }
}

impl From<SqliteBackend> for Backend {
    fn from(backend: SqliteBackend) -> Self {
        Self::Sqlite(backend)
    }
}

impl From<PostgresBackend> for Backend {
    fn from(backend: PostgresBackend) -> Self {
        Self::Postgres(backend)
    }
}

impl From<MemoryBackend> for Backend {
    fn from(backend: MemoryBackend) -> Self {
        Self::Memory(backend)
    }
}
