//! In-process backend with the same read-after-write semantics as the SQL
//! engines.
//!
//! Used by tests across the workspace. Three hooks exist that the SQL engines
//! do not have: [`MemoryBackend::set_unavailable`] makes every operation fail
//! with [`DbError::Unavailable`], [`MemoryBackend::set_write_latency`] stalls
//! every write, and [`MemoryBackend::stats`] counts calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tavern_types::{GuildId, GuildRecord, MemberKey, MemberRecord, UserId, UserRecord};
use tokio::sync::Mutex;

use crate::error::DbError;

/// Call counters for a [`MemoryBackend`].
#[derive(Debug, Default)]
pub struct MemoryStats {
    reads: AtomicU64,
    writes: AtomicU64,
    tags_appended: AtomicU64,
}

impl MemoryStats {
    /// Number of `get_*` calls that reached storage.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `set_*` calls that reached storage (a pair write counts once).
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of tags newly inserted by `append_tags`.
    pub fn tags_appended(&self) -> u64 {
        self.tags_appended.load(Ordering::Relaxed)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_tags(&self, n: u64) {
        self.tags_appended.fetch_add(n, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct Tables {
    guilds: HashMap<GuildId, GuildRecord>,
    members: HashMap<MemberKey, MemberRecord>,
    users: HashMap<UserId, UserRecord>,
    tags: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    write_latency_ms: AtomicU64,
    stats: MemoryStats,
}

/// Backend holding all rows in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the backend offline (`true`) or back online (`false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Sleep for `latency` before every write is applied.
    ///
    /// The write still lands once the sleep ends, whether or not anyone is
    /// still waiting for it.
    pub fn set_write_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.write_latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Call counters.
    pub fn stats(&self) -> &MemoryStats {
        &self.inner.stats
    }

    /// Yield once, then fail if the backend is offline.
    ///
    /// The yield stands in for network or disk latency so that concurrent
    /// callers interleave the way they would against a real engine.
    async fn io(&self) -> Result<(), DbError> {
        tokio::task::yield_now().await;
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory backend is offline".to_owned()));
        }
        Ok(())
    }

    /// [`Self::io`] plus the configured write latency.
    async fn write_io(&self) -> Result<(), DbError> {
        self.io().await?;
        let millis = self.inner.write_latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        Ok(())
    }

    pub(crate) async fn get_guild(&self, guild_id: GuildId) -> Result<GuildRecord, DbError> {
        self.io().await?;
        self.inner.stats.record_read();
        let tables = self.inner.tables.lock().await;
        Ok(tables.guilds.get(&guild_id).cloned().unwrap_or_default())
    }

    pub(crate) async fn set_guild(
        &self,
        guild_id: GuildId,
        record: &GuildRecord,
    ) -> Result<(), DbError> {
        self.write_io().await?;
        self.inner.stats.record_write();
        let mut tables = self.inner.tables.lock().await;
        let stored = tables.guilds.entry(guild_id).or_default();
        if record.prefix.is_some() {
            stored.prefix.clone_from(&record.prefix);
        }
        if record.language.is_some() {
            stored.language.clone_from(&record.language);
        }
        if record.mod_log_channel.is_some() {
            stored.mod_log_channel = record.mod_log_channel;
        }
        if record.roles.is_some() {
            stored.roles.clone_from(&record.roles);
        }
        Ok(())
    }

    pub(crate) async fn get_member(&self, key: MemberKey) -> Result<MemberRecord, DbError> {
        self.io().await?;
        self.inner.stats.record_read();
        let tables = self.inner.tables.lock().await;
        Ok(tables.members.get(&key).copied().unwrap_or_default())
    }

    pub(crate) async fn set_member(
        &self,
        key: MemberKey,
        record: &MemberRecord,
    ) -> Result<(), DbError> {
        self.write_io().await?;
        self.inner.stats.record_write();
        let mut tables = self.inner.tables.lock().await;
        let stored = tables.members.entry(key).or_default();
        if record.warn_count.is_some() {
            stored.warn_count = record.warn_count;
        }
        Ok(())
    }

    pub(crate) async fn get_user(&self, user_id: UserId) -> Result<UserRecord, DbError> {
        self.io().await?;
        self.inner.stats.record_read();
        let tables = self.inner.tables.lock().await;
        Ok(tables.users.get(&user_id).copied().unwrap_or_default())
    }

    pub(crate) async fn set_user(&self, user_id: UserId, record: &UserRecord) -> Result<(), DbError> {
        self.write_io().await?;
        self.inner.stats.record_write();
        let mut tables = self.inner.tables.lock().await;
        merge_user(&mut tables, user_id, record);
        Ok(())
    }

    pub(crate) async fn set_user_pair(
        &self,
        first: (UserId, &UserRecord),
        second: (UserId, &UserRecord),
    ) -> Result<(), DbError> {
        self.write_io().await?;
        self.inner.stats.record_write();
        let mut tables = self.inner.tables.lock().await;
        merge_user(&mut tables, first.0, first.1);
        merge_user(&mut tables, second.0, second.1);
        Ok(())
    }

    pub(crate) async fn get_all_tags(&self) -> Result<BTreeMap<String, Vec<String>>, DbError> {
        self.io().await?;
        self.inner.stats.record_read();
        let tables = self.inner.tables.lock().await;
        Ok(tables
            .tags
            .iter()
            .map(|(site, tags)| (site.clone(), tags.iter().cloned().collect()))
            .collect())
    }

    pub(crate) async fn append_tags(&self, site: &str, tags: &[String]) -> Result<(), DbError> {
        self.write_io().await?;
        let mut tables = self.inner.tables.lock().await;
        let known = tables.tags.entry(site.to_owned()).or_default();
        let mut inserted: u64 = 0;
        for tag in tags {
            if known.insert(tag.clone()) {
                inserted = inserted.saturating_add(1);
            }
        }
        self.inner.stats.record_tags(inserted);
        Ok(())
    }
}

fn merge_user(tables: &mut Tables, user_id: UserId, record: &UserRecord) {
    let stored = tables.users.entry(user_id).or_default();
    if record.balance.is_some() {
        stored.balance = record.balance;
    }
    if record.last_daily_claim.is_some() {
        stored.last_daily_claim = record.last_daily_claim;
    }
}
