//! Shared state handed to every command handler.
//!
//! [`Tavern`] bundles the entity cache, the ledger and the tag index over a
//! single storage backend, plus the process-wide guild defaults.

use std::sync::Arc;

use tavern_cache::{CacheCounts, EntityCache};
use tavern_db::{Backend, DbError};
use tavern_ledger::{DailyBonus, Ledger};
use tavern_tags::TagIndex;
use tavern_types::GuildId;

use crate::error::BotError;

/// Everything a command handler needs, cheap to share behind an `Arc`.
pub struct Tavern {
    /// Guild, member and user rows.
    pub cache: Arc<EntityCache>,
    /// Currency operations over the cached accounts.
    pub ledger: Ledger,
    /// Known content tags per site.
    pub tags: TagIndex,
    default_prefix: String,
}

impl Tavern {
    /// Wire the components over `backend`, warming the tag index from it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored tags cannot be read.
    pub async fn open(
        backend: Backend,
        bonus: DailyBonus,
        default_prefix: String,
    ) -> Result<Self, DbError> {
        let cache = Arc::new(EntityCache::new(backend.clone()));
        let ledger = Ledger::new(Arc::clone(&cache), bonus);
        let tags = TagIndex::load(backend).await?;
        Ok(Self {
            cache,
            ledger,
            tags,
            default_prefix,
        })
    }

    /// The command prefix of `guild`, or the process default.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Cache`] if the guild row cannot be loaded.
    pub async fn prefix_for(&self, guild: GuildId) -> Result<String, BotError> {
        let handle = self.cache.guild(guild).await?;
        Ok(handle.prefix_or(&self.default_prefix).await)
    }

    /// Loaded rows per kind.
    pub fn cached(&self) -> CacheCounts {
        self.cache.counts()
    }

    /// Close the storage pool.
    pub async fn shutdown(&self) {
        self.cache.backend().close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tavern_db::MemoryBackend;
    use tavern_ledger::TransferMode;
    use tavern_types::UserId;

    use super::*;

    async fn open(memory: &MemoryBackend) -> Tavern {
        Tavern::open(memory.clone().into(), DailyBonus::default(), ">".to_owned())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn prefix_falls_back_to_process_default() {
        let memory = MemoryBackend::new();
        let tavern = open(&memory).await;
        tavern
            .cache
            .guild(GuildId(42))
            .await
            .unwrap()
            .set_prefix("!")
            .await
            .unwrap();

        assert_eq!(tavern.prefix_for(GuildId(42)).await.unwrap(), "!");
        assert_eq!(tavern.prefix_for(GuildId(43)).await.unwrap(), ">");
        assert_eq!(tavern.cached().guilds, 2);
    }

    #[tokio::test]
    async fn components_share_one_backend() {
        let memory = MemoryBackend::new();
        let tavern = open(&memory).await;
        tavern.ledger.change_balance(UserId(1), 500).await.unwrap();
        tavern
            .ledger
            .transfer(UserId(1), UserId(2), 200, TransferMode::Checked)
            .await
            .unwrap();
        tavern.tags.add_tags("danbooru", ["catgirl"]).await.unwrap();

        let reopened = open(&memory).await;
        assert_eq!(reopened.ledger.get_balance(UserId(2)).await.unwrap(), 200);
        assert!(reopened.tags.tag_exists("danbooru", "catgirl").await);
    }

    #[tokio::test]
    async fn open_fails_when_storage_is_down() {
        let memory = MemoryBackend::new();
        memory.set_unavailable(true);
        let result =
            Tavern::open(memory.into(), DailyBonus::default(), ">".to_owned()).await;
        assert!(result.is_err());
    }
}
