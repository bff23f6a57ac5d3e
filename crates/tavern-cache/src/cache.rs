//! The entity cache: one identity map per row kind over a shared backend.

use tavern_db::Backend;
use tavern_types::{GuildId, MemberKey, UserId};

use crate::error::CacheError;
use crate::guild::GuildHandle;
use crate::identity::IdentityMap;
use crate::member::MemberHandle;
use crate::rows::{GuildConfig, MemberState, UserAccount};
use crate::user::UserHandle;

/// Number of rows currently held, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounts {
    /// Loaded guild rows.
    pub guilds: usize,
    /// Loaded member rows.
    pub members: usize,
    /// Loaded user rows.
    pub users: usize,
}

/// Identity-mapped, write-through cache of guild, member and user rows.
///
/// Rows are loaded lazily on first lookup and live as long as the cache.
/// A lookup never writes to the backend; rows reach storage on their first
/// successful mutation.
pub struct EntityCache {
    backend: Backend,
    guilds: IdentityMap<GuildId, GuildConfig>,
    members: IdentityMap<MemberKey, MemberState>,
    users: IdentityMap<UserId, UserAccount>,
}

impl EntityCache {
    /// Create an empty cache over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            guilds: IdentityMap::default(),
            members: IdentityMap::default(),
            users: IdentityMap::default(),
        }
    }

    /// The backend rows are persisted to.
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Get or create the handle for a guild.
    pub async fn guild(&self, guild_id: GuildId) -> Result<GuildHandle, CacheError> {
        let row = self
            .guilds
            .get_or_load(guild_id, || async {
                let record = self.backend.get_guild(guild_id).await?;
                tracing::debug!(guild_id = %guild_id, "Loaded guild row");
                Ok(GuildConfig::from_record(record))
            })
            .await?;
        Ok(GuildHandle::new(guild_id, row, self.backend.clone()))
    }

    /// Get or create the handle for a member.
    pub async fn member(&self, key: MemberKey) -> Result<MemberHandle, CacheError> {
        let row = self
            .members
            .get_or_load(key, || async {
                let record = self.backend.get_member(key).await?;
                tracing::debug!(member = %key, "Loaded member row");
                Ok(MemberState::from_record(record))
            })
            .await?;
        Ok(MemberHandle::new(key, row, self.backend.clone()))
    }

    /// Get or create the handle for a user account.
    pub async fn user(&self, user_id: UserId) -> Result<UserHandle, CacheError> {
        let row = self
            .users
            .get_or_load(user_id, || async {
                let record = self.backend.get_user(user_id).await?;
                tracing::debug!(user_id = %user_id, "Loaded user row");
                Ok(UserAccount::from_record(record))
            })
            .await?;
        Ok(UserHandle::new(user_id, row, self.backend.clone()))
    }

    /// Whether the guild row is loaded.
    pub fn is_guild_cached(&self, guild_id: GuildId) -> bool {
        self.guilds.contains(&guild_id)
    }

    /// Whether the member row is loaded.
    pub fn is_member_cached(&self, key: MemberKey) -> bool {
        self.members.contains(&key)
    }

    /// Whether the user row is loaded.
    pub fn is_user_cached(&self, user_id: UserId) -> bool {
        self.users.contains(&user_id)
    }

    /// Number of loaded rows per kind.
    pub fn counts(&self) -> CacheCounts {
        CacheCounts {
            guilds: self.guilds.len(),
            members: self.members.len(),
            users: self.users.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tavern_db::MemoryBackend;
    use tavern_types::ChannelId;

    use super::*;

    fn setup() -> (MemoryBackend, EntityCache) {
        let memory = MemoryBackend::new();
        let cache = EntityCache::new(memory.clone().into());
        (memory, cache)
    }

    #[tokio::test]
    async fn repeated_lookup_returns_same_row() {
        let (memory, cache) = setup();
        let first = cache.guild(GuildId(1)).await.unwrap();
        let second = cache.guild(GuildId(1)).await.unwrap();
        assert!(first.same_row(&second));
        assert_eq!(memory.stats().reads(), 1);
        assert_eq!(memory.stats().writes(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_lookups_create_one_row() {
        let (memory, cache) = setup();
        let cache = Arc::new(cache);

        let lookups = (0..16).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.user(UserId(5)).await })
        });
        let handles: Vec<UserHandle> = futures::future::join_all(lookups)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let first = handles.first().unwrap();
        assert!(handles.iter().all(|h| h.same_row(first)));
        assert_eq!(memory.stats().reads(), 1);
        assert_eq!(cache.counts().users, 1);
    }

    #[tokio::test]
    async fn prefix_is_per_guild_with_caller_default() {
        let (_, cache) = setup();
        cache.guild(GuildId(42)).await.unwrap().set_prefix("!").await.unwrap();

        let g42 = cache.guild(GuildId(42)).await.unwrap();
        let g43 = cache.guild(GuildId(43)).await.unwrap();
        assert_eq!(g42.prefix_or(">").await, "!");
        assert_eq!(g43.prefix_or(">").await, ">");
        assert_eq!(g43.prefix().await, None);
    }

    #[tokio::test]
    async fn writes_survive_a_fresh_cache() {
        let (memory, cache) = setup();
        let guild = cache.guild(GuildId(7)).await.unwrap();
        guild.set_prefix("?").await.unwrap();
        guild.set_language("de").await.unwrap();
        guild.set_mod_log_channel(ChannelId(99)).await.unwrap();
        guild.add_self_role("artist").await.unwrap();
        guild.set_prefix("%").await.unwrap();

        let member = cache.member(MemberKey::new(UserId(1), GuildId(7))).await.unwrap();
        member.add_warning().await.unwrap();
        member.add_warning().await.unwrap();

        let restarted = EntityCache::new(memory.into());
        let reloaded = restarted.guild(GuildId(7)).await.unwrap().snapshot().await;
        assert_eq!(reloaded.prefix.as_deref(), Some("%"));
        assert_eq!(reloaded.language_or_default(), "de");
        assert_eq!(reloaded.mod_log_channel, Some(ChannelId(99)));
        assert_eq!(reloaded.self_roles, vec!["artist".to_owned()]);

        let member = restarted
            .member(MemberKey::new(UserId(1), GuildId(7)))
            .await
            .unwrap();
        assert_eq!(member.warn_count().await, 2);
    }

    #[tokio::test]
    async fn failed_write_rolls_back_memory() {
        let (memory, cache) = setup();
        let guild = cache.guild(GuildId(3)).await.unwrap();
        guild.set_prefix("!").await.unwrap();

        memory.set_unavailable(true);
        let result = guild.set_prefix("?").await;
        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert_eq!(guild.prefix().await.as_deref(), Some("!"));

        memory.set_unavailable(false);
        let restarted = EntityCache::new(memory.into());
        let reloaded = restarted.guild(GuildId(3)).await.unwrap();
        assert_eq!(reloaded.prefix().await.as_deref(), Some("!"));
    }

    #[tokio::test]
    async fn failed_load_propagates_and_is_retried() {
        let (memory, cache) = setup();
        memory.set_unavailable(true);
        assert!(cache.user(UserId(1)).await.is_err());
        assert!(!cache.is_user_cached(UserId(1)));

        memory.set_unavailable(false);
        assert!(cache.user(UserId(1)).await.is_ok());
        assert!(cache.is_user_cached(UserId(1)));
    }

    #[tokio::test]
    async fn self_roles_stay_unique() {
        let (memory, cache) = setup();
        let guild = cache.guild(GuildId(1)).await.unwrap();
        assert!(guild.add_self_role("gamer").await.unwrap());
        assert!(!guild.add_self_role("gamer").await.unwrap());
        assert!(guild.add_self_role("artist").await.unwrap());
        assert_eq!(
            guild.self_roles().await,
            vec!["gamer".to_owned(), "artist".to_owned()]
        );

        assert!(guild.remove_self_role("gamer").await.unwrap());
        assert!(!guild.remove_self_role("gamer").await.unwrap());
        assert_eq!(guild.self_roles().await, vec!["artist".to_owned()]);

        // Two adds and one remove reached the backend; the no-ops did not.
        assert_eq!(memory.stats().writes(), 3);
    }

    #[tokio::test]
    async fn blank_values_are_rejected() {
        let (memory, cache) = setup();
        let guild = cache.guild(GuildId(1)).await.unwrap();
        assert!(matches!(
            guild.set_prefix("  ").await,
            Err(CacheError::InvalidValue { field: "prefix", .. })
        ));
        assert!(guild.set_language("").await.is_err());
        assert!(guild.add_self_role("").await.is_err());
        assert_eq!(memory.stats().writes(), 0);
        assert_eq!(guild.language().await, "en");
    }

    #[tokio::test]
    async fn warnings_clamp_at_zero() {
        let (_, cache) = setup();
        let member = cache.member(MemberKey::new(UserId(2), GuildId(1))).await.unwrap();
        assert_eq!(member.remove_warning().await.unwrap(), 0);
        assert_eq!(member.add_warning().await.unwrap(), 1);
        assert_eq!(member.remove_warning().await.unwrap(), 0);
        assert_eq!(member.remove_warning().await.unwrap(), 0);

        member.set_warn_count(u32::MAX).await.unwrap();
        assert!(matches!(
            member.add_warning().await,
            Err(CacheError::Overflow { .. })
        ));
        member.clear_warnings().await.unwrap();
        assert_eq!(member.warn_count().await, 0);
    }

    #[tokio::test]
    async fn members_are_scoped_per_guild() {
        let (_, cache) = setup();
        let here = cache.member(MemberKey::new(UserId(2), GuildId(1))).await.unwrap();
        let there = cache.member(MemberKey::new(UserId(2), GuildId(2))).await.unwrap();
        here.add_warning().await.unwrap();
        assert!(!here.same_row(&there));
        assert_eq!(there.warn_count().await, 0);
    }

    #[tokio::test]
    async fn dropped_lock_leaves_account_unchanged() {
        let (memory, cache) = setup();
        let user = cache.user(UserId(9)).await.unwrap();
        {
            let lock = user.lock().await;
            assert_eq!(lock.account().balance, 0);
        }
        assert_eq!(user.balance().await, 0);
        assert_eq!(memory.stats().writes(), 0);

        let lock = user.lock().await;
        let mut next = lock.account();
        next.balance = 40;
        lock.commit(next).await.unwrap();
        assert_eq!(user.balance().await, 40);
    }
}
