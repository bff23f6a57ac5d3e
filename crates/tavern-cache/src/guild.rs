//! Handle onto a cached guild configuration row.

use tavern_db::Backend;
use tavern_types::{ChannelId, GuildId};

use crate::error::CacheError;
use crate::identity::{Row, commit};
use crate::rows::GuildConfig;

/// Shared handle to the single cached [`GuildConfig`] of one guild.
///
/// Reads return the last committed value. Setters persist the whole row
/// before returning.
#[derive(Clone)]
pub struct GuildHandle {
    id: GuildId,
    row: Row<GuildConfig>,
    backend: Backend,
}

impl GuildHandle {
    pub(crate) const fn new(id: GuildId, row: Row<GuildConfig>, backend: Backend) -> Self {
        Self { id, row, backend }
    }

    /// The guild this handle addresses.
    pub const fn id(&self) -> GuildId {
        self.id
    }

    /// Whether both handles share the same in-memory row.
    pub fn same_row(&self, other: &Self) -> bool {
        self.row.same_row(&other.row)
    }

    /// Copy of the whole row.
    pub async fn snapshot(&self) -> GuildConfig {
        self.row.read().await
    }

    /// The prefix override, if any.
    pub async fn prefix(&self) -> Option<String> {
        self.row.read().await.prefix
    }

    /// The prefix override, or `default` when none is set.
    pub async fn prefix_or(&self, default: &str) -> String {
        self.prefix().await.unwrap_or_else(|| default.to_owned())
    }

    /// The guild language, `"en"` unless overridden.
    pub async fn language(&self) -> String {
        self.row.read().await.language_or_default().to_owned()
    }

    /// The moderation log channel, if configured.
    pub async fn mod_log_channel(&self) -> Option<ChannelId> {
        self.row.read().await.mod_log_channel
    }

    /// Self-assignable role names in insertion order.
    pub async fn self_roles(&self) -> Vec<String> {
        self.row.read().await.self_roles
    }

    /// Set the command prefix. Rejects empty or whitespace-only prefixes.
    pub async fn set_prefix(&self, prefix: impl Into<String>) -> Result<(), CacheError> {
        let prefix = non_blank("prefix", prefix.into())?;
        self.update(|config| {
            config.prefix = Some(prefix);
        })
        .await
        .map(|_| ())
    }

    /// Set the language code. Rejects empty codes.
    pub async fn set_language(&self, language: impl Into<String>) -> Result<(), CacheError> {
        let language = non_blank("language", language.into())?;
        self.update(|config| {
            config.language = Some(language);
        })
        .await
        .map(|_| ())
    }

    /// Set the moderation log channel.
    pub async fn set_mod_log_channel(&self, channel: ChannelId) -> Result<(), CacheError> {
        self.update(|config| {
            config.mod_log_channel = Some(channel);
        })
        .await
        .map(|_| ())
    }

    /// Add a self-assignable role. Returns `false` if it was already present.
    pub async fn add_self_role(&self, role: impl Into<String>) -> Result<bool, CacheError> {
        let role = non_blank("self_roles", role.into())?;
        let mut added = false;
        self.update(|config| {
            if !config.self_roles.contains(&role) {
                config.self_roles.push(role);
                added = true;
            }
        })
        .await?;
        Ok(added)
    }

    /// Remove a self-assignable role. Returns `false` if it was not present.
    pub async fn remove_self_role(&self, role: &str) -> Result<bool, CacheError> {
        let mut removed = false;
        self.update(|config| {
            let before = config.self_roles.len();
            config.self_roles.retain(|r| r != role);
            removed = config.self_roles.len() != before;
        })
        .await?;
        Ok(removed)
    }

    /// Apply `change` under the row lock and write the result through.
    ///
    /// Skips the backend entirely when `change` leaves the row as it was.
    async fn update<F>(&self, change: F) -> Result<GuildConfig, CacheError>
    where
        F: FnOnce(&mut GuildConfig),
    {
        let guard = self.row.lock().await;
        let mut next = guard.clone();
        change(&mut next);
        if next == *guard {
            return Ok(next);
        }

        let backend = self.backend.clone();
        let id = self.id;
        let record = next.to_record();
        let committed = commit(guard, next, async move {
            backend.set_guild(id, &record).await
        })
        .await?;
        tracing::debug!(guild_id = %id, "Guild config written through");
        Ok(committed)
    }
}

fn non_blank(field: &'static str, value: String) -> Result<String, CacheError> {
    if value.trim().is_empty() {
        return Err(CacheError::InvalidValue {
            field,
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(value)
}
