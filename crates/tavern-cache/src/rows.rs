//! In-memory row values and their conversions to and from backend records.

use chrono::{DateTime, Utc};
use tavern_types::roles::dedup_roles;
use tavern_types::{ChannelId, GuildRecord, MemberRecord, UserRecord};

/// Language used when a guild has not chosen one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Cached configuration of one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildConfig {
    /// Command prefix override; callers supply their own default.
    pub prefix: Option<String>,
    /// Language code override; see [`GuildConfig::language_or_default`].
    pub language: Option<String>,
    /// Channel receiving moderation log messages.
    pub mod_log_channel: Option<ChannelId>,
    /// Self-assignable role names, unique, in insertion order.
    pub self_roles: Vec<String>,
}

impl GuildConfig {
    /// The configured language, or [`DEFAULT_LANGUAGE`].
    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub(crate) fn from_record(record: GuildRecord) -> Self {
        Self {
            prefix: record.prefix,
            language: record.language,
            mod_log_channel: record.mod_log_channel,
            self_roles: record.roles.map(dedup_roles).unwrap_or_default(),
        }
    }

    pub(crate) fn to_record(&self) -> GuildRecord {
        GuildRecord {
            prefix: self.prefix.clone(),
            language: self.language.clone(),
            mod_log_channel: self.mod_log_channel,
            roles: Some(self.self_roles.clone()),
        }
    }
}

/// Cached moderation state of one member in one guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberState {
    /// Number of active warnings.
    pub warn_count: u32,
}

impl MemberState {
    pub(crate) fn from_record(record: MemberRecord) -> Self {
        let stored = record.warn_count.unwrap_or(0);
        let warn_count = u32::try_from(stored).unwrap_or_else(|_| {
            tracing::warn!(stored, "Stored warn_count out of range, clamping");
            if stored < 0 { 0 } else { u32::MAX }
        });
        Self { warn_count }
    }

    pub(crate) fn to_record(self) -> MemberRecord {
        MemberRecord {
            warn_count: Some(i64::from(self.warn_count)),
        }
    }
}

/// Cached currency account of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserAccount {
    /// Current balance.
    pub balance: i64,
    /// When the daily bonus was last claimed.
    pub last_daily_claim: Option<DateTime<Utc>>,
}

impl UserAccount {
    pub(crate) fn from_record(record: UserRecord) -> Self {
        Self {
            balance: record.balance.unwrap_or(0),
            last_daily_claim: record.last_daily_claim,
        }
    }

    pub(crate) const fn to_record(self) -> UserRecord {
        UserRecord {
            balance: Some(self.balance),
            last_daily_claim: self.last_daily_claim,
        }
    }
}
