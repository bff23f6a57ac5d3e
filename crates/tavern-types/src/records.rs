//! Storage records exchanged with a backend.
//!
//! Every field is optional. On read, `None` means the column (or the whole
//! row) does not exist; on write, `None` means "keep what is stored". Callers
//! resolve defaults -- the backend never invents values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChannelId;

/// One row of `guild_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    /// Command prefix override.
    pub prefix: Option<String>,
    /// Language code override.
    pub language: Option<String>,
    /// Channel receiving moderation log messages.
    pub mod_log_channel: Option<ChannelId>,
    /// Self-assignable role names, in insertion order.
    pub roles: Option<Vec<String>>,
}

impl GuildRecord {
    /// Whether no field is set (the row is absent).
    pub const fn is_empty(&self) -> bool {
        self.prefix.is_none()
            && self.language.is_none()
            && self.mod_log_channel.is_none()
            && self.roles.is_none()
    }
}

/// One row of `member_info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Number of active warnings.
    pub warn_count: Option<i64>,
}

/// One row of `user_info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Currency balance.
    pub balance: Option<i64>,
    /// When the daily bonus was last claimed.
    pub last_daily_claim: Option<DateTime<Utc>>,
}

/// Convert a stored Unix timestamp (seconds) into a UTC datetime.
///
/// Out-of-range values are treated as absent.
pub fn timestamp_to_datetime(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Convert a UTC datetime into the stored Unix timestamp (seconds).
pub fn datetime_to_timestamp(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|t| t.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_guild_record_is_empty() {
        assert!(GuildRecord::default().is_empty());
        let set = GuildRecord {
            prefix: Some("!".to_owned()),
            ..GuildRecord::default()
        };
        assert!(!set.is_empty());
    }

    #[test]
    fn timestamps_convert_both_ways() {
        let at = DateTime::from_timestamp(1_700_000_000, 0);
        assert_eq!(datetime_to_timestamp(at), Some(1_700_000_000));
        assert_eq!(timestamp_to_datetime(Some(1_700_000_000)), at);
        assert_eq!(timestamp_to_datetime(None), None);
    }
}
