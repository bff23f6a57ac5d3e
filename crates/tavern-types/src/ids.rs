//! Type-safe identifier wrappers around chat-platform snowflakes.
//!
//! Guilds, users and channels are all addressed by 64-bit integers on the
//! wire. Wrapping each in its own newtype prevents passing a channel id
//! where a guild id is expected. Values are kept as `i64` because that is
//! the column type on both storage engines (`INTEGER` / `BIGINT`).

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the raw integer value as stored in the database.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a guild (server).
    GuildId
}

define_id! {
    /// Unique identifier for a user account. Members are users scoped to a guild.
    UserId
}

define_id! {
    /// Unique identifier for a text channel.
    ChannelId
}

/// Composite key addressing one member inside one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberKey {
    /// The member's user id.
    pub member_id: UserId,
    /// The guild the member belongs to.
    pub guild_id: GuildId,
}

impl MemberKey {
    /// Build a key from a member and guild id.
    pub const fn new(member_id: UserId, guild_id: GuildId) -> Self {
        Self {
            member_id,
            guild_id,
        }
    }
}

impl core::fmt::Display for MemberKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.member_id, self.guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_integer() {
        assert_eq!(GuildId(42).to_string(), "42");
        assert_eq!(MemberKey::new(UserId(7), GuildId(42)).to_string(), "7@42");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&UserId(9)).ok();
        assert_eq!(json.as_deref(), Some("9"));
    }

    #[test]
    fn ids_order_numerically() {
        assert!(UserId(-1) < UserId(0));
        assert!(UserId(10) > UserId(9));
    }
}
