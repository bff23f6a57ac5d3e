//! Shared type definitions for the Tavern data layer.
//!
//! Identifiers and storage records used by every other crate in the
//! workspace. Nothing here performs I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Typed integer wrappers for guild, user and channel ids
//! - [`records`] -- Backend row records (all fields optional)
//! - [`roles`] -- JSON codec for stored self-assignable role lists

pub mod ids;
pub mod records;
pub mod roles;

pub use ids::{ChannelId, GuildId, MemberKey, UserId};
pub use records::{GuildRecord, MemberRecord, UserRecord};
