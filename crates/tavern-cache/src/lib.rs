//! Identity-mapped, write-through entity cache.
//!
//! Command handlers share one [`EntityCache`]. For every key it holds
//! exactly one in-memory row, created from the backend on first lookup.
//! Every mutation reaches the backend before the setter returns; when the
//! backend write fails, the in-memory row keeps its previous value.
//!
//! # Concurrency
//!
//! - Creation: per-key `OnceCell` inside a `DashMap`; racing first lookups
//!   share one backend read and one row.
//! - Mutation: each row is an async mutex held across the backend write.
//!   The write and the in-memory publish run in a spawned task that owns
//!   the lock, so a cancelled caller cannot leave memory and storage apart.
//!
//! # Modules
//!
//! - [`cache`] -- [`EntityCache`] and per-kind lookups
//! - [`guild`], [`member`], [`user`] -- typed row handles
//! - [`rows`] -- row values and record conversions
//! - [`identity`] -- identity map and the commit primitive
//! - [`error`] -- [`CacheError`]

pub mod cache;
pub mod error;
pub mod guild;
pub mod identity;
pub mod member;
pub mod rows;
pub mod user;

pub use cache::{CacheCounts, EntityCache};
pub use error::CacheError;
pub use guild::GuildHandle;
pub use member::MemberHandle;
pub use rows::{DEFAULT_LANGUAGE, GuildConfig, MemberState, UserAccount};
pub use user::{UserHandle, UserLock};
