//! Process wiring for the Tavern bot.
//!
//! The binary in `main.rs` is a thin shell over this library: it loads a
//! [`BotConfig`], opens the configured storage engine and builds a
//! [`Tavern`] for command handlers to share.
//!
//! # Modules
//!
//! - [`config`] -- `tavern-config.yaml` loading and env overrides
//! - [`app`] -- [`Tavern`], the shared handler state
//! - [`error`] -- [`BotError`]

pub mod app;
pub mod config;
pub mod error;

pub use app::Tavern;
pub use config::{BotConfig, ConfigError, StorageEngine};
pub use error::BotError;
