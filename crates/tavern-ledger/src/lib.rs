//! Currency ledger over the cached user accounts.
//!
//! Balances live in the [`tavern_cache::EntityCache`] user rows; this crate
//! owns the rules for changing them.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] service: balance changes, transfers, daily bonus.
//! - [`transfer`] -- [`TransferMode`], [`TransferReceipt`] and the pure transfer arithmetic.
//! - [`daily`] -- [`DailyBonus`], [`DailyClaim`] and cooldown arithmetic.
//!
//! # Invariants
//!
//! - A balance never goes below zero except through an
//!   [`TransferMode::Unchecked`] transfer.
//! - A transfer changes both accounts or neither, in memory and in storage.
//! - Concurrent transfers over the same pair of accounts cannot deadlock:
//!   account locks are always taken in ascending user id order.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo(cache: std::sync::Arc<tavern_cache::EntityCache>) -> Result<(), tavern_ledger::LedgerError> {
//! use tavern_ledger::{DailyBonus, Ledger, TransferMode};
//! use tavern_types::UserId;
//!
//! let ledger = Ledger::new(cache, DailyBonus::default());
//! ledger.claim_daily(UserId(1), chrono::Utc::now()).await?;
//! ledger.transfer(UserId(1), UserId(2), 200, TransferMode::Checked).await?;
//! # Ok(())
//! # }
//! ```

pub mod daily;
pub mod ledger;
pub mod transfer;

// Re-export primary types at crate root.
pub use daily::{DAILY_COOLDOWN_SECS, DailyBonus, DailyClaim};
pub use ledger::Ledger;
pub use transfer::{TransferMode, TransferReceipt};

use tavern_cache::CacheError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The account cannot cover the debit.
    #[error("insufficient balance: current balance is {current}")]
    InsufficientBalance {
        /// Balance at the time of the attempt.
        current: i64,
    },

    /// Transfer amounts must not be negative.
    #[error("transfer amount must not be negative, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// The daily bonus was claimed less than a cooldown ago.
    #[error("daily bonus already claimed, next claim in {remaining_secs}s")]
    AlreadyClaimed {
        /// Seconds until the next claim is allowed.
        remaining_secs: i64,
    },

    /// A balance would leave the `i64` range.
    #[error("balance arithmetic overflow")]
    Overflow,

    /// Loading or persisting an account failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
