//! The [`Ledger`] service: every balance mutation goes through here.
//!
//! # Design
//!
//! - **Row locks**: each operation holds the affected account rows through
//!   [`UserLock`] for its whole read-modify-write.
//! - **Lock order**: two-account operations lock the lower [`UserId`] first.
//! - **Atomic pairs**: transfers persist both rows with one backend
//!   transaction via [`UserLock::commit_pair`].
//! - **Validate before write**: a rejected operation never reaches the backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tavern_cache::{EntityCache, UserHandle, UserLock};
use tavern_types::UserId;

use crate::LedgerError;
use crate::daily::{DailyBonus, DailyClaim, claim_amount, next_eligible};
use crate::transfer::{TransferMode, TransferReceipt, plan_change, plan_transfer};

/// Currency operations over the accounts held in an [`EntityCache`].
#[derive(Clone)]
pub struct Ledger {
    cache: Arc<EntityCache>,
    bonus: DailyBonus,
}

impl Ledger {
    /// Create a ledger over `cache` granting `bonus` on daily claims.
    pub const fn new(cache: Arc<EntityCache>, bonus: DailyBonus) -> Self {
        Self { cache, bonus }
    }

    /// The configured daily bonus amounts.
    pub const fn bonus(&self) -> DailyBonus {
        self.bonus
    }

    /// Current balance of `user`; 0 for an account never seen before.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Cache`] if the account cannot be loaded.
    pub async fn get_balance(&self, user: UserId) -> Result<i64, LedgerError> {
        let handle = self.cache.user(user).await?;
        Ok(handle.balance().await)
    }

    /// Add `delta` (possibly negative) to the balance of `user`.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if the result would be negative.
    /// - [`LedgerError::Overflow`] if the result leaves the `i64` range.
    /// - [`LedgerError::Cache`] if loading or persisting fails; the balance
    ///   is then unchanged.
    pub async fn change_balance(&self, user: UserId, delta: i64) -> Result<i64, LedgerError> {
        let handle = self.cache.user(user).await?;
        let lock = handle.lock().await;
        let mut next = lock.account();
        next.balance = plan_change(next.balance, delta)?;
        if delta == 0 {
            return Ok(next.balance);
        }

        let committed = lock.commit(next).await?;
        tracing::info!(
            user_id = %user,
            delta,
            balance = committed.balance,
            "Balance changed"
        );
        Ok(committed.balance)
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// Both accounts change together or not at all. A transfer to oneself is
    /// validated under `mode` like any other and then leaves the balance
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is negative.
    /// - [`LedgerError::InsufficientBalance`] in [`TransferMode::Checked`]
    ///   when `from` holds less than `amount`.
    /// - [`LedgerError::Overflow`] if a balance leaves the `i64` range.
    /// - [`LedgerError::Cache`] if loading or persisting fails.
    pub async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: i64,
        mode: TransferMode,
    ) -> Result<TransferReceipt, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let from_handle = self.cache.user(from).await?;
        if from == to {
            let lock = from_handle.lock().await;
            let balance = lock.account().balance;
            // Nets to zero, so only the Checked balance rule can reject it.
            if mode == TransferMode::Checked && balance < amount {
                return Err(LedgerError::InsufficientBalance { current: balance });
            }
            return Ok(TransferReceipt {
                from_balance: balance,
                to_balance: balance,
            });
        }
        let to_handle = self.cache.user(to).await?;

        let (from_lock, to_lock) = lock_pair(&from_handle, &to_handle).await;
        let mut next_from = from_lock.account();
        let mut next_to = to_lock.account();
        let (from_balance, to_balance) =
            plan_transfer(next_from.balance, next_to.balance, amount, mode)?;
        if amount == 0 {
            return Ok(TransferReceipt {
                from_balance,
                to_balance,
            });
        }

        next_from.balance = from_balance;
        next_to.balance = to_balance;
        let (from_account, to_account) =
            UserLock::commit_pair(from_lock, next_from, to_lock, next_to).await?;

        tracing::info!(
            from = %from,
            to = %to,
            amount,
            mode = ?mode,
            from_balance = from_account.balance,
            to_balance = to_account.balance,
            "Transfer committed"
        );
        Ok(TransferReceipt {
            from_balance: from_account.balance,
            to_balance: to_account.balance,
        })
    }

    /// Claim the daily bonus for `user` at time `now`.
    ///
    /// The first claim ever grants [`DailyBonus::first_time`]; later claims
    /// grant [`DailyBonus::repeat`] once the cooldown since the previous
    /// claim has elapsed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadyClaimed`] inside the cooldown.
    /// - [`LedgerError::Overflow`] if the credit leaves the `i64` range.
    /// - [`LedgerError::Cache`] if loading or persisting fails.
    pub async fn claim_daily(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<DailyClaim, LedgerError> {
        // Storage keeps whole seconds; keep memory in step with it.
        let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        let handle = self.cache.user(user).await?;
        let lock = handle.lock().await;
        let mut next = lock.account();
        let (granted, first_time) = claim_amount(self.bonus, next.last_daily_claim, now)?;
        next.balance = next
            .balance
            .checked_add(granted)
            .ok_or(LedgerError::Overflow)?;
        next.last_daily_claim = Some(now);

        let committed = lock.commit(next).await?;
        tracing::info!(
            user_id = %user,
            granted,
            first_time,
            balance = committed.balance,
            "Daily bonus claimed"
        );
        Ok(DailyClaim {
            granted,
            balance: committed.balance,
            first_time,
            next_eligible_at: next_eligible(now),
        })
    }
}

/// Lock two distinct accounts, lower id first, returning them as `(a, b)`.
async fn lock_pair(a: &UserHandle, b: &UserHandle) -> (UserLock, UserLock) {
    if a.id() < b.id() {
        let first = a.lock().await;
        let second = b.lock().await;
        (first, second)
    } else {
        let first = b.lock().await;
        let second = a.lock().await;
        (second, first)
    }
}
