//! Transfer modes and the pure balance arithmetic behind them.
//!
//! [`plan_transfer`] and [`plan_change`] decide the post-operation balances
//! without touching any state; the [`Ledger`](crate::Ledger) applies their
//! result under the account locks.

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Whether a transfer enforces the non-negative balance invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferMode {
    /// The sender must hold at least `amount`.
    Checked,
    /// The debit is applied even if it drives the sender negative.
    ///
    /// Reserved for bot-granted transfers; this is the only sanctioned way
    /// for a balance to go below zero.
    Unchecked,
}

/// Balances of both parties after a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Sender balance after the transfer.
    pub from_balance: i64,
    /// Receiver balance after the transfer.
    pub to_balance: i64,
}

/// Compute `(from, to)` balances after moving `amount`.
///
/// `amount == 0` returns the balances unchanged.
pub fn plan_transfer(
    from_balance: i64,
    to_balance: i64,
    amount: i64,
    mode: TransferMode,
) -> Result<(i64, i64), LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    if amount == 0 {
        return Ok((from_balance, to_balance));
    }
    if mode == TransferMode::Checked && from_balance < amount {
        return Err(LedgerError::InsufficientBalance {
            current: from_balance,
        });
    }
    let from_after = from_balance
        .checked_sub(amount)
        .ok_or(LedgerError::Overflow)?;
    let to_after = to_balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
    Ok((from_after, to_after))
}

/// Compute the balance after adding `delta` (which may be negative).
pub fn plan_change(current: i64, delta: i64) -> Result<i64, LedgerError> {
    let next = current.checked_add(delta).ok_or(LedgerError::Overflow)?;
    if next < 0 {
        return Err(LedgerError::InsufficientBalance { current });
    }
    Ok(next)
}
