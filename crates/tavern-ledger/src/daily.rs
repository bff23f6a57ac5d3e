//! Daily bonus amounts and cooldown arithmetic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Seconds a user must wait between two daily claims.
pub const DAILY_COOLDOWN_SECS: i64 = 86_400;

/// Default bonus for a user's first ever claim.
const DEFAULT_FIRST_TIME: i64 = 500;

/// Default bonus for every later claim.
const DEFAULT_REPEAT: i64 = 200;

/// Amounts granted by the daily bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBonus {
    /// Granted when the user has never claimed before.
    #[serde(default = "default_first_time")]
    pub first_time: i64,
    /// Granted when the cooldown since the last claim has elapsed.
    #[serde(default = "default_repeat")]
    pub repeat: i64,
}

impl Default for DailyBonus {
    fn default() -> Self {
        Self {
            first_time: DEFAULT_FIRST_TIME,
            repeat: DEFAULT_REPEAT,
        }
    }
}

const fn default_first_time() -> i64 {
    DEFAULT_FIRST_TIME
}

const fn default_repeat() -> i64 {
    DEFAULT_REPEAT
}

/// Result of a successful daily claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyClaim {
    /// Amount credited by this claim.
    pub granted: i64,
    /// Balance after the claim.
    pub balance: i64,
    /// Whether this was the user's first claim.
    pub first_time: bool,
    /// Earliest time the next claim will succeed.
    pub next_eligible_at: DateTime<Utc>,
}

/// Decide how much a claim at `now` grants.
///
/// Returns `(amount, first_time)`, or [`LedgerError::AlreadyClaimed`] with
/// the seconds left on the cooldown.
pub fn claim_amount(
    bonus: DailyBonus,
    last_claim: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(i64, bool), LedgerError> {
    let Some(last) = last_claim else {
        return Ok((bonus.first_time, true));
    };
    let elapsed = now.signed_duration_since(last).num_seconds();
    if elapsed >= DAILY_COOLDOWN_SECS {
        return Ok((bonus.repeat, false));
    }
    let remaining_secs = DAILY_COOLDOWN_SECS.saturating_sub(elapsed);
    Err(LedgerError::AlreadyClaimed { remaining_secs })
}

/// When a claim made at `claimed_at` expires.
pub fn next_eligible(claimed_at: DateTime<Utc>) -> DateTime<Utc> {
    claimed_at
        .checked_add_signed(Duration::seconds(DAILY_COOLDOWN_SECS))
        .unwrap_or(claimed_at)
}
