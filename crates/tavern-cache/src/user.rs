//! Handle onto a cached currency account row.
//!
//! Account rules (non-negative balances, cooldowns) live in the ledger. This
//! module only provides the locking and write-through primitives the ledger
//! builds on: [`UserHandle::lock`] returns a [`UserLock`] that holds the row
//! exclusively until it is committed or dropped.

use chrono::{DateTime, Utc};
use tavern_db::Backend;
use tavern_types::UserId;

use crate::error::CacheError;
use crate::identity::{Row, RowGuard, commit};
use crate::rows::UserAccount;

/// Shared handle to the single cached [`UserAccount`] of one user.
#[derive(Clone)]
pub struct UserHandle {
    id: UserId,
    row: Row<UserAccount>,
    backend: Backend,
}

impl UserHandle {
    pub(crate) const fn new(id: UserId, row: Row<UserAccount>, backend: Backend) -> Self {
        Self { id, row, backend }
    }

    /// The user this handle addresses.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Whether both handles share the same in-memory row.
    pub fn same_row(&self, other: &Self) -> bool {
        self.row.same_row(&other.row)
    }

    /// Copy of the whole row.
    pub async fn snapshot(&self) -> UserAccount {
        self.row.read().await
    }

    /// Current balance.
    pub async fn balance(&self) -> i64 {
        self.row.read().await.balance
    }

    /// When the daily bonus was last claimed, if ever.
    pub async fn last_daily_claim(&self) -> Option<DateTime<Utc>> {
        self.row.read().await.last_daily_claim
    }

    /// Take the row lock for a read-modify-write.
    pub async fn lock(&self) -> UserLock {
        UserLock {
            id: self.id,
            guard: self.row.lock().await,
            backend: self.backend.clone(),
        }
    }
}

/// Exclusive hold on one account row.
///
/// Dropping the lock without committing leaves the row unchanged.
pub struct UserLock {
    id: UserId,
    guard: RowGuard<UserAccount>,
    backend: Backend,
}

impl UserLock {
    /// The locked user.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// The account as of lock acquisition.
    pub fn account(&self) -> UserAccount {
        *self.guard
    }

    /// Persist `next` and publish it, releasing the lock.
    pub async fn commit(self, next: UserAccount) -> Result<UserAccount, CacheError> {
        let Self { id, guard, backend } = self;
        let record = next.to_record();
        let committed = commit(guard, next, async move { backend.set_user(id, &record).await }).await?;
        tracing::debug!(user_id = %id, balance = committed.balance, "Account written through");
        Ok(committed)
    }

    /// Persist two accounts in one backend transaction, then publish both.
    ///
    /// Either both rows change (in memory and in the backend) or neither does.
    /// Runs in a spawned task holding both locks, so caller cancellation after
    /// the spawn cannot split the pair.
    pub async fn commit_pair(
        first: Self,
        next_first: UserAccount,
        second: Self,
        next_second: UserAccount,
    ) -> Result<(UserAccount, UserAccount), CacheError> {
        let Self {
            id: first_id,
            guard: mut first_guard,
            backend,
        } = first;
        let Self {
            id: second_id,
            guard: mut second_guard,
            ..
        } = second;

        let first_record = next_first.to_record();
        let second_record = next_second.to_record();
        let task = tokio::spawn(async move {
            backend
                .set_user_pair((first_id, &first_record), (second_id, &second_record))
                .await?;
            *first_guard = next_first;
            *second_guard = next_second;
            Ok::<_, CacheError>((next_first, next_second))
        });
        let committed = task
            .await
            .map_err(|e| CacheError::WriteAborted(e.to_string()))??;
        tracing::debug!(
            first = %first_id,
            second = %second_id,
            "Account pair written through"
        );
        Ok(committed)
    }
}
