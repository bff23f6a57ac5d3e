//! Handle onto a cached member moderation row.

use tavern_db::Backend;
use tavern_types::MemberKey;

use crate::error::CacheError;
use crate::identity::{Row, commit};
use crate::rows::MemberState;

/// Shared handle to the single cached [`MemberState`] of one member.
#[derive(Clone)]
pub struct MemberHandle {
    key: MemberKey,
    row: Row<MemberState>,
    backend: Backend,
}

impl MemberHandle {
    pub(crate) const fn new(key: MemberKey, row: Row<MemberState>, backend: Backend) -> Self {
        Self { key, row, backend }
    }

    /// The member this handle addresses.
    pub const fn key(&self) -> MemberKey {
        self.key
    }

    /// Whether both handles share the same in-memory row.
    pub fn same_row(&self, other: &Self) -> bool {
        self.row.same_row(&other.row)
    }

    /// Number of active warnings.
    pub async fn warn_count(&self) -> u32 {
        self.row.read().await.warn_count
    }

    /// Overwrite the warning count.
    pub async fn set_warn_count(&self, warn_count: u32) -> Result<(), CacheError> {
        self.update(|_| Ok(warn_count)).await.map(|_| ())
    }

    /// Add one warning and return the new count.
    pub async fn add_warning(&self) -> Result<u32, CacheError> {
        self.update(|current| {
            current
                .checked_add(1)
                .ok_or(CacheError::Overflow { field: "warn_count" })
        })
        .await
    }

    /// Remove one warning (never below zero) and return the new count.
    pub async fn remove_warning(&self) -> Result<u32, CacheError> {
        self.update(|current| Ok(current.saturating_sub(1))).await
    }

    /// Reset the warning count to zero.
    pub async fn clear_warnings(&self) -> Result<(), CacheError> {
        self.set_warn_count(0).await
    }

    async fn update<F>(&self, change: F) -> Result<u32, CacheError>
    where
        F: FnOnce(u32) -> Result<u32, CacheError>,
    {
        let guard = self.row.lock().await;
        let next = MemberState {
            warn_count: change(guard.warn_count)?,
        };
        if next == *guard {
            return Ok(next.warn_count);
        }

        let backend = self.backend.clone();
        let key = self.key;
        let record = next.to_record();
        let committed = commit(guard, next, async move {
            backend.set_member(key, &record).await
        })
        .await?;
        tracing::debug!(member = %key, warn_count = committed.warn_count, "Member state written through");
        Ok(committed.warn_count)
    }
}
