//! Identity map and the write-through commit primitive.
//!
//! An [`IdentityMap`] holds at most one [`Row`] per key. Each key owns a
//! [`OnceCell`]; the first lookup initializes it from the backend while
//! concurrent lookups for the same key wait on the cell and receive the
//! same row. A failed load leaves the cell empty so the next lookup retries.
//!
//! A [`Row`] is an `Arc`ed async mutex. Setters take the mutex, compute the
//! next value, and hand the guard to [`commit`], which persists then
//! publishes inside a spawned task.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tavern_db::DbError;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};

use crate::error::CacheError;

/// Exclusive access to a row value, held across a write-through.
pub type RowGuard<V> = OwnedMutexGuard<V>;

/// The single in-memory object for one key.
#[derive(Debug)]
pub struct Row<V> {
    cell: Arc<Mutex<V>>,
}

impl<V> Clone for Row<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V: Clone> Row<V> {
    fn new(value: V) -> Self {
        Self {
            cell: Arc::new(Mutex::new(value)),
        }
    }

    /// Copy of the last committed value.
    pub async fn read(&self) -> V {
        self.cell.lock().await.clone()
    }

    /// Take the row lock. Other readers and writers wait until it drops.
    pub async fn lock(&self) -> RowGuard<V> {
        Arc::clone(&self.cell).lock_owned().await
    }

    /// Whether both handles point at the same in-memory object.
    pub fn same_row(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

/// Keyed map guaranteeing one [`Row`] per key.
#[derive(Debug)]
pub struct IdentityMap<K, V>
where
    K: Eq + Hash,
{
    rows: DashMap<K, Arc<OnceCell<Row<V>>>>,
}

impl<K, V> Default for IdentityMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<K, V> IdentityMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Return the row for `key`, running `load` only if no row exists yet.
    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<Row<V>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, CacheError>>,
    {
        // Clone the cell out so no map shard stays locked across the await.
        let cell = Arc::clone(self.rows.entry(key).or_default().value());
        let row = cell
            .get_or_try_init(|| async { load().await.map(Row::new) })
            .await?;
        Ok(row.clone())
    }

    /// Whether `key` has a loaded row.
    pub fn contains(&self, key: &K) -> bool {
        self.rows
            .get(key)
            .is_some_and(|cell| cell.value().initialized())
    }

    /// Number of loaded rows.
    pub fn len(&self) -> usize {
        self.rows
            .iter()
            .filter(|cell| cell.value().initialized())
            .count()
    }

    /// Whether no row has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persist `next` with `write`, then publish it into the guarded row.
///
/// Runs in a spawned task that owns the guard: once this function has been
/// polled past the spawn, dropping the caller's future no longer cancels
/// the write, and the in-memory value always ends up matching the backend.
/// On a failed write the guarded value is left untouched.
pub async fn commit<V, W>(mut guard: RowGuard<V>, next: V, write: W) -> Result<V, CacheError>
where
    V: Clone + Send + Sync + 'static,
    W: Future<Output = Result<(), DbError>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        write.await?;
        *guard = next.clone();
        Ok(next)
    });
    task.await
        .map_err(|e| CacheError::WriteAborted(e.to_string()))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let map: IdentityMap<u8, u32> = IdentityMap::default();
        let err = map
            .get_or_load(1, || async {
                Err(CacheError::Backend(DbError::Unavailable("down".to_owned())))
            })
            .await;
        assert!(err.is_err());
        assert!(!map.contains(&1));

        let row = map.get_or_load(1, || async { Ok(5) }).await.unwrap();
        assert_eq!(row.read().await, 5);
        assert!(map.contains(&1));
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn second_lookup_skips_loader() {
        let map: IdentityMap<u8, u32> = IdentityMap::default();
        let first = map.get_or_load(1, || async { Ok(5) }).await.unwrap();
        let second = map.get_or_load(1, || async { Ok(99) }).await.unwrap();
        assert!(first.same_row(&second));
        assert_eq!(second.read().await, 5);
    }

    #[tokio::test]
    async fn failed_commit_keeps_old_value() {
        let map: IdentityMap<u8, u32> = IdentityMap::default();
        let row = map.get_or_load(1, || async { Ok(5) }).await.unwrap();

        let guard = row.lock().await;
        let result = commit(guard, 6, async {
            Err(DbError::Unavailable("down".to_owned()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(row.read().await, 5);

        let guard = row.lock().await;
        let committed = commit(guard, 7, async { Ok(()) }).await.unwrap();
        assert_eq!(committed, 7);
        assert_eq!(row.read().await, 7);
    }
}
