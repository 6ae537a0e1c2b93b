//! Named mutation locks with deterministic acquisition order.
//!
//! Operations that read-then-write across entity types acquire the locks
//! for every type they touch, always in lexicographic name order, so two
//! operations locking overlapping sets cannot deadlock. The returned
//! guard releases on every exit path.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock name for check identities and flags.
pub const CHECK: &str = "check";
/// Lock name for contact, rule and medium data.
pub const CONTACT: &str = "contact";
/// Lock name for maintenance-window collections.
pub const MAINTENANCE: &str = "maintenance";
/// Lock name for state histories.
pub const STATE: &str = "state";

/// A registry of named async mutexes, created lazily on first use.
#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<&'static str, Arc<Mutex<()>>>,
}

/// Guards for an acquired lock set; dropping releases every lock.
pub struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the named locks in lexicographic order and returns a
    /// guard over all of them. Duplicate names are collapsed.
    pub async fn acquire(&self, names: &[&'static str]) -> LockSet {
        let mut ordered: Vec<&'static str> = names.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for name in ordered {
            let lock = self.lock_for(name);
            guards.push(lock.lock_owned().await);
        }
        LockSet { _guards: guards }
    }

    fn lock_for(&self, name: &'static str) -> Arc<Mutex<()>> {
        self.locks.entry(name).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_returns_shared_lock() {
        let registry = LockRegistry::new();
        let first = registry.lock_for(CHECK);
        let second = registry.lock_for(CHECK);
        let other = registry.lock_for(CONTACT);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_guard_release_unblocks_waiters() {
        let registry = Arc::new(LockRegistry::new());

        let guard = registry.acquire(&[CHECK, STATE]).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry.acquire(&[STATE]).await;
            })
        };

        // the contender is blocked while the set is held
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_sets_in_any_order_do_not_deadlock() {
        let registry = Arc::new(LockRegistry::new());

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let forwards = {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let _guard = registry.acquire(&[CHECK, MAINTENANCE, STATE]).await;
                })
            };
            let backwards = {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let _guard = registry.acquire(&[STATE, CHECK]).await;
                })
            };
            tasks.push(forwards);
            tasks.push(backwards);
        }

        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("lock acquisition should not deadlock")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_are_collapsed() {
        let registry = LockRegistry::new();
        // would deadlock on itself if duplicates were locked twice
        let _guard = registry.acquire(&[CHECK, CHECK]).await;
    }
}
