//! Per-(user, filename) serialization of the replace sequence
//!
//! Two uploads of the same file by the same user would otherwise both see "no
//! existing spreadsheet" and race to create it. The lease is held from the
//! existence check until commit or rollback. Different keys never block each
//! other, and idle keys are removed from the table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (i64, String);
type LockTable = HashMap<LockKey, Arc<AsyncMutex<()>>>;

#[derive(Debug, Clone, Default)]
pub struct UploadLocks {
    table: Arc<Mutex<LockTable>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(user_id, name)`
    pub async fn acquire(&self, user_id: i64, name: &str) -> UploadLease {
        let key = (user_id, name.to_string());
        let slot = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        UploadLease {
            key,
            table: self.table.clone(),
            guard: Some(guard),
        }
    }

    /// Keys currently held or waited on
    pub fn tracked(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive hold on one upload key, released on drop
#[derive(Debug)]
pub struct UploadLease {
    key: LockKey,
    table: Arc<Mutex<LockTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UploadLease {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // The table and this lease hold the only references when nobody waits.
        let idle = table
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) <= 2)
            .unwrap_or(false);
        if idle {
            table.remove(&self.key);
        }
        self.guard.take();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = UploadLocks::new();
        let first = locks.acquire(1, "links.xlsx").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _lease = locks.acquire(1, "links.xlsx").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = UploadLocks::new();
        let _a = locks.acquire(1, "links.xlsx").await;

        let other_user = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2, "links.xlsx")).await;
        let other_file = tokio::time::timeout(Duration::from_millis(100), locks.acquire(1, "other.csv")).await;

        assert!(other_user.is_ok());
        assert!(other_file.is_ok());
    }

    #[tokio::test]
    async fn test_idle_keys_are_removed() {
        let locks = UploadLocks::new();
        {
            let _lease = locks.acquire(3, "a.csv").await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
