//! Best-effort lease implementations.
//!
//! Two [`LockManager`](crate::ports::LockManager) implementations:
//!
//! - [`NoopLockManager`] - Always grants; correct when one instance runs.
//! - [`MemoryLockManager`] - TTL leases in a concurrent map; mutual
//!   exclusion within one process, used by tests and single-node
//!   deployments.
//!
//! Either way the contract is best-effort: every lock-guarded path
//! re-checks its invariant after acquisition, so a lost or expired lease
//! is correct, merely wasteful.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{InfraError, Result};
use crate::ports::{LockHandle, LockManager};

// ═══════════════════════════════════════════════════════════════════════════════
// NOOP LOCK MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Lease manager that always grants.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLockManager;

#[async_trait]
impl LockManager for NoopLockManager {
    async fn acquire(&self, key: &str, _ttl: Duration) -> Result<LockHandle> {
        Ok(LockHandle {
            key: key.to_string(),
            token: 0,
        })
    }

    async fn release(&self, _handle: LockHandle) -> Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY LOCK MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process lease table with TTL expiry.
///
/// An expired lease is stolen by the next `acquire`; `release` with a
/// stale token fails, which callers tolerate.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    /// Held leases: key -> (fencing token, expiry).
    leases: DashMap<String, (u64, Instant)>,

    /// Fencing-token counter.
    tokens: AtomicU64,
}

impl MemoryLockManager {
    /// Create an empty lease table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently tracked leases, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    /// Whether no leases are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockHandle> {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();

        let mut granted = false;
        let entry = self
            .leases
            .entry(key.to_string())
            .and_modify(|(held_token, expiry)| {
                if *expiry <= now {
                    // Expired lease: steal it
                    *held_token = token;
                    *expiry = now + ttl;
                    granted = true;
                }
            })
            .or_insert_with(|| {
                granted = true;
                (token, now + ttl)
            });
        drop(entry);

        if granted {
            debug!(key, token, "Acquired lease");
            Ok(LockHandle {
                key: key.to_string(),
                token,
            })
        } else {
            Err(InfraError::Lock(format!("lease {key} is held")).into())
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<()> {
        let removed = self
            .leases
            .remove_if(&handle.key, |_, (token, _)| *token == handle.token);

        if removed.is_some() {
            debug!(key = %handle.key, token = handle.token, "Released lease");
            Ok(())
        } else {
            Err(InfraError::Lock(format!(
                "lease {} no longer held by token {}",
                handle.key, handle.token
            ))
            .into())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn noop_always_grants() {
        let locks = NoopLockManager;
        let a = locks.acquire("role:create:G1:Verified", TTL).await.unwrap();
        let b = locks.acquire("role:create:G1:Verified", TTL).await.unwrap();
        locks.release(a).await.unwrap();
        locks.release(b).await.unwrap();
    }

    #[tokio::test]
    async fn contended_acquire_grants_exactly_one() {
        let locks = MemoryLockManager::new();

        let first = locks.acquire("role:create:G1:Verified", TTL).await;
        let second = locks.acquire("role:create:G1:Verified", TTL).await;

        assert!(first.is_ok());
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn release_frees_the_lease() {
        let locks = MemoryLockManager::new();

        let handle = locks.acquire("k", TTL).await.unwrap();
        locks.release(handle).await.unwrap();

        assert!(locks.acquire("k", TTL).await.is_ok());
    }

    #[tokio::test]
    async fn expired_lease_is_stolen() {
        let locks = MemoryLockManager::new();

        let stale = locks
            .acquire("k", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // A new acquire steals the expired lease
        let fresh = locks.acquire("k", TTL).await.unwrap();
        assert_ne!(stale.token, fresh.token);

        // The stale holder's release fails; callers tolerate that
        assert!(locks.release(stale).await.is_err());

        // The fresh holder's release still works
        locks.release(fresh).await.unwrap();
    }

    #[tokio::test]
    async fn independent_keys_do_not_contend() {
        let locks = MemoryLockManager::new();
        assert!(locks.acquire("role:create:G1:Verified", TTL).await.is_ok());
        assert!(locks.acquire("role:create:G2:Verified", TTL).await.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn double_release_fails() {
        let locks = MemoryLockManager::new();
        let handle = locks.acquire("k", TTL).await.unwrap();
        locks.release(handle.clone()).await.unwrap();
        assert!(locks.release(handle).await.is_err());
    }
}
