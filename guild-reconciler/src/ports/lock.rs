//! Cross-instance lease port.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Handle to a held lease, returned by [`LockManager::acquire`].
///
/// Opaque to callers; pass it back to [`LockManager::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Lease key.
    pub key: String,
    /// Fencing token distinguishing this acquisition from later ones.
    pub token: u64,
}

/// Port for best-effort named leases with TTL.
///
/// Semantics are best-effort mutual exclusion across instances:
///
/// - `acquire` may fail spuriously under contention; callers must always
///   re-check the guarded invariant after acquisition.
/// - `release` may fail; the lease then simply expires at its TTL.
///
/// Used to serialize operations whose second execution is not naturally
/// idempotent — today, role creation by name within a guild. A no-op
/// implementation is correct when only one instance runs.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire a lease on `key` for at most `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error when the lease is currently held elsewhere or the
    /// backend fails.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<LockHandle>;

    /// Release a held lease.
    ///
    /// # Errors
    ///
    /// Returns an error when the lease is no longer held by `handle`
    /// (already expired or stolen) or the backend fails. Callers tolerate
    /// this; the lease expires on its own.
    async fn release(&self, handle: LockHandle) -> Result<()>;
}
