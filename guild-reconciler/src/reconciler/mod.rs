//! The reconciliation core.
//!
//! For one `(guild, user)` pair, reconciliation brings the set of
//! platform role assignments into agreement with on-chain assertions:
//! the verified role mirrors "has any linked address", realm-based roles
//! mirror realm-role membership.
//!
//! Submodules by responsibility:
//!
//! - [`verification`] - Four-state per-user verification and tiered
//!   member selection
//! - [`events`] - Event-driven user/role link and unlink handling
//! - [`realms`] - Realm-role synchronization and monitored-realm
//!   discovery
//! - [`presence`] - Durable presence tier map
//!
//! # Failure model
//!
//! Every external call may fail. Per-role and per-user failures are
//! logged and counted, and the enclosing state action continues with the
//! next role or user; no single failure aborts a whole verification
//! pass. Persistent errors surface as `error_count` on the offending
//! query state.

pub mod events;
pub mod presence;
pub mod realms;
pub mod verification;

pub use verification::{VerificationOutcome, VerifyPriority};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::{InfraError, Result};
use crate::ports::{ConfigStore, GuildPlatform, LockManager, Role, RoleLink};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lease TTL for role creation by name.
const ROLE_CREATE_LEASE_TTL: Duration = Duration::from_secs(30);

/// Delay before re-checking when the role-creation lease is contended.
const ROLE_CREATE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Attempts to win the role-creation lease before giving up.
const ROLE_CREATE_ATTEMPTS: u32 = 3;

// ═══════════════════════════════════════════════════════════════════════════════
// RECONCILER
// ═══════════════════════════════════════════════════════════════════════════════

/// The decision core, shared by the event-stream processor and the
/// verification scheduler of every guild.
///
/// Owns no per-guild state; everything durable lives in the config
/// store, everything observable comes from the platform and role-link
/// ports.
pub struct Reconciler {
    /// Versioned configuration persistence.
    store: Arc<dyn ConfigStore>,

    /// Chat-platform adapter.
    platform: Arc<dyn GuildPlatform>,

    /// Read-only on-chain link registry.
    rolelink: Arc<dyn RoleLink>,

    /// Cross-instance leases, used only for role creation by name.
    locks: Arc<dyn LockManager>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler over the given ports.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        platform: Arc<dyn GuildPlatform>,
        rolelink: Arc<dyn RoleLink>,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        Self {
            store,
            platform,
            rolelink,
            locks,
        }
    }

    /// The configuration store this reconciler writes through.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub(crate) fn platform(&self) -> &dyn GuildPlatform {
        self.platform.as_ref()
    }

    pub(crate) fn rolelink(&self) -> &dyn RoleLink {
        self.rolelink.as_ref()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // ROLE CREATION BY NAME
    // ───────────────────────────────────────────────────────────────────────────

    /// Find a guild role by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform roster call fails.
    pub async fn find_role_by_name(&self, guild_id: &str, name: &str) -> Result<Option<Role>> {
        let roles = self.platform.guild_roles(guild_id).await?;
        Ok(roles.into_iter().find(|r| r.name == name))
    }

    /// Return the role named `name`, creating it if absent.
    ///
    /// Creation is not idempotent on name collisions, so it is serialized
    /// across instances through the lock manager. The invariant is
    /// re-checked after every acquisition (and after every contended
    /// wait): a lost or expired lease is therefore correct, merely
    /// wasteful.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform fails, or when the lease stays
    /// contended and the role never appears.
    #[instrument(skip(self), fields(guild_id, name))]
    pub async fn ensure_role(&self, guild_id: &str, name: &str, color: u32) -> Result<Role> {
        let lease_key = format!("role:create:{guild_id}:{name}");

        for attempt in 0..ROLE_CREATE_ATTEMPTS {
            // The role may already exist (or a peer may just have made it)
            if let Some(existing) = self.find_role_by_name(guild_id, name).await? {
                return Ok(existing);
            }

            match self.locks.acquire(&lease_key, ROLE_CREATE_LEASE_TTL).await {
                Ok(handle) => {
                    // Re-check under the lease before creating
                    if let Some(existing) = self.find_role_by_name(guild_id, name).await? {
                        self.release_quietly(handle).await;
                        return Ok(existing);
                    }

                    let created = self.platform.create_role(guild_id, name, color).await;
                    self.release_quietly(handle).await;

                    let role = created?;
                    debug!(guild_id, name, role_id = %role.id, "Created role");
                    return Ok(role);
                }
                Err(err) => {
                    debug!(
                        guild_id,
                        name,
                        attempt,
                        error = %err,
                        "Role-creation lease contended, waiting for peer"
                    );
                    tokio::time::sleep(ROLE_CREATE_RETRY_DELAY).await;
                }
            }
        }

        // Lease never won and no peer produced the role
        Err(InfraError::Lock(format!(
            "could not create role {name} in guild {guild_id}: lease stayed contended"
        ))
        .into())
    }

    /// Release a lease, tolerating failure (the lease expires on its
    /// own).
    async fn release_quietly(&self, handle: crate::ports::LockHandle) {
        if let Err(err) = self.locks.release(handle).await {
            warn!(error = %err, "Lease release failed; letting it expire");
        }
    }
}
