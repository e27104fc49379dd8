//! Per-user verification and tiered member selection.
//!
//! # The four states
//!
//! Verification classifies a user by two booleans — "holds the guild's
//! verified role" and "has a linked on-chain address" — and prescribes
//! one action per class:
//!
//! | has verified role | registered | Action |
//! |-------------------|------------|--------|
//! | yes | no  | Remove verified role; remove all realm-based roles |
//! | yes | yes | Keep verified role; sync realm roles |
//! | no  | no  | Ensure no realm-based roles remain |
//! | no  | yes | Add verified role; sync realm roles |
//!
//! Every mutation checks current membership first, so a redundant
//! operation is a no-op and re-running verification with unchanged chain
//! state issues zero platform calls that mutate.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::Reconciler;
use crate::error::Result;
use crate::ports::{Member, Presence};
use crate::store::load_or_init;
use crate::types::entities::{SCRATCH_LAST_USER_INDEX, SCRATCH_PRESENCE_TIERS};
use crate::types::{GuildConfig, PresenceTiers, QueryState};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOME AND PRIORITY TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Verification tier driving member selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPriority {
    /// Members with an active presence; checked most often.
    High,
    /// Inactive or unknown-presence members, bounded per pass.
    Medium,
    /// Paged full sweep with a persisted wrap-around cursor.
    Low,
}

/// What a verification run actually did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// Platform roles granted.
    pub roles_added: u32,
    /// Platform roles revoked.
    pub roles_removed: u32,
    /// Failed external calls that were absorbed.
    pub errors: u32,
}

impl VerificationOutcome {
    /// Total mutations issued.
    #[must_use]
    pub const fn mutations(&self) -> u32 {
        self.roles_added + self.roles_removed
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-USER VERIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

impl Reconciler {
    /// Verify one user in one guild: classify into the four-state table
    /// and apply the prescribed role mutations.
    ///
    /// Individual role mutations that fail are logged and counted in the
    /// outcome; the remaining mutations still run.
    ///
    /// # Errors
    ///
    /// Returns an error only when the inputs of the classification cannot
    /// be obtained (member roles, link registry, configuration); the
    /// caller counts it against the driving query state.
    #[instrument(skip(self), fields(guild_id, user_id))]
    pub async fn process_user_verification(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<VerificationOutcome> {
        let config = load_or_init(self.store().as_ref(), guild_id).await?.value;

        let held = self.platform().member_roles(guild_id, user_id).await?;
        let linked = self.rolelink().linked_address(user_id).await?;

        let has_verified = config
            .verified_role_id
            .as_deref()
            .is_some_and(|role_id| held.iter().any(|r| r == role_id));

        let mut outcome = VerificationOutcome::default();

        match (has_verified, linked) {
            // Verified but no longer registered: strip everything
            (true, None) => {
                if let Some(verified) = config.verified_role_id.as_deref() {
                    self.revoke_role(guild_id, user_id, verified, &held, &mut outcome)
                        .await;
                }
                self.remove_realm_roles(guild_id, user_id, &held, &config, &mut outcome)
                    .await;
            }

            // Verified and registered: keep verified, true-up realm roles
            (true, Some(address)) => {
                self.sync_realm_roles(guild_id, user_id, &address, &held, &config, &mut outcome)
                    .await;
            }

            // Neither: only stragglers to clean up
            (false, None) => {
                self.remove_realm_roles(guild_id, user_id, &held, &config, &mut outcome)
                    .await;
            }

            // Registered but not yet verified: grant and sync
            (false, Some(address)) => {
                if let Some(verified) = config.verified_role_id.as_deref() {
                    self.grant_role(guild_id, user_id, verified, &held, &mut outcome)
                        .await;
                }
                self.sync_realm_roles(guild_id, user_id, &address, &held, &config, &mut outcome)
                    .await;
            }
        }

        debug!(
            guild_id,
            user_id,
            added = outcome.roles_added,
            removed = outcome.roles_removed,
            errors = outcome.errors,
            "Verified user"
        );
        Ok(outcome)
    }

    /// Grant `role_id` unless the user already holds it. Failures are
    /// absorbed into the outcome.
    pub(crate) async fn grant_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        held: &[String],
        outcome: &mut VerificationOutcome,
    ) {
        if held.iter().any(|r| r == role_id) {
            return;
        }
        match self
            .platform()
            .add_member_role(guild_id, user_id, role_id)
            .await
        {
            Ok(()) => outcome.roles_added += 1,
            Err(err) => {
                warn!(guild_id, user_id, role_id, error = %err, "Failed to grant role");
                outcome.errors += 1;
            }
        }
    }

    /// Revoke `role_id` if the user holds it. Failures are absorbed into
    /// the outcome.
    pub(crate) async fn revoke_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        held: &[String],
        outcome: &mut VerificationOutcome,
    ) {
        if !held.iter().any(|r| r == role_id) {
            return;
        }
        match self
            .platform()
            .remove_member_role(guild_id, user_id, role_id)
            .await
        {
            Ok(()) => outcome.roles_removed += 1,
            Err(err) => {
                warn!(guild_id, user_id, role_id, error = %err, "Failed to revoke role");
                outcome.errors += 1;
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TIERED VERIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

impl Reconciler {
    /// Run one tiered verification pass over a guild's members.
    ///
    /// Selection by tier:
    ///
    /// - **High**: members with an active presence (online, idle,
    ///   do-not-disturb); when no presence data exists anywhere, every
    ///   non-bot member.
    /// - **Medium**: up to `max_users` members whose presence is
    ///   offline, invisible, or unknown.
    /// - **Low**: the next `max_users` members from the persisted paging
    ///   cursor, wrapping to the start after the end of the roster.
    ///
    /// Mutates `state` (error bookkeeping, low-tier paging cursor); the
    /// caller persists it. Returns the number of members processed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the member roster cannot be listed;
    /// per-member failures are recorded on `state` and skipped.
    #[instrument(skip(self, state, cancel), fields(guild_id, ?priority, max_users))]
    pub async fn process_tiered_verification(
        &self,
        guild_id: &str,
        state: &mut QueryState,
        priority: VerifyPriority,
        max_users: usize,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let members: Vec<Member> = self
            .platform()
            .list_members(guild_id, 0)
            .await?
            .into_iter()
            .filter(|m| !m.is_bot)
            .collect();

        if members.is_empty() {
            return Ok(0);
        }

        let selected = match priority {
            VerifyPriority::High => self.select_high(guild_id, &members, state).await,
            VerifyPriority::Medium => {
                self.select_medium(guild_id, &members, state, max_users).await
            }
            VerifyPriority::Low => Self::select_low(&members, state, max_users),
        };

        let mut processed = 0usize;
        for member in &selected {
            if cancel.is_cancelled() {
                debug!(guild_id, processed, "Verification pass cancelled");
                break;
            }

            match self
                .process_user_verification(guild_id, &member.user_id)
                .await
            {
                Ok(outcome) => {
                    if outcome.errors > 0 {
                        state.record_error(
                            format!(
                                "{} role mutations failed for user {}",
                                outcome.errors, member.user_id
                            ),
                            Utc::now(),
                        );
                    }
                }
                Err(err) => {
                    warn!(guild_id, user_id = %member.user_id, error = %err, "User verification failed");
                    state.record_error(err.to_string(), Utc::now());
                }
            }
            processed += 1;
        }

        if matches!(priority, VerifyPriority::Low) {
            Self::advance_low_cursor(state, &members, processed);
        }

        Ok(processed)
    }

    /// High tier: members with an active presence. The durable tier map
    /// is advisory input when the platform has no snapshot for a member.
    async fn select_high(
        &self,
        guild_id: &str,
        members: &[Member],
        state: &QueryState,
    ) -> Vec<Member> {
        let tiers: PresenceTiers = state.scratch(SCRATCH_PRESENCE_TIERS).unwrap_or_default();

        let mut any_presence = false;
        let mut active = Vec::new();

        for member in members {
            let presence = self.snapshot_presence(guild_id, &member.user_id).await;
            if presence != Presence::Unknown {
                any_presence = true;
            }

            let is_active = match presence {
                Presence::Unknown => tiers.is_active(&member.user_id),
                p => p.is_active(),
            };
            if is_active {
                active.push(member.clone());
            }
        }

        if !any_presence && active.is_empty() {
            // No presence data at all: verify everyone rather than no one
            return members.to_vec();
        }
        active
    }

    /// Medium tier: up to `max_users` members that the high tier skips.
    async fn select_medium(
        &self,
        guild_id: &str,
        members: &[Member],
        state: &QueryState,
        max_users: usize,
    ) -> Vec<Member> {
        let tiers: PresenceTiers = state.scratch(SCRATCH_PRESENCE_TIERS).unwrap_or_default();

        let mut inactive = Vec::new();
        for member in members {
            if inactive.len() >= max_users {
                break;
            }
            let presence = self.snapshot_presence(guild_id, &member.user_id).await;
            let is_active = match presence {
                Presence::Unknown => tiers.is_active(&member.user_id),
                p => p.is_active(),
            };
            if !is_active {
                inactive.push(member.clone());
            }
        }
        inactive
    }

    /// Low tier: the next page from the persisted wrap-around cursor.
    fn select_low(members: &[Member], state: &QueryState, max_users: usize) -> Vec<Member> {
        let mut start: usize = state.scratch(SCRATCH_LAST_USER_INDEX).unwrap_or(0);
        if start >= members.len() {
            start = 0;
        }
        let end = members.len().min(start + max_users);
        members[start..end].to_vec()
    }

    /// Advance the low-tier cursor past the processed page, wrapping at
    /// the roster end.
    fn advance_low_cursor(state: &mut QueryState, members: &[Member], processed: usize) {
        let mut start: usize = state.scratch(SCRATCH_LAST_USER_INDEX).unwrap_or(0);
        if start >= members.len() {
            start = 0;
        }
        let mut next = start + processed;
        if next >= members.len() {
            next = 0;
        }
        // Vec<String> keys serialize infallibly; usize likewise
        let _ = state.set_scratch(SCRATCH_LAST_USER_INDEX, &next);
    }

    /// Presence snapshot, degraded to `Unknown` on failure.
    async fn snapshot_presence(&self, guild_id: &str, user_id: &str) -> Presence {
        match self.platform().presence(guild_id, user_id).await {
            Ok(presence) => presence,
            Err(err) => {
                debug!(guild_id, user_id, error = %err, "Presence lookup failed");
                Presence::Unknown
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUILD CONFIG ACCESS
// ═══════════════════════════════════════════════════════════════════════════════

impl Reconciler {
    /// Load the guild configuration that classification reads from.
    pub(crate) async fn guild_config(&self, guild_id: &str) -> Result<GuildConfig> {
        Ok(load_or_init(self.store().as_ref(), guild_id).await?.value)
    }
}
