//! Event-driven link and unlink handling.
//!
//! The event-stream processor delivers parsed chain events here. User
//! events fan out across every guild the user is a member of; role
//! events apply only to the processor's own guild and fan out across its
//! members.
//!
//! Handlers are idempotent: delivery is at-least-once across restarts,
//! and every mutation checks current membership first.

use tracing::{debug, info, instrument, warn};

use super::Reconciler;
use super::verification::VerificationOutcome;
use crate::error::Result;
use crate::types::RoleEvent;

impl Reconciler {
    // ───────────────────────────────────────────────────────────────────────────
    // USER EVENTS
    // ───────────────────────────────────────────────────────────────────────────

    /// A user proved ownership of an on-chain address: grant the
    /// verified role and sync realm roles in every guild they belong to.
    ///
    /// # Errors
    ///
    /// Returns an error when the guild list cannot be obtained at all;
    /// per-guild failures are absorbed and counted.
    #[instrument(skip(self), fields(discord_id, address))]
    pub async fn handle_user_linked(
        &self,
        discord_id: &str,
        address: &str,
    ) -> Result<VerificationOutcome> {
        let guilds = self.platform().list_guilds().await?;
        let mut outcome = VerificationOutcome::default();

        for guild_id in &guilds {
            // Not a member of this guild: nothing to do there
            let Ok(held) = self.platform().member_roles(guild_id, discord_id).await else {
                continue;
            };

            let config = match self.guild_config(guild_id).await {
                Ok(config) => config,
                Err(err) => {
                    warn!(guild_id, error = %err, "Failed to load guild config");
                    outcome.errors += 1;
                    continue;
                }
            };

            if let Some(verified) = config.verified_role_id.as_deref() {
                self.grant_role(guild_id, discord_id, verified, &held, &mut outcome)
                    .await;
            }

            self.sync_realm_roles(guild_id, discord_id, address, &held, &config, &mut outcome)
                .await;
        }

        info!(
            discord_id,
            guilds = guilds.len(),
            added = outcome.roles_added,
            errors = outcome.errors,
            "Processed user link"
        );
        Ok(outcome)
    }

    /// A user-address link was revoked: remove the verified role and
    /// every monitored realm-based role in every guild.
    ///
    /// # Errors
    ///
    /// Returns an error when the guild list cannot be obtained at all;
    /// per-guild failures are absorbed and counted.
    #[instrument(skip(self), fields(discord_id, triggered_by))]
    pub async fn handle_user_unlinked(
        &self,
        discord_id: &str,
        _address: &str,
        triggered_by: &str,
    ) -> Result<VerificationOutcome> {
        let guilds = self.platform().list_guilds().await?;
        let mut outcome = VerificationOutcome::default();

        for guild_id in &guilds {
            let Ok(held) = self.platform().member_roles(guild_id, discord_id).await else {
                continue;
            };

            let config = match self.guild_config(guild_id).await {
                Ok(config) => config,
                Err(err) => {
                    warn!(guild_id, error = %err, "Failed to load guild config");
                    outcome.errors += 1;
                    continue;
                }
            };

            if let Some(verified) = config.verified_role_id.as_deref() {
                self.revoke_role(guild_id, discord_id, verified, &held, &mut outcome)
                    .await;
            }

            self.remove_realm_roles(guild_id, discord_id, &held, &config, &mut outcome)
                .await;
        }

        info!(
            discord_id,
            triggered_by,
            removed = outcome.roles_removed,
            errors = outcome.errors,
            "Processed user unlink"
        );
        Ok(outcome)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // ROLE EVENTS
    // ───────────────────────────────────────────────────────────────────────────

    /// A realm role was linked to a platform role: sweep the managing
    /// guild's members and grant or revoke the platform role per the
    /// on-chain membership check.
    ///
    /// Ignored when the event targets another guild.
    ///
    /// # Errors
    ///
    /// Returns an error when the member roster cannot be listed;
    /// per-member failures are absorbed and counted.
    #[instrument(skip(self, event), fields(guild_id = %event.discord_guild_id, realm_path = %event.realm_path, role_name = %event.role_name))]
    pub async fn handle_role_linked(
        &self,
        managing_guild_id: &str,
        event: &RoleEvent,
    ) -> Result<VerificationOutcome> {
        if event.discord_guild_id != managing_guild_id {
            debug!(managing_guild_id, "Role event targets another guild, ignoring");
            return Ok(VerificationOutcome::default());
        }

        let members = self
            .platform()
            .list_members(managing_guild_id, 0)
            .await?;
        let mut outcome = VerificationOutcome::default();

        for member in members.iter().filter(|m| !m.is_bot) {
            let linked = match self.rolelink().linked_address(&member.user_id).await {
                Ok(linked) => linked,
                Err(err) => {
                    warn!(user_id = %member.user_id, error = %err, "Linked-address lookup failed");
                    outcome.errors += 1;
                    continue;
                }
            };

            let has_realm_role = match linked {
                Some(address) => match self
                    .rolelink()
                    .has_realm_role(&event.realm_path, &event.role_name, &address)
                    .await
                {
                    Ok(has) => has,
                    Err(err) => {
                        warn!(user_id = %member.user_id, error = %err, "Realm-role check failed");
                        outcome.errors += 1;
                        continue;
                    }
                },
                None => false,
            };

            if has_realm_role {
                self.grant_role(
                    managing_guild_id,
                    &member.user_id,
                    &event.discord_role_id,
                    &member.role_ids,
                    &mut outcome,
                )
                .await;
            } else {
                self.revoke_role(
                    managing_guild_id,
                    &member.user_id,
                    &event.discord_role_id,
                    &member.role_ids,
                    &mut outcome,
                )
                .await;
            }
        }

        info!(
            realm_path = %event.realm_path,
            role_name = %event.role_name,
            added = outcome.roles_added,
            removed = outcome.roles_removed,
            "Processed role link"
        );
        Ok(outcome)
    }

    /// A realm-role link was removed: the platform role is no longer
    /// managed, so revoke it from every member holding it.
    ///
    /// Ignored when the event targets another guild.
    ///
    /// # Errors
    ///
    /// Returns an error when the member roster cannot be listed;
    /// per-member failures are absorbed and counted.
    #[instrument(skip(self, event), fields(guild_id = %event.discord_guild_id, realm_path = %event.realm_path, role_name = %event.role_name))]
    pub async fn handle_role_unlinked(
        &self,
        managing_guild_id: &str,
        event: &RoleEvent,
    ) -> Result<VerificationOutcome> {
        if event.discord_guild_id != managing_guild_id {
            debug!(managing_guild_id, "Role event targets another guild, ignoring");
            return Ok(VerificationOutcome::default());
        }

        let members = self
            .platform()
            .list_members(managing_guild_id, 0)
            .await?;
        let mut outcome = VerificationOutcome::default();

        for member in members.iter().filter(|m| !m.is_bot) {
            self.revoke_role(
                managing_guild_id,
                &member.user_id,
                &event.discord_role_id,
                &member.role_ids,
                &mut outcome,
            )
            .await;
        }

        info!(
            realm_path = %event.realm_path,
            role_name = %event.role_name,
            removed = outcome.roles_removed,
            "Processed role unlink"
        );
        Ok(outcome)
    }
}
