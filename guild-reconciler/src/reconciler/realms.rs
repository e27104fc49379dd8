//! Realm-role synchronization and monitored-realm discovery.
//!
//! A guild's *monitored realms* are the realm paths whose role mappings
//! this engine actively reconciles. The set starts empty and is
//! discovered from the guild's own role names: a linked role is named
//! `{roleName}-{realmPath}` (e.g. `mod-gno.land/r/demo`), so any role
//! whose name embeds a realm path is a discovery candidate, confirmed
//! against the on-chain link registry before it counts.

use tracing::{debug, instrument, warn};

use super::Reconciler;
use super::verification::VerificationOutcome;
use crate::store::update_config;
use crate::types::GuildConfig;

/// Prefix every reconcilable realm path carries.
pub const REALM_PATH_PREFIX: &str = "gno.land/r/";

// ═══════════════════════════════════════════════════════════════════════════════
// ROLE-NAME CONVENTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Split a linked role name into `(role_name, realm_path)`.
///
/// The convention is `{roleName}-{realmPath}` with the realm path
/// beginning with `gno.land/r/`. Role names may themselves contain
/// hyphens; the split happens at the hyphen introducing the realm path.
#[must_use]
pub fn parse_linked_role_name(name: &str) -> Option<(&str, &str)> {
    let marker = format!("-{REALM_PATH_PREFIX}");
    let at = name.find(&marker)?;
    let role_name = &name[..at];
    let realm_path = &name[at + 1..];
    if role_name.is_empty() {
        return None;
    }
    Some((role_name, realm_path))
}

// ═══════════════════════════════════════════════════════════════════════════════
// REALM-ROLE SYNCHRONIZATION
// ═══════════════════════════════════════════════════════════════════════════════

impl Reconciler {
    /// True-up one user's realm-based roles against the chain.
    ///
    /// For every mapping of every monitored realm: holds-on-chain but
    /// not-on-platform adds the platform role; on-platform but
    /// not-on-chain removes it; agreement is a no-op. Failures on one
    /// mapping never stop the rest.
    pub(crate) async fn sync_realm_roles(
        &self,
        guild_id: &str,
        user_id: &str,
        address: &str,
        held: &[String],
        config: &GuildConfig,
        outcome: &mut VerificationOutcome,
    ) {
        let realms = self.resolve_monitored_realms(guild_id, config).await;
        if realms.is_empty() {
            return;
        }

        for realm_path in &realms {
            let mappings = match self.rolelink().linked_roles(realm_path, guild_id).await {
                Ok(mappings) => mappings,
                Err(err) => {
                    warn!(guild_id, realm_path, error = %err, "Failed to list realm role mappings");
                    outcome.errors += 1;
                    continue;
                }
            };

            for mapping in mappings {
                let has_realm_role = match self
                    .rolelink()
                    .has_realm_role(realm_path, &mapping.role_name, address)
                    .await
                {
                    Ok(has) => has,
                    Err(err) => {
                        warn!(
                            guild_id,
                            realm_path,
                            role_name = %mapping.role_name,
                            error = %err,
                            "Realm-role membership check failed"
                        );
                        outcome.errors += 1;
                        continue;
                    }
                };

                let has_platform_role = held.iter().any(|r| *r == mapping.platform_role_id);

                if has_realm_role && !has_platform_role {
                    self.grant_role(guild_id, user_id, &mapping.platform_role_id, held, outcome)
                        .await;
                } else if !has_realm_role && has_platform_role {
                    self.revoke_role(guild_id, user_id, &mapping.platform_role_id, held, outcome)
                        .await;
                }
            }
        }
    }

    /// Remove every realm-based role the user holds for any monitored
    /// realm (the unlink / straggler-cleanup path).
    pub(crate) async fn remove_realm_roles(
        &self,
        guild_id: &str,
        user_id: &str,
        held: &[String],
        config: &GuildConfig,
        outcome: &mut VerificationOutcome,
    ) {
        let realms = self.resolve_monitored_realms(guild_id, config).await;

        for realm_path in &realms {
            let mappings = match self.rolelink().linked_roles(realm_path, guild_id).await {
                Ok(mappings) => mappings,
                Err(err) => {
                    warn!(guild_id, realm_path, error = %err, "Failed to list realm role mappings");
                    outcome.errors += 1;
                    continue;
                }
            };

            for mapping in mappings {
                self.revoke_role(guild_id, user_id, &mapping.platform_role_id, held, outcome)
                    .await;
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONITORED-REALM DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

impl Reconciler {
    /// Resolve the guild's monitored realms, running discovery when the
    /// cached set is empty.
    ///
    /// Discovery results are cached back into the guild configuration
    /// best-effort; a persistence failure does not abort the enclosing
    /// operation.
    pub(crate) async fn resolve_monitored_realms(
        &self,
        guild_id: &str,
        config: &GuildConfig,
    ) -> Vec<String> {
        let cached = config.monitored_realms();
        if !cached.is_empty() {
            return cached;
        }

        match self.discover_monitored_realms(guild_id).await {
            Ok(discovered) => {
                if !discovered.is_empty() {
                    self.cache_monitored_realms(guild_id, &discovered).await;
                }
                discovered
            }
            Err(err) => {
                warn!(guild_id, error = %err, "Monitored-realm discovery failed");
                Vec::new()
            }
        }
    }

    /// Scan the guild's roles for the linking convention and confirm
    /// each candidate against the on-chain registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the guild roster cannot be listed; individual
    /// candidate confirmations that fail are skipped.
    #[instrument(skip(self), fields(guild_id))]
    pub async fn discover_monitored_realms(&self, guild_id: &str) -> crate::error::Result<Vec<String>> {
        let roles = self.platform().guild_roles(guild_id).await?;

        let mut discovered: Vec<String> = Vec::new();
        for role in &roles {
            if !role.name.contains(REALM_PATH_PREFIX) {
                continue;
            }
            let Some((role_name, realm_path)) = parse_linked_role_name(&role.name) else {
                continue;
            };

            match self
                .rolelink()
                .linked_role(realm_path, role_name, guild_id)
                .await
            {
                Ok(Some(mapping)) if mapping.platform_role_id == role.id => {
                    if !discovered.iter().any(|r| r == realm_path) {
                        discovered.push(realm_path.to_string());
                    }
                }
                Ok(_) => {
                    // Name matched the convention but the chain does not
                    // confirm it; likely a coincidentally-named role
                    debug!(guild_id, role_name = %role.name, "Unconfirmed linked-role candidate");
                }
                Err(err) => {
                    warn!(guild_id, realm_path, error = %err, "Candidate confirmation failed");
                }
            }
        }

        debug!(guild_id, realms = discovered.len(), "Discovered monitored realms");
        Ok(discovered)
    }

    /// Cache a discovered set into the guild configuration, best-effort.
    async fn cache_monitored_realms(&self, guild_id: &str, realms: &[String]) {
        let result = update_config(self.store().as_ref(), guild_id, |config| {
            config.set_monitored_realms(realms);
        })
        .await;

        if let Err(err) = result {
            warn!(guild_id, error = %err, "Failed to cache monitored realms");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
