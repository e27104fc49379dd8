//! Read-only view of on-chain link state.
//!
//! The role realm owns every [`RoleMapping`]; this engine only observes.
//! Adapters typically answer these queries by calling realm view
//! functions through a chain RPC.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RoleMapping;

/// Port for the on-chain link registry.
#[async_trait]
pub trait RoleLink: Send + Sync {
    /// The on-chain address linked to a platform user, if any.
    ///
    /// A user with any linked address is "registered".
    ///
    /// # Errors
    ///
    /// Returns an error if the chain query fails.
    async fn linked_address(&self, discord_id: &str) -> Result<Option<String>>;

    /// Whether `address` holds `role_name` in the realm at `realm_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain query fails.
    async fn has_realm_role(
        &self,
        realm_path: &str,
        role_name: &str,
        address: &str,
    ) -> Result<bool>;

    /// All mappings a realm publishes for one guild.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain query fails.
    async fn linked_roles(&self, realm_path: &str, guild_id: &str) -> Result<Vec<RoleMapping>>;

    /// All mappings targeting a guild, across every realm.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain query fails.
    async fn all_roles_by_guild(&self, guild_id: &str) -> Result<Vec<RoleMapping>>;

    /// The single mapping for `(realm_path, role_name, guild_id)`, if
    /// published.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain query fails.
    async fn linked_role(
        &self,
        realm_path: &str,
        role_name: &str,
        guild_id: &str,
    ) -> Result<Option<RoleMapping>>;
}
