//! Shared fixtures and mock ports for the integration suites.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use txindexer_rpc::{EventAttr, IndexedTx, TxEvent};

use guild_reconciler::error::{InfraError, Result};
use guild_reconciler::ports::{
    GuildPlatform, Indexer, Member, Presence, Role, RoleLink,
};
use guild_reconciler::types::{RoleMapping, TxCursor};

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK PLATFORM
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Clone)]
struct GuildState {
    members: Vec<Member>,
    roles: Vec<Role>,
}

/// In-memory chat platform with a mutation log.
///
/// Every mutating call is recorded, so tests can assert that a repeated
/// reconciliation issues zero platform mutations.
#[derive(Debug, Default)]
pub struct MockPlatform {
    guilds: Mutex<HashMap<String, GuildState>>,
    presences: Mutex<HashMap<(String, String), Presence>>,
    mutations: Mutex<Vec<String>>,
    role_counter: Mutex<u32>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a guild with no members or roles.
    pub fn seed_guild(&self, guild_id: &str) {
        self.guilds
            .lock()
            .unwrap()
            .entry(guild_id.to_string())
            .or_default();
    }

    /// Add a member, bypassing the mutation log.
    pub fn seed_member(&self, guild_id: &str, user_id: &str, is_bot: bool, roles: &[&str]) {
        self.seed_guild(guild_id);
        self.guilds
            .lock()
            .unwrap()
            .get_mut(guild_id)
            .unwrap()
            .members
            .push(Member {
                user_id: user_id.to_string(),
                is_bot,
                role_ids: roles.iter().map(ToString::to_string).collect(),
            });
    }

    /// Define a role, bypassing the mutation log.
    pub fn seed_role(&self, guild_id: &str, role_id: &str, name: &str) {
        self.seed_guild(guild_id);
        self.guilds
            .lock()
            .unwrap()
            .get_mut(guild_id)
            .unwrap()
            .roles
            .push(Role {
                id: role_id.to_string(),
                name: name.to_string(),
                color: 0,
            });
    }

    /// Set a member's presence snapshot.
    pub fn set_presence(&self, guild_id: &str, user_id: &str, presence: Presence) {
        self.presences
            .lock()
            .unwrap()
            .insert((guild_id.to_string(), user_id.to_string()), presence);
    }

    /// The roles a member currently holds, or `None` for non-members.
    pub fn roles_of(&self, guild_id: &str, user_id: &str) -> Option<Vec<String>> {
        self.guilds
            .lock()
            .unwrap()
            .get(guild_id)?
            .members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.role_ids.clone())
    }

    /// Roles defined in a guild (test inspection).
    pub fn roles_in(&self, guild_id: &str) -> Vec<Role> {
        self.guilds
            .lock()
            .unwrap()
            .get(guild_id)
            .map(|g| g.roles.clone())
            .unwrap_or_default()
    }

    /// Total mutating platform calls so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    /// The mutation log (for ordering assertions).
    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.mutations.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl GuildPlatform for MockPlatform {
    async fn list_members(&self, guild_id: &str, _limit: usize) -> Result<Vec<Member>> {
        Ok(self
            .guilds
            .lock()
            .unwrap()
            .get(guild_id)
            .map(|g| g.members.clone())
            .unwrap_or_default())
    }

    async fn member_roles(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>> {
        self.roles_of(guild_id, user_id)
            .ok_or_else(|| InfraError::Platform(format!("unknown member {user_id}")).into())
    }

    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>> {
        Ok(self.roles_in(guild_id))
    }

    async fn create_role(&self, guild_id: &str, name: &str, color: u32) -> Result<Role> {
        // A little latency so racing creators actually overlap
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let id = {
            let mut counter = self.role_counter.lock().unwrap();
            *counter += 1;
            format!("created-{counter}")
        };
        let role = Role {
            id,
            name: name.to_string(),
            color,
        };
        self.guilds
            .lock()
            .unwrap()
            .entry(guild_id.to_string())
            .or_default()
            .roles
            .push(role.clone());
        self.log(format!("create_role:{guild_id}:{name}"));
        Ok(role)
    }

    async fn delete_role(&self, guild_id: &str, role_id: &str) -> Result<()> {
        if let Some(guild) = self.guilds.lock().unwrap().get_mut(guild_id) {
            guild.roles.retain(|r| r.id != role_id);
        }
        self.log(format!("delete_role:{guild_id}:{role_id}"));
        Ok(())
    }

    async fn add_member_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        let mut guilds = self.guilds.lock().unwrap();
        let member = guilds
            .get_mut(guild_id)
            .and_then(|g| g.members.iter_mut().find(|m| m.user_id == user_id))
            .ok_or_else(|| InfraError::Platform(format!("unknown member {user_id}")))?;
        if !member.role_ids.iter().any(|r| r == role_id) {
            member.role_ids.push(role_id.to_string());
        }
        drop(guilds);
        self.log(format!("add:{guild_id}:{user_id}:{role_id}"));
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<()> {
        let mut guilds = self.guilds.lock().unwrap();
        let member = guilds
            .get_mut(guild_id)
            .and_then(|g| g.members.iter_mut().find(|m| m.user_id == user_id))
            .ok_or_else(|| InfraError::Platform(format!("unknown member {user_id}")))?;
        member.role_ids.retain(|r| r != role_id);
        drop(guilds);
        self.log(format!("remove:{guild_id}:{user_id}:{role_id}"));
        Ok(())
    }

    async fn list_guilds(&self) -> Result<Vec<String>> {
        let mut guilds: Vec<String> = self.guilds.lock().unwrap().keys().cloned().collect();
        guilds.sort();
        Ok(guilds)
    }

    async fn presence(&self, guild_id: &str, user_id: &str) -> Result<Presence> {
        Ok(self
            .presences
            .lock()
            .unwrap()
            .get(&(guild_id.to_string(), user_id.to_string()))
            .copied()
            .unwrap_or(Presence::Unknown))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK ROLE LINK
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory on-chain link registry.
#[derive(Debug, Default)]
pub struct MockRoleLink {
    links: Mutex<HashMap<String, String>>,
    realm_roles: Mutex<HashMap<(String, String), Vec<String>>>,
    mappings: Mutex<Vec<RoleMapping>>,
}

impl MockRoleLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a platform user to an address.
    pub fn link(&self, discord_id: &str, address: &str) {
        self.links
            .lock()
            .unwrap()
            .insert(discord_id.to_string(), address.to_string());
    }

    /// Remove a user's link.
    pub fn unlink(&self, discord_id: &str) {
        self.links.lock().unwrap().remove(discord_id);
    }

    /// Grant an address a realm role.
    pub fn grant_realm_role(&self, realm_path: &str, role_name: &str, address: &str) {
        self.realm_roles
            .lock()
            .unwrap()
            .entry((realm_path.to_string(), role_name.to_string()))
            .or_default()
            .push(address.to_string());
    }

    /// Publish a role mapping.
    pub fn publish_mapping(&self, mapping: RoleMapping) {
        self.mappings.lock().unwrap().push(mapping);
    }
}

#[async_trait]
impl RoleLink for MockRoleLink {
    async fn linked_address(&self, discord_id: &str) -> Result<Option<String>> {
        Ok(self.links.lock().unwrap().get(discord_id).cloned())
    }

    async fn has_realm_role(
        &self,
        realm_path: &str,
        role_name: &str,
        address: &str,
    ) -> Result<bool> {
        Ok(self
            .realm_roles
            .lock()
            .unwrap()
            .get(&(realm_path.to_string(), role_name.to_string()))
            .is_some_and(|holders| holders.iter().any(|a| a == address)))
    }

    async fn linked_roles(&self, realm_path: &str, guild_id: &str) -> Result<Vec<RoleMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.realm_path == realm_path && m.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn all_roles_by_guild(&self, guild_id: &str) -> Result<Vec<RoleMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn linked_role(
        &self,
        realm_path: &str,
        role_name: &str,
        guild_id: &str,
    ) -> Result<Option<RoleMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .find(|m| {
                m.realm_path == realm_path && m.role_name == role_name && m.guild_id == guild_id
            })
            .cloned())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK INDEXER
// ═══════════════════════════════════════════════════════════════════════════════

/// Scripted indexer: a settable tip and a transaction log.
#[derive(Debug, Default)]
pub struct MockIndexer {
    tip: Mutex<u64>,
    txs: Mutex<Vec<IndexedTx>>,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&self, tip: u64) {
        *self.tip.lock().unwrap() = tip;
    }

    pub fn push_tx(&self, tx: IndexedTx) {
        self.txs.lock().unwrap().push(tx);
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    async fn latest_height(&self, _cancel: &CancellationToken) -> Result<u64> {
        Ok(*self.tip.lock().unwrap())
    }

    async fn transactions_after(
        &self,
        package_path: &str,
        cursor: TxCursor,
        to_block: u64,
        _cancel: &CancellationToken,
    ) -> Result<Vec<IndexedTx>> {
        let mut matching: Vec<IndexedTx> = self
            .txs
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| {
                tx.events.iter().any(|e| e.pkg_path == package_path)
                    && TxCursor::new(tx.block_height, tx.index) > cursor
                    && tx.block_height <= to_block
            })
            .cloned()
            .collect();
        matching.sort_unstable_by_key(IndexedTx::ordering_key);
        Ok(matching)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Package path of the user-linking realm (matches the default stream
/// configuration).
pub const USER_EVENTS_PKG: &str = "gno.land/r/guilds/users";

/// Package path of the role-linking realm.
pub const ROLE_EVENTS_PKG: &str = "gno.land/r/guilds/roles";

/// A transaction carrying a single event.
pub fn tx_with_event(
    block: u64,
    index: u32,
    pkg_path: &str,
    event_type: &str,
    attrs: &[(&str, &str)],
) -> IndexedTx {
    IndexedTx {
        hash: format!("tx-{block}-{index}"),
        block_height: block,
        index,
        events: vec![TxEvent {
            event_type: event_type.to_string(),
            pkg_path: pkg_path.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| EventAttr::new(*k, *v))
                .collect(),
        }],
    }
}

/// A `UserLinked` transaction.
pub fn user_linked_tx(block: u64, index: u32, discord_id: &str, address: &str) -> IndexedTx {
    tx_with_event(
        block,
        index,
        USER_EVENTS_PKG,
        "UserLinked",
        &[("discord_id", discord_id), ("address", address)],
    )
}

/// A `RoleLinked` transaction.
pub fn role_linked_tx(
    block: u64,
    index: u32,
    realm_path: &str,
    role_name: &str,
    guild_id: &str,
    role_id: &str,
) -> IndexedTx {
    tx_with_event(
        block,
        index,
        ROLE_EVENTS_PKG,
        "RoleLinked",
        &[
            ("realm_path", realm_path),
            ("role_name", role_name),
            ("discord_guild_id", guild_id),
            ("discord_role_id", role_id),
        ],
    )
}

/// A published mapping fixture.
pub fn mapping(
    realm_path: &str,
    role_name: &str,
    guild_id: &str,
    platform_role_id: &str,
    platform_role_name: &str,
) -> RoleMapping {
    RoleMapping {
        realm_path: realm_path.to_string(),
        role_name: role_name.to_string(),
        guild_id: guild_id.to_string(),
        platform_role_id: platform_role_id.to_string(),
        platform_role_name: platform_role_name.to_string(),
    }
}
