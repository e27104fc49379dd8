//! Typed chain events.
//!
//! The linking realms emit four event types, all carrying string
//! attributes. [`ChainEvent::parse`] turns an indexer `(type, attrs)`
//! pair into a typed event; unknown types parse to `None` so new realm
//! events never break the stream.
//!
//! | Event | Attributes |
//! |-------|------------|
//! | `UserLinked` | `discord_id`, `address` |
//! | `UserUnlinked` | `discord_id`, `address`, `triggered_by` |
//! | `RoleLinked` | `realm_path`, `role_name`, `discord_guild_id`, `discord_role_id` |
//! | `RoleUnlinked` | `realm_path`, `role_name`, `discord_guild_id`, `discord_role_id` |

use txindexer_rpc::TxEvent;

use crate::error::DomainError;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Type name of the user-link event.
pub const USER_LINKED: &str = "UserLinked";

/// Type name of the user-unlink event.
pub const USER_UNLINKED: &str = "UserUnlinked";

/// Type name of the role-link event.
pub const ROLE_LINKED: &str = "RoleLinked";

/// Type name of the role-unlink event.
pub const ROLE_UNLINKED: &str = "RoleUnlinked";

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Position metadata carried alongside every dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    /// Hash of the carrying transaction.
    pub tx_hash: String,
    /// Block height of the carrying transaction.
    pub block: u64,
    /// Index of the carrying transaction within its block.
    pub tx_index: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload shared by `RoleLinked` and `RoleUnlinked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEvent {
    /// Realm package path declaring the role.
    pub realm_path: String,
    /// Role name within the realm.
    pub role_name: String,
    /// Guild the mapping targets.
    pub discord_guild_id: String,
    /// Platform role id the mapping grants.
    pub discord_role_id: String,
}

/// A typed event from one of the linking realms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A user proved ownership of an on-chain address.
    UserLinked {
        /// Platform user id.
        discord_id: String,
        /// Linked on-chain address.
        address: String,
    },

    /// A user-address link was revoked.
    UserUnlinked {
        /// Platform user id.
        discord_id: String,
        /// Formerly linked address.
        address: String,
        /// Who triggered the unlink (the user, an admin, the realm).
        triggered_by: String,
    },

    /// A realm role was linked to a platform role.
    RoleLinked(RoleEvent),

    /// A realm-role link was removed.
    RoleUnlinked(RoleEvent),
}

impl ChainEvent {
    /// The event's type name as it appears on the wire.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::UserLinked { .. } => USER_LINKED,
            Self::UserUnlinked { .. } => USER_UNLINKED,
            Self::RoleLinked(_) => ROLE_LINKED,
            Self::RoleUnlinked(_) => ROLE_UNLINKED,
        }
    }

    /// Parse a typed event from an indexer event.
    ///
    /// Returns `Ok(None)` for event types this engine does not consume.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EventParse`] when a known event type is
    /// missing a required attribute.
    pub fn parse(event: &TxEvent) -> Result<Option<Self>, DomainError> {
        match event.event_type.as_str() {
            USER_LINKED => Ok(Some(Self::UserLinked {
                discord_id: required(event, "discord_id")?,
                address: required(event, "address")?,
            })),
            USER_UNLINKED => Ok(Some(Self::UserUnlinked {
                discord_id: required(event, "discord_id")?,
                address: required(event, "address")?,
                triggered_by: required(event, "triggered_by")?,
            })),
            ROLE_LINKED => Ok(Some(Self::RoleLinked(parse_role_event(event)?))),
            ROLE_UNLINKED => Ok(Some(Self::RoleUnlinked(parse_role_event(event)?))),
            _ => Ok(None),
        }
    }
}

fn parse_role_event(event: &TxEvent) -> Result<RoleEvent, DomainError> {
    Ok(RoleEvent {
        realm_path: required(event, "realm_path")?,
        role_name: required(event, "role_name")?,
        discord_guild_id: required(event, "discord_guild_id")?,
        discord_role_id: required(event, "discord_role_id")?,
    })
}

fn required(event: &TxEvent, key: &str) -> Result<String, DomainError> {
    event
        .attr(key)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DomainError::EventParse {
            event_type: event.event_type.clone(),
            reason: format!("missing attribute {key}"),
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
