//! Persisted configuration records.
//!
//! One [`GuildConfig`] JSON document exists per guild, holding the guild's
//! role wiring, free-form settings, and the [`QueryState`] rows that drive
//! the event-stream and verification loops. A singleton [`GlobalConfig`]
//! carries a summary tip height.
//!
//! # Versioning
//!
//! The store hands records out wrapped in [`Versioned`], carrying an
//! opaque [`VersionTag`]. Writers pass the tag back; a mismatch at the
//! backend surfaces as a concurrency conflict and the caller re-reads.
//! The tag travels out of band (transport headers at the object store),
//! never inside the document body.
//!
//! # Copy semantics
//!
//! Every record returned by a store is a deep, independent copy. All types
//! here own their data (`String` keys, owned maps), so `Clone` is a deep
//! copy by construction.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// VERSION TAGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque optimistic-concurrency tag issued by a store backend.
///
/// Compared only for equality; the contents mean nothing to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    /// Wrap a backend-issued tag value.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The raw tag value, for backends that echo it into headers.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record together with the version tag it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// The record value (a deep copy, owned by the caller).
    pub value: T,
    /// The version tag to pass back on write.
    pub version: VersionTag,
}

impl<T> Versioned<T> {
    /// Pair a value with its version tag.
    #[must_use]
    pub const fn new(value: T, version: VersionTag) -> Self {
        Self { value, version }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION CURSOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Resume point of an event-stream query: the last `(block, tx_index)`
/// whose transaction was fully reconciled.
///
/// Ordering is lexicographic on `(block, tx_index)`, matching the order
/// the indexer delivers transactions in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TxCursor {
    /// Last processed block height.
    pub block: u64,
    /// Last processed transaction index within that block.
    pub tx_index: u32,
}

impl TxCursor {
    /// Create a cursor at a specific position.
    #[must_use]
    pub const fn new(block: u64, tx_index: u32) -> Self {
        Self { block, tx_index }
    }

    /// The zero cursor: nothing processed yet. Every real transaction
    /// orders strictly after it.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            block: 0,
            tx_index: 0,
        }
    }
}

impl fmt::Display for TxCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block, self.tx_index)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable per-(guild, query) record: cursor, timing, enablement, error
/// counters, and free-form scratch state.
///
/// # Invariants
///
/// - The cursor is monotonically non-decreasing across successful passes,
///   except for the explicit reset when the indexer tip regresses below it
///   (chain reset).
/// - `is_executing` is cleared on every exit path; it is the in-instance
///   mutex for the query, enforced by persist-first writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    /// Owning guild.
    pub guild_id: String,

    /// Query identifier (see [`crate::stream::queries`]).
    pub query_id: String,

    /// Last processed block height.
    pub last_processed_block: u64,

    /// Last processed transaction index within that block.
    pub last_processed_tx_index: u32,

    /// In-instance execution flag. Persisted before a run starts; a lost
    /// write race surfaces as a concurrency conflict and the tick is
    /// skipped.
    pub is_executing: bool,

    /// When the query last ran.
    pub last_run_timestamp: Option<DateTime<Utc>>,

    /// When the query should next run.
    pub next_run_timestamp: Option<DateTime<Utc>>,

    /// Whether the query is enabled.
    pub enabled: bool,

    /// Query-specific scratch state (paging cursors, presence tiers).
    #[serde(default)]
    pub state: HashMap<String, serde_json::Value>,

    /// Cumulative error count.
    pub error_count: u64,

    /// Message of the most recent error.
    pub last_error: Option<String>,

    /// When the most recent error occurred.
    pub last_error_time: Option<DateTime<Utc>>,
}

/// Scratch-state key holding the low-priority verification paging index.
pub const SCRATCH_LAST_USER_INDEX: &str = "last_user_index";

/// Scratch-state key holding the serialized presence tier map.
pub const SCRATCH_PRESENCE_TIERS: &str = "presence_tiers";

impl QueryState {
    /// Create a fresh, enabled query state with a zero cursor.
    #[must_use]
    pub fn new(guild_id: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            query_id: query_id.into(),
            last_processed_block: 0,
            last_processed_tx_index: 0,
            is_executing: false,
            last_run_timestamp: None,
            next_run_timestamp: None,
            enabled: true,
            state: HashMap::new(),
            error_count: 0,
            last_error: None,
            last_error_time: None,
        }
    }

    /// The current resume cursor.
    #[must_use]
    pub const fn cursor(&self) -> TxCursor {
        TxCursor::new(self.last_processed_block, self.last_processed_tx_index)
    }

    /// Advance the cursor. Positions at or before the current cursor are
    /// ignored, preserving monotonicity.
    pub fn advance_cursor(&mut self, to: TxCursor) {
        if to > self.cursor() {
            self.last_processed_block = to.block;
            self.last_processed_tx_index = to.tx_index;
        }
    }

    /// Reset the cursor to zero. Only called when the indexer reports a
    /// tip below the stored cursor (chain reset).
    pub fn reset_cursor(&mut self) {
        self.last_processed_block = 0;
        self.last_processed_tx_index = 0;
    }

    /// Whether the query is due to run at `now`.
    ///
    /// A query with no `next_run_timestamp` yet is always due.
    #[must_use]
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_timestamp.is_none_or(|next| next <= now)
    }

    /// Record a completed run and schedule the next one.
    pub fn record_run(&mut self, now: DateTime<Utc>, interval: chrono::Duration) {
        self.last_run_timestamp = Some(now);
        self.next_run_timestamp = Some(now + interval);
    }

    /// Record a failure on this query.
    pub fn record_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.error_count += 1;
        self.last_error = Some(message.into());
        self.last_error_time = Some(now);
    }

    /// Read a scratch value, deserialized to `T`. Missing keys and
    /// type mismatches both read as `None`.
    #[must_use]
    pub fn scratch<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Write a scratch value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized to JSON.
    pub fn set_scratch<T: Serialize>(&mut self, key: &str, value: &T) -> serde_json::Result<()> {
        self.state
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUILD CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-guild configuration document.
///
/// Created on first observation of a guild, mutated by the reconciler,
/// scheduler, and event processor; never deleted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Guild identifier (document identity).
    pub guild_id: String,

    /// Role allowed to administer linkage for this guild.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_role_id: Option<String>,

    /// Role granted to any member with a linked on-chain address. When
    /// unset, the verified tier is disabled for this guild. When set, it
    /// must name a role that currently exists on the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_role_id: Option<String>,

    /// Free-form string settings.
    #[serde(default)]
    pub settings: HashMap<String, String>,

    /// Query states keyed by query id.
    #[serde(default)]
    pub query_states: HashMap<String, QueryState>,

    /// Last time this document was written.
    pub last_updated: DateTime<Utc>,
}

/// Settings key caching the discovered monitored-realm set, stored as a
/// JSON array of realm paths.
pub const SETTING_MONITORED_REALMS: &str = "monitored_realms";

impl GuildConfig {
    /// Create a fresh configuration for a guild.
    #[must_use]
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            admin_role_id: None,
            verified_role_id: None,
            settings: HashMap::new(),
            query_states: HashMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Get a query state, creating a fresh one if absent.
    pub fn query_state_mut(&mut self, query_id: &str) -> &mut QueryState {
        let guild_id = self.guild_id.clone();
        self.query_states
            .entry(query_id.to_string())
            .or_insert_with(|| QueryState::new(guild_id, query_id))
    }

    /// The cached monitored-realm set, empty when never discovered.
    #[must_use]
    pub fn monitored_realms(&self) -> Vec<String> {
        self.settings
            .get(SETTING_MONITORED_REALMS)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Cache a discovered monitored-realm set.
    pub fn set_monitored_realms(&mut self, realms: &[String]) {
        // serializing Vec<String> cannot fail
        if let Ok(raw) = serde_json::to_string(realms) {
            self.settings
                .insert(SETTING_MONITORED_REALMS.to_string(), raw);
        }
    }

    /// Stamp the document as modified now.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBAL CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide singleton record.
///
/// Summary/diagnostic only; the per-guild cursors are authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Highest block any guild's event stream has processed.
    pub last_processed_block: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROLE MAPPINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// A realm-published link between an on-chain realm role and a platform
/// role. Owned by the on-chain realm; the engine only observes these.
///
/// Unique by `(realm_path, role_name, guild_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// Realm package path declaring the role.
    pub realm_path: String,

    /// Role name within the realm.
    pub role_name: String,

    /// Guild the mapping targets.
    pub guild_id: String,

    /// Platform role id the mapping grants.
    pub platform_role_id: String,

    /// Platform role name at publication time.
    pub platform_role_name: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRESENCE TIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Advisory per-guild map of user ids by activity tier, maintained from
/// platform presence events and persisted in query scratch state so it
/// survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceTiers {
    /// Recently-active users.
    #[serde(default)]
    pub high: Vec<String>,
    /// Intermediate tier (reserved; presence events do not populate it).
    #[serde(default)]
    pub medium: Vec<String>,
    /// Inactive users.
    #[serde(default)]
    pub low: Vec<String>,
}

impl PresenceTiers {
    /// Re-tier a user: removed from all tiers, then inserted into `high`
    /// when active, `low` otherwise.
    pub fn update(&mut self, user_id: &str, active: bool) {
        self.remove(user_id);
        if active {
            self.high.push(user_id.to_string());
        } else {
            self.low.push(user_id.to_string());
        }
    }

    /// Remove a user from every tier.
    pub fn remove(&mut self, user_id: &str) {
        self.high.retain(|u| u != user_id);
        self.medium.retain(|u| u != user_id);
        self.low.retain(|u| u != user_id);
    }

    /// Whether the user is currently in the high tier.
    #[must_use]
    pub fn is_active(&self, user_id: &str) -> bool {
        self.high.iter().any(|u| u == user_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
