//! Query-id definitions.
//!
//! A *query* is a durable unit of periodic work against one guild: the
//! two event-stream queries pull chain events, the three verification
//! queries drive tiered re-verification. Each owns a [`QueryState`] row
//! in the guild configuration.
//!
//! On every processor pass the stored query set is reconciled with
//! these definitions: obsolete ids (from older releases) are dropped,
//! missing core queries are added and enabled.

use crate::types::GuildConfig;

/// Event-stream query over the user-linking realm.
pub const USER_EVENTS: &str = "user_events";

/// Event-stream query over the role-linking realm.
pub const ROLE_EVENTS: &str = "role_events";

/// High-priority verification tier.
pub const VERIFY_HIGH_PRIORITY: &str = "verify_high_priority";

/// Medium-priority verification tier.
pub const VERIFY_MEDIUM_PRIORITY: &str = "verify_medium_priority";

/// Low-priority (paged) verification tier.
pub const VERIFY_LOW_PRIORITY: &str = "verify_low_priority";

/// The event-stream queries every guild runs.
pub const CORE_STREAM_QUERIES: [&str; 2] = [USER_EVENTS, ROLE_EVENTS];

/// The verification queries the scheduler drives.
pub const VERIFICATION_QUERIES: [&str; 3] = [
    VERIFY_HIGH_PRIORITY,
    VERIFY_MEDIUM_PRIORITY,
    VERIFY_LOW_PRIORITY,
];

/// Whether this build knows the query id.
#[must_use]
pub fn is_known(query_id: &str) -> bool {
    CORE_STREAM_QUERIES.contains(&query_id) || VERIFICATION_QUERIES.contains(&query_id)
}

/// Reconcile a guild's stored query set with the current definitions.
///
/// Removes states for obsolete ids and creates enabled states for
/// missing core stream queries. Verification states are created lazily
/// by the scheduler on first tick. Returns whether anything changed.
pub fn reconcile_query_set(config: &mut GuildConfig) -> bool {
    let before = config.query_states.len();
    config.query_states.retain(|id, _| is_known(id));
    let mut changed = config.query_states.len() != before;

    for query_id in CORE_STREAM_QUERIES {
        if !config.query_states.contains_key(query_id) {
            config.query_state_mut(query_id).enabled = true;
            changed = true;
        }
    }

    changed
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
