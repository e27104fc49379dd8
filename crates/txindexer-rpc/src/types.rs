//! Wire types for the transaction-indexer JSON-RPC surface.
//!
//! The indexer speaks plain JSON-RPC 2.0 over HTTP with two methods:
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `index_latestBlockHeight` | — | integer block height |
//! | `index_listTransactions` | [`TxFilter`] | array of [`IndexedTx`] |
//!
//! Transactions come back ordered by `(block_height ASC, index ASC)` and
//! the filter is exclusive at the cursor: a transaction matches when
//! `(block > from_block) ∨ (block = from_block ∧ index > from_tx_index)`
//! and `block ≤ to_block`.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION QUERY FILTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter parameters for `index_listTransactions`.
///
/// Selects transactions carrying at least one event whose realm package
/// path equals `package_path`, strictly after the `(from_block,
/// from_tx_index)` cursor and up to (and including) `to_block`.
#[derive(Debug, Clone, Serialize)]
pub struct TxFilter {
    /// Realm package path the events must originate from.
    pub package_path: String,

    /// Cursor block height (exclusive together with `from_tx_index`).
    pub from_block: u64,

    /// Cursor transaction index within `from_block` (exclusive).
    pub from_tx_index: u32,

    /// Ceiling block height (inclusive).
    pub to_block: u64,
}

impl TxFilter {
    /// Create a new filter for a package path and cursor range.
    #[must_use]
    pub fn new(
        package_path: impl Into<String>,
        from_block: u64,
        from_tx_index: u32,
        to_block: u64,
    ) -> Self {
        Self {
            package_path: package_path.into(),
            from_block,
            from_tx_index,
            to_block,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXED TRANSACTIONS AND EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A single `(key, value)` event attribute. Both sides are strings on the
/// wire regardless of the logical type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttr {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

impl EventAttr {
    /// Create an attribute from a key/value pair.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A typed event emitted by a realm within a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    /// Event type name (e.g. `UserLinked`).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Package path of the emitting realm.
    pub pkg_path: String,

    /// Ordered attribute list.
    #[serde(default)]
    pub attrs: Vec<EventAttr>,
}

impl TxEvent {
    /// Look up an attribute value by key.
    ///
    /// Returns the first match; the indexer never emits duplicate keys.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// A transaction returned by the indexer, with its emitted events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedTx {
    /// Transaction hash (base64 on this chain, opaque to the client).
    pub hash: String,

    /// Height of the block containing the transaction.
    pub block_height: u64,

    /// Index of the transaction within its block.
    pub index: u32,

    /// Events emitted by the transaction.
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

impl IndexedTx {
    /// The `(block_height, index)` ordering key of this transaction.
    #[must_use]
    pub const fn ordering_key(&self) -> (u64, u32) {
        (self.block_height, self.index)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JSON-RPC ENVELOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a, P> {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: &'a str,
    /// Method parameters.
    pub params: P,
    /// Request ID for correlation.
    pub id: u64,
}

impl<'a, P> JsonRpcRequest<'a, P> {
    pub fn new(method: &'a str, params: P, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "R: serde::de::Deserialize<'de>"))]
pub(crate) struct JsonRpcResponse<R> {
    /// Result payload (absent on error).
    #[serde(default)]
    pub result: Option<R>,
    /// Error payload (absent on success).
    #[serde(default)]
    pub error: Option<crate::error::RpcErrorDetail>,
    /// Echoed request ID.
    #[allow(dead_code)]
    pub id: Option<u64>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
