//! JSON-RPC client for the chain's transaction indexer.
//!
//! The indexer ingests blocks from the chain and exposes a small JSON-RPC
//! surface over HTTP. This crate wraps that surface in a typed client:
//!
//! - **Tip queries**: [`IndexerClient::latest_height`] reports the highest
//!   block the indexer has ingested.
//! - **Transaction queries**: [`IndexerClient::query_transactions`] returns
//!   transactions carrying events for a given realm package path, strictly
//!   after a `(block, tx_index)` cursor, in ascending order.
//! - **Bounded retries**: the `*_with_retry` variants retry transient
//!   failures with exponential backoff and honor cooperative cancellation.
//!
//! # Example
//!
//! ```ignore
//! use txindexer_rpc::{IndexerClient, TxFilter};
//!
//! let client = IndexerClient::new("http://localhost:8546/rpc")?;
//!
//! let tip = client.latest_height().await?;
//! let filter = TxFilter::new("gno.land/r/guilds/users", 0, 0, tip);
//! let txs = client.query_transactions(&filter).await?;
//! for tx in txs {
//!     println!("{} @ ({}, {})", tx.hash, tx.block_height, tx.index);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::IndexerClient;
pub use config::ClientConfig;
pub use error::{IndexerRpcError, Result};
pub use types::{EventAttr, IndexedTx, TxEvent, TxFilter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}
