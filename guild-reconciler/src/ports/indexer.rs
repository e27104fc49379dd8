//! Engine-facing view of the transaction indexer.
//!
//! The event-stream processor programs against this trait; production
//! wires it to [`txindexer_rpc::IndexerClient`] via the adapter in
//! [`crate::stream`], tests use an in-memory fake.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use txindexer_rpc::IndexedTx;

use crate::error::Result;
use crate::types::TxCursor;

/// Port for chain tip and ordered transaction queries.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Current tip of the chain as reported by the indexer.
    ///
    /// # Errors
    ///
    /// Returns an error after bounded retries are exhausted or on
    /// cancellation.
    async fn latest_height(&self, cancel: &CancellationToken) -> Result<u64>;

    /// Transactions carrying events for `package_path`, strictly after
    /// `cursor` and up to `to_block` inclusive, ascending by
    /// `(block, index)`.
    ///
    /// # Errors
    ///
    /// Returns an error after bounded retries are exhausted or on
    /// cancellation.
    async fn transactions_after(
        &self,
        package_path: &str,
        cursor: TxCursor,
        to_block: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexedTx>>;
}
