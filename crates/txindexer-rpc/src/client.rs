//! Transaction-indexer RPC client.
//!
//! [`IndexerClient`] is the entry point for querying the indexer:
//!
//! - [`latest_height`](IndexerClient::latest_height) — current indexer tip
//! - [`query_transactions`](IndexerClient::query_transactions) — events by
//!   package path, strictly after a cursor, in `(block, index)` order
//!
//! Both have `*_with_retry` variants that retry transient failures with
//! exponential backoff, bounded by [`ClientConfig::max_retries`], and
//! honor a [`CancellationToken`] between attempts.
//!
//! # Thread Safety
//!
//! The client is `Send + Sync` and can be shared across tasks. The
//! internal `reqwest::Client` is designed for concurrent use.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{IndexerRpcError, Result};
use crate::types::{IndexedTx, JsonRpcRequest, JsonRpcResponse, TxFilter};

// ═══════════════════════════════════════════════════════════════════════════════
// RPC METHOD NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Method returning the indexer's current tip height.
const METHOD_LATEST_HEIGHT: &str = "index_latestBlockHeight";

/// Method returning transactions filtered by package path and cursor.
const METHOD_LIST_TRANSACTIONS: &str = "index_listTransactions";

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON-RPC client for the transaction indexer.
///
/// # Example
///
/// ```ignore
/// use txindexer_rpc::{IndexerClient, TxFilter};
///
/// let client = IndexerClient::new("http://localhost:8546/rpc")?;
/// let tip = client.latest_height().await?;
/// let txs = client
///     .query_transactions(&TxFilter::new("gno.land/r/guilds/users", 0, 0, tip))
///     .await?;
/// ```
#[derive(Debug)]
pub struct IndexerClient {
    /// HTTP client for JSON-RPC requests.
    client: reqwest::Client,

    /// RPC endpoint URL.
    rpc_url: String,

    /// Request ID counter for JSON-RPC correlation.
    request_id: AtomicU64,

    /// Client configuration.
    config: ClientConfig,
}

impl IndexerClient {
    /// Create a new indexer client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        Self::with_config(rpc_url, ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn with_config(rpc_url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                IndexerRpcError::Connection(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
            config,
        })
    }

    /// Get the RPC URL this client is connected to.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the next request ID for JSON-RPC correlation.
    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // TIP QUERIES
    // ───────────────────────────────────────────────────────────────────────────

    /// Query the latest block height the indexer has ingested.
    ///
    /// This is a single attempt; see
    /// [`latest_height_with_retry`](Self::latest_height_with_retry) for the
    /// retrying variant.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, an RPC error response, or a
    /// malformed result.
    #[instrument(skip(self))]
    pub async fn latest_height(&self) -> Result<u64> {
        let request_id = self.next_request_id();
        let request = JsonRpcRequest::new(METHOD_LATEST_HEIGHT, (), request_id);

        let response: JsonRpcResponse<u64> = self.send_request(&request).await?;

        if let Some(error) = response.error {
            return Err(error.into_error());
        }

        response.result.ok_or_else(|| {
            IndexerRpcError::InvalidResponse("Missing result in latest-height response".into())
        })
    }

    /// [`latest_height`](Self::latest_height) with bounded retries.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerRpcError::Cancelled`] if `cancel` fires, or the
    /// last attempt's error once retries are exhausted.
    pub async fn latest_height_with_retry(&self, cancel: &CancellationToken) -> Result<u64> {
        self.retry(cancel, || self.latest_height()).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // TRANSACTION QUERIES
    // ───────────────────────────────────────────────────────────────────────────

    /// Query transactions matching `filter`.
    ///
    /// Returns transactions carrying at least one event from the filter's
    /// package path, strictly after `(from_block, from_tx_index)` and up to
    /// `to_block`, in ascending `(block_height, index)` order. The result
    /// is sorted client-side as well; downstream cursor advancement relies
    /// on ascending delivery.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, an RPC error response, or a
    /// malformed result.
    #[instrument(
        skip(self, filter),
        fields(
            package_path = %filter.package_path,
            from_block = filter.from_block,
            to_block = filter.to_block,
        )
    )]
    pub async fn query_transactions(&self, filter: &TxFilter) -> Result<Vec<IndexedTx>> {
        let request_id = self.next_request_id();
        let request = JsonRpcRequest::new(METHOD_LIST_TRANSACTIONS, [filter], request_id);

        let response: JsonRpcResponse<Vec<IndexedTx>> = self.send_request(&request).await?;

        if let Some(error) = response.error {
            return Err(error.into_error());
        }

        let mut txs = response.result.ok_or_else(|| {
            IndexerRpcError::InvalidResponse("Missing result in transaction-list response".into())
        })?;

        txs.sort_unstable_by_key(IndexedTx::ordering_key);

        debug!(count = txs.len(), "Fetched transactions");
        Ok(txs)
    }

    /// [`query_transactions`](Self::query_transactions) with bounded retries.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerRpcError::Cancelled`] if `cancel` fires, or the
    /// last attempt's error once retries are exhausted.
    pub async fn query_transactions_with_retry(
        &self,
        filter: &TxFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexedTx>> {
        self.retry(cancel, || self.query_transactions(filter)).await
    }

    // ───────────────────────────────────────────────────────────────────────────
    // INTERNAL HELPERS
    // ───────────────────────────────────────────────────────────────────────────

    /// Run `op` with exponential backoff on retryable errors.
    ///
    /// The delay starts at `retry_delay` and doubles per attempt. The
    /// cancellation token is honored both before each attempt and during
    /// the backoff sleep.
    async fn retry<T, F, Fut>(&self, cancel: &CancellationToken, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.config.retry_delay;
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(IndexerRpcError::Cancelled);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Indexer request failed, retrying"
                    );

                    tokio::select! {
                        () = cancel.cancelled() => return Err(IndexerRpcError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }

                    delay = delay.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Send a JSON-RPC request and parse the response.
    async fn send_request<P, R>(&self, request: &JsonRpcRequest<'_, P>) -> Result<JsonRpcResponse<R>>
    where
        P: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(request)
            .send()
            .await?;

        let body: JsonRpcResponse<R> = response.json().await?;
        Ok(body)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
    use std::time::Duration;

    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use super::*;

    fn tx_json(hash: &str, block: u64, index: u32) -> serde_json::Value {
        serde_json::json!({
            "hash": hash,
            "block_height": block,
            "index": index,
            "events": []
        })
    }

    #[tokio::test]
    async fn client_creation() {
        let client = IndexerClient::new("http://example.com/rpc").expect("client creation failed");
        assert_eq!(client.rpc_url(), "http://example.com/rpc");
    }

    #[tokio::test]
    async fn client_rejects_invalid_config() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(10));
        assert!(IndexerClient::with_config("http://example.com/rpc", config).is_err());
    }

    #[tokio::test]
    async fn latest_height_parses_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "method": "index_latestBlockHeight"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": 12345
            })))
            .mount(&mock_server)
            .await;

        let client = IndexerClient::new(mock_server.uri()).expect("client creation failed");
        let height = client.latest_height().await.expect("query failed");
        assert_eq!(height, 12345);
    }

    #[tokio::test]
    async fn latest_height_surfaces_rpc_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32601, "message": "Method not found"}
            })))
            .mount(&mock_server)
            .await;

        let client = IndexerClient::new(mock_server.uri()).expect("client creation failed");
        let result = client.latest_height().await;

        assert!(matches!(result, Err(IndexerRpcError::Rpc { code: -32601, .. })));
    }

    #[tokio::test]
    async fn query_transactions_sorts_ascending() {
        let mock_server = MockServer::start().await;

        // Deliberately out of order to exercise the client-side sort.
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "method": "index_listTransactions"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [
                    tx_json("c", 50, 0),
                    tx_json("a", 42, 3),
                    tx_json("b", 42, 7),
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = IndexerClient::new(mock_server.uri()).expect("client creation failed");
        let filter = TxFilter::new("gno.land/r/guilds/users", 0, 0, 100);
        let txs = client.query_transactions(&filter).await.expect("query failed");

        let keys: Vec<_> = txs.iter().map(IndexedTx::ordering_key).collect();
        assert_eq!(keys, vec![(42, 3), (42, 7), (50, 0)]);
    }

    #[tokio::test]
    async fn query_transactions_empty_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": []
            })))
            .mount(&mock_server)
            .await;

        let client = IndexerClient::new(mock_server.uri()).expect("client creation failed");
        let filter = TxFilter::new("gno.land/r/guilds/users", 42, 3, 42);
        let txs = client.query_transactions(&filter).await.expect("query failed");
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        // First two responses are 503s, the third succeeds.
        struct FlakyResponder {
            call_count: Arc<AtomicU32>,
        }

        impl Respond for FlakyResponder {
            fn respond(&self, _request: &Request) -> ResponseTemplate {
                let count = self.call_count.fetch_add(1, AtomicOrdering::SeqCst);
                if count < 2 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": 777
                    }))
                }
            }
        }

        let mock_server = MockServer::start().await;
        let call_count = Arc::new(AtomicU32::new(0));

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(FlakyResponder {
                call_count: call_count.clone(),
            })
            .mount(&mock_server)
            .await;

        let config = ClientConfig::default()
            .with_max_retries(3)
            .with_retry_delay(Duration::from_millis(10));
        let client =
            IndexerClient::with_config(mock_server.uri(), config).expect("client creation failed");

        let cancel = CancellationToken::new();
        let height = client
            .latest_height_with_retry(&cancel)
            .await
            .expect("retry should recover");

        assert_eq!(height, 777);
        assert_eq!(call_count.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_exhaustion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let config = ClientConfig::default()
            .with_max_retries(2)
            .with_retry_delay(Duration::from_millis(5));
        let client =
            IndexerClient::with_config(mock_server.uri(), config).expect("client creation failed");

        let cancel = CancellationToken::new();
        let result = client.latest_height_with_retry(&cancel).await;
        assert!(result.is_err());
        assert!(!matches!(result, Err(IndexerRpcError::Cancelled)));
    }

    #[tokio::test]
    async fn retry_honors_cancellation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let config = ClientConfig::default()
            .with_max_retries(10)
            .with_retry_delay(Duration::from_secs(30));
        let client =
            IndexerClient::with_config(mock_server.uri(), config).expect("client creation failed");

        let cancel = CancellationToken::new();
        let fut = client.latest_height_with_retry(&cancel);
        tokio::pin!(fut);

        // Let the first attempt fail, then cancel during the backoff sleep.
        tokio::select! {
            _ = &mut fut => panic!("should still be backing off"),
            () = tokio::time::sleep(Duration::from_millis(200)) => cancel.cancel(),
        }

        let result = fut.await;
        assert!(matches!(result, Err(IndexerRpcError::Cancelled)));
    }
}
