//! Per-guild event-stream processor.
//!
//! One processor instance runs per guild. A single ticker drives
//! processing passes; each pass reconciles the stored query set, then
//! runs every enabled, due event-stream query:
//!
//! 1. Claim the query by persisting `is_executing = true` (the
//!    in-instance mutex; a lost write race skips the tick).
//! 2. Fetch the indexer tip. A tip below the stored cursor is a chain
//!    reset: the cursor drops to `(0, 0)` with a warning.
//! 3. Fetch transactions strictly after the cursor up to the tip and
//!    dispatch their events in ascending `(block, index)` order.
//! 4. After each fully-handled transaction, persist the advanced cursor
//!    immediately — a crash loses at most the in-flight transaction.
//! 5. On a handler error, stop the pass with the cursor still pointing
//!    at the last success.
//! 6. Record the run, schedule the next, clear `is_executing` — on every
//!    exit path.
//!
//! Delivery is therefore exactly-once per transaction across passes,
//! degrading to at-least-once only across a crash between a handler's
//! platform side effects and the cursor persist; handlers are idempotent
//! for exactly that reason.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use txindexer_rpc::{IndexedTx, IndexerClient, TxFilter};

use super::queries;
use super::router::EventRouter;
use crate::error::Result;
use crate::ports::{ConfigStore, Indexer};
use crate::store::{load_or_init, update_config};
use crate::types::events::EventMetadata;
use crate::types::{GuildConfig, QueryState, TxCursor, Versioned};

// ═══════════════════════════════════════════════════════════════════════════════
// STREAM CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables for one guild's event stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Ticker period driving processing passes.
    pub tick_interval: Duration,

    /// Interval between runs of each event-stream query.
    pub query_interval: Duration,

    /// Realm package path the user-link events originate from.
    pub user_events_package: String,

    /// Realm package path the role-link events originate from.
    pub role_events_package: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            query_interval: Duration::from_secs(5),
            user_events_package: "gno.land/r/guilds/users".into(),
            role_events_package: "gno.land/r/guilds/roles".into(),
        }
    }
}

impl StreamConfig {
    fn package_for(&self, query_id: &str) -> Option<&str> {
        match query_id {
            queries::USER_EVENTS => Some(&self.user_events_package),
            queries::ROLE_EVENTS => Some(&self.role_events_package),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// [`Indexer`] port implementation over the RPC client.
#[derive(Debug)]
pub struct IndexerAdapter {
    client: IndexerClient,
}

impl IndexerAdapter {
    /// Wrap an RPC client.
    #[must_use]
    pub const fn new(client: IndexerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Indexer for IndexerAdapter {
    async fn latest_height(&self, cancel: &CancellationToken) -> Result<u64> {
        Ok(self
            .client
            .latest_height_with_retry(cancel)
            .await
            .map_err(crate::error::InfraError::Indexer)?)
    }

    async fn transactions_after(
        &self,
        package_path: &str,
        cursor: TxCursor,
        to_block: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<IndexedTx>> {
        let filter = TxFilter::new(package_path, cursor.block, cursor.tx_index, to_block);
        Ok(self
            .client
            .query_transactions_with_retry(&filter, cancel)
            .await
            .map_err(crate::error::InfraError::Indexer)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT STREAM PROCESSOR
// ═══════════════════════════════════════════════════════════════════════════════

/// The per-guild event-stream loop.
pub struct EventStreamProcessor {
    guild_id: String,
    store: Arc<dyn ConfigStore>,
    indexer: Arc<dyn Indexer>,
    router: Arc<EventRouter>,
    config: StreamConfig,
}

impl std::fmt::Debug for EventStreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamProcessor")
            .field("guild_id", &self.guild_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventStreamProcessor {
    /// Create a processor for one guild.
    #[must_use]
    pub fn new(
        guild_id: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        indexer: Arc<dyn Indexer>,
        router: Arc<EventRouter>,
        config: StreamConfig,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            store,
            indexer,
            router,
            config,
        }
    }

    /// Run the ticker loop until cancellation.
    #[instrument(skip(self, cancel), fields(guild_id = %self.guild_id))]
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            tick = ?self.config.tick_interval,
            "Starting event-stream processor"
        );
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Event-stream processor stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_pass(&cancel).await {
                        warn!(error = %err, "Processing pass failed");
                    }
                }
            }
        }
    }

    /// Run one processing pass: reconcile the query set, then run every
    /// enabled, due event-stream query.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unusable; per-query failures
    /// are recorded on their query states instead.
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<()> {
        let versioned = load_or_init(self.store.as_ref(), &self.guild_id).await?;

        let mut probe = versioned.value.clone();
        if queries::reconcile_query_set(&mut probe) {
            update_config(self.store.as_ref(), &self.guild_id, |config| {
                queries::reconcile_query_set(config);
            })
            .await?;
        }

        for query_id in queries::CORE_STREAM_QUERIES {
            if cancel.is_cancelled() {
                break;
            }
            self.run_query(query_id, cancel).await?;
        }
        Ok(())
    }

    /// Run one query if it is enabled, due, and not already executing.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store is unusable; pass failures
    /// (indexer, handlers) are recorded on the query state.
    #[instrument(skip(self, cancel), fields(guild_id = %self.guild_id, query_id))]
    pub async fn run_query(&self, query_id: &str, cancel: &CancellationToken) -> Result<()> {
        let Some(mut versioned) = self.claim(query_id).await? else {
            return Ok(());
        };

        let pass = self.execute(&mut versioned, query_id, cancel).await;
        let pass_error = pass.err().map(|err| err.to_string());
        let final_cursor = cursor_of(&versioned.value, query_id);

        // Finalization runs on every exit path: record the run, schedule
        // the next, clear the execution flag. Cursor movement was already
        // persisted incrementally inside the pass.
        let interval = chrono::Duration::from_std(self.config.query_interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));

        update_config(self.store.as_ref(), &self.guild_id, |config| {
            let state = config.query_state_mut(query_id);
            let now = Utc::now();
            if let Some(message) = &pass_error {
                state.record_error(message.clone(), now);
            }
            state.record_run(now, interval);
            state.is_executing = false;
        })
        .await?;

        if let Some(message) = pass_error {
            warn!(query_id, error = %message, "Query pass failed");
        } else {
            self.update_global_tip(final_cursor.block).await;
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // INTERNALS
    // ───────────────────────────────────────────────────────────────────────────

    /// Claim the query by persisting `is_executing = true`.
    ///
    /// Returns `None` when the query is disabled, not yet due, already
    /// executing, or the claim write lost its race.
    async fn claim(&self, query_id: &str) -> Result<Option<Versioned<GuildConfig>>> {
        let mut versioned = load_or_init(self.store.as_ref(), &self.guild_id).await?;

        let now = Utc::now();
        let state = versioned.value.query_state_mut(query_id);
        if !state.enabled || state.is_executing || !state.due(now) {
            return Ok(None);
        }
        state.is_executing = true;
        versioned.value.touch();

        match self
            .store
            .set(&versioned.value, Some(&versioned.version))
            .await
        {
            Ok(version) => {
                versioned.version = version;
                Ok(Some(versioned))
            }
            Err(err) if err.is_conflict() => {
                debug!(query_id, "Lost claim race, skipping tick");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch and dispatch everything between the cursor and the tip.
    async fn execute(
        &self,
        versioned: &mut Versioned<GuildConfig>,
        query_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(package_path) = self.config.package_for(query_id) else {
            return Ok(());
        };
        let package_path = package_path.to_string();

        let tip = self.indexer.latest_height(cancel).await?;
        let mut cursor = cursor_of(&versioned.value, query_id);

        if tip < cursor.block {
            warn!(
                query_id,
                tip,
                cursor = %cursor,
                "Indexer tip regressed below cursor (chain reset), rewinding to genesis"
            );
            versioned.value.query_state_mut(query_id).reset_cursor();
            self.persist(versioned).await?;
            cursor = TxCursor::zero();
        }

        if cursor.block >= tip {
            return Ok(());
        }

        let txs = self
            .indexer
            .transactions_after(&package_path, cursor, tip, cancel)
            .await?;

        let mut handled = 0usize;
        for tx in &txs {
            if cancel.is_cancelled() {
                debug!(query_id, handled, "Pass cancelled mid-stream");
                return Ok(());
            }

            let tx_cursor = TxCursor::new(tx.block_height, tx.index);
            if tx_cursor <= cursor_of(&versioned.value, query_id) {
                continue;
            }

            let meta = EventMetadata {
                tx_hash: tx.hash.clone(),
                block: tx.block_height,
                tx_index: tx.index,
            };

            for event in &tx.events {
                // A handler error halts the pass here; the cursor still
                // points at the last fully-handled transaction.
                self.router.route(event, meta.clone()).await?;
            }

            versioned.value.query_state_mut(query_id).advance_cursor(tx_cursor);
            self.persist(versioned).await?;
            handled += 1;
        }

        if handled > 0 {
            info!(
                query_id,
                handled,
                cursor = %cursor_of(&versioned.value, query_id),
                "Advanced event stream"
            );
        }
        Ok(())
    }

    /// Conditionally persist the working copy and adopt the new version.
    async fn persist(&self, versioned: &mut Versioned<GuildConfig>) -> Result<()> {
        versioned.value.touch();
        let version = self
            .store
            .set(&versioned.value, Some(&versioned.version))
            .await?;
        versioned.version = version;
        Ok(())
    }

    /// Raise the global summary tip, best-effort.
    async fn update_global_tip(&self, block: u64) {
        let result = async {
            let current = self.store.get_global().await?;
            match current {
                Some(versioned) if versioned.value.last_processed_block >= block => Ok(()),
                Some(versioned) => {
                    let global = crate::types::GlobalConfig {
                        last_processed_block: block,
                    };
                    self.store
                        .set_global(&global, Some(&versioned.version))
                        .await
                        .map(|_| ())
                }
                None => {
                    let global = crate::types::GlobalConfig {
                        last_processed_block: block,
                    };
                    self.store.set_global(&global, None).await.map(|_| ())
                }
            }
        }
        .await;

        if let Err(err) = result {
            // Summary only; per-guild cursors are authoritative
            debug!(error = %err, "Global tip update skipped");
        }
    }
}

fn cursor_of(config: &GuildConfig, query_id: &str) -> TxCursor {
    config
        .query_states
        .get(query_id)
        .map_or_else(TxCursor::zero, QueryState::cursor)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::store::MemoryConfigStore;
    use crate::stream::router::EventHandler;
    use crate::types::events::{self, ChainEvent};
    use txindexer_rpc::{EventAttr, TxEvent};

    /// Scripted indexer fake.
    #[derive(Debug, Default)]
    struct FakeIndexer {
        tip: Mutex<u64>,
        txs: Mutex<Vec<IndexedTx>>,
    }

    impl FakeIndexer {
        fn set_tip(&self, tip: u64) {
            *self.tip.lock().unwrap() = tip;
        }

        fn push_tx(&self, tx: IndexedTx) {
            self.txs.lock().unwrap().push(tx);
        }
    }

    #[async_trait]
    impl Indexer for FakeIndexer {
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

    /// Handler recording delivery order; fails on a designated block.
    #[derive(Default)]
    struct RecordingHandler {
        delivered: Mutex<Vec<(u64, u32)>>,
        fail_at_block: Option<u64>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, _event: ChainEvent, meta: EventMetadata) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at_block == Some(meta.block) {
                return Err(crate::error::InfraError::Platform("handler down".into()).into());
            }
            self.delivered.lock().unwrap().push((meta.block, meta.tx_index));
            Ok(())
        }
    }

    fn user_linked_tx(block: u64, index: u32) -> IndexedTx {
        IndexedTx {
            hash: format!("tx-{block}-{index}"),
            block_height: block,
            index,
            events: vec![TxEvent {
                event_type: events::USER_LINKED.into(),
                pkg_path: "gno.land/r/guilds/users".into(),
                attrs: vec![
                    EventAttr::new("discord_id", "u1"),
                    EventAttr::new("address", "g1abc"),
                ],
            }],
        }
    }

    struct Harness {
        store: Arc<MemoryConfigStore>,
        indexer: Arc<FakeIndexer>,
        handler: Arc<RecordingHandler>,
        processor: EventStreamProcessor,
    }

    fn harness(handler: RecordingHandler) -> Harness {
        let store = Arc::new(MemoryConfigStore::new());
        let indexer = Arc::new(FakeIndexer::default());
        let handler = Arc::new(handler);

        let mut router = EventRouter::new();
        router.register(events::USER_LINKED, handler.clone());

        let processor = EventStreamProcessor::new(
            "G1",
            store.clone() as Arc<dyn ConfigStore>,
            indexer.clone() as Arc<dyn Indexer>,
            Arc::new(router),
            StreamConfig::default(),
        );

        Harness {
            store,
            indexer,
            handler,
            processor,
        }
    }

    async fn force_user_events_due(store: &MemoryConfigStore) {
        update_config(store, "G1", |config| {
            config.query_state_mut(queries::USER_EVENTS).next_run_timestamp = None;
        })
        .await
        .unwrap();
    }

    async fn stored_state(store: &MemoryConfigStore, query_id: &str) -> QueryState {
        store
            .get("G1")
            .await
            .unwrap()
            .expect("config should exist")
            .value
            .query_states
            .get(query_id)
            .expect("query state should exist")
            .clone()
    }

    #[tokio::test]
    async fn pass_creates_core_queries() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(0);

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();

        let config = h.store.get("G1").await.unwrap().unwrap().value;
        assert!(config.query_states.contains_key(queries::USER_EVENTS));
        assert!(config.query_states.contains_key(queries::ROLE_EVENTS));
    }

    #[tokio::test]
    async fn delivers_in_order_and_checkpoints() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(42, 7));
        h.indexer.push_tx(user_linked_tx(42, 3));
        h.indexer.push_tx(user_linked_tx(50, 0));

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();

        let delivered = h.handler.delivered.lock().unwrap().clone();
        assert_eq!(delivered, vec![(42, 3), (42, 7), (50, 0)]);

        let state = stored_state(&h.store, queries::USER_EVENTS).await;
        assert_eq!(state.cursor(), TxCursor::new(50, 0));
        assert!(!state.is_executing);
        assert!(state.last_run_timestamp.is_some());
        assert!(state.next_run_timestamp.is_some());
    }

    #[tokio::test]
    async fn second_pass_delivers_nothing_new() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(42, 3));

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1);

        force_user_events_due(&h.store).await;

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1, "exactly-once across passes");
    }

    #[tokio::test]
    async fn handler_failure_halts_without_advancing() {
        let h = harness(RecordingHandler {
            fail_at_block: Some(50),
            ..RecordingHandler::default()
        });
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(42, 3));
        h.indexer.push_tx(user_linked_tx(50, 0));
        h.indexer.push_tx(user_linked_tx(60, 1));

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();

        let state = stored_state(&h.store, queries::USER_EVENTS).await;
        // Cursor stops at the last success, before the failing block
        assert_eq!(state.cursor(), TxCursor::new(42, 3));
        assert!(!state.is_executing);
        assert_eq!(state.error_count, 1);
        assert!(state.last_error.is_some());

        // The tx after the failure was never attempted
        let delivered = h.handler.delivered.lock().unwrap().clone();
        assert_eq!(delivered, vec![(42, 3)]);
    }

    #[tokio::test]
    async fn chain_reset_rewinds_and_redelivers() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(10, 0));
        h.indexer.push_tx(user_linked_tx(20, 1));
        h.indexer.push_tx(user_linked_tx(42, 3));

        let cancel = CancellationToken::new();
        h.processor.run_pass(&cancel).await.unwrap();
        assert_eq!(
            stored_state(&h.store, queries::USER_EVENTS).await.cursor(),
            TxCursor::new(42, 3)
        );

        // The indexer tip drops below the stored cursor: chain reset.
        // The rewound pass re-delivers what the shortened chain holds.
        h.indexer.set_tip(30);
        force_user_events_due(&h.store).await;
        h.processor.run_pass(&cancel).await.unwrap();
        assert_eq!(
            stored_state(&h.store, queries::USER_EVENTS).await.cursor(),
            TxCursor::new(20, 1)
        );

        // As the chain grows back past the old height, the remainder
        // re-delivers too, still in (block, index) order
        h.indexer.set_tip(100);
        force_user_events_due(&h.store).await;
        h.processor.run_pass(&cancel).await.unwrap();

        let delivered = h.handler.delivered.lock().unwrap().clone();
        assert_eq!(
            delivered,
            vec![(10, 0), (20, 1), (42, 3), (10, 0), (20, 1), (42, 3)],
            "events after the reset point re-deliver in order"
        );
    }

    #[tokio::test]
    async fn executing_query_is_skipped() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(42, 3));

        // Simulate a concurrent run that holds the flag
        update_config(h.store.as_ref(), "G1", |config| {
            queries::reconcile_query_set(config);
            config.query_state_mut(queries::USER_EVENTS).is_executing = true;
        })
        .await
        .unwrap();

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tip_at_cursor_is_a_no_op() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(42);
        update_config(h.store.as_ref(), "G1", |config| {
            queries::reconcile_query_set(config);
            config
                .query_state_mut(queries::USER_EVENTS)
                .advance_cursor(TxCursor::new(42, 3));
        })
        .await
        .unwrap();

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            stored_state(&h.store, queries::USER_EVENTS).await.cursor(),
            TxCursor::new(42, 3)
        );
    }

    #[tokio::test]
    async fn global_tip_tracks_max_cursor() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);
        h.indexer.push_tx(user_linked_tx(42, 3));

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();

        let global = h.store.get_global().await.unwrap().expect("global should exist");
        assert_eq!(global.value.last_processed_block, 42);
    }

    #[tokio::test]
    async fn malformed_event_advances_cursor() {
        let h = harness(RecordingHandler::default());
        h.indexer.set_tip(100);

        // Transaction carrying a malformed UserLinked (no address)
        h.indexer.push_tx(IndexedTx {
            hash: "bad".into(),
            block_height: 42,
            index: 3,
            events: vec![TxEvent {
                event_type: events::USER_LINKED.into(),
                pkg_path: "gno.land/r/guilds/users".into(),
                attrs: vec![EventAttr::new("discord_id", "u1")],
            }],
        });

        h.processor.run_pass(&CancellationToken::new()).await.unwrap();

        let state = stored_state(&h.store, queries::USER_EVENTS).await;
        assert_eq!(state.cursor(), TxCursor::new(42, 3), "parse errors are permanent; skip past");
        assert_eq!(state.error_count, 0);
    }

    // ───────────────────────────────────────────────────────────────────────────
    // INDEXER ADAPTER
    // ───────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn adapter_maps_cursor_into_filter() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "method": "index_listTransactions",
                "params": [{
                    "package_path": "gno.land/r/guilds/users",
                    "from_block": 42,
                    "from_tx_index": 3,
                    "to_block": 100
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [{
                    "hash": "abc",
                    "block_height": 50,
                    "index": 0,
                    "events": []
                }]
            })))
            .mount(&mock_server)
            .await;

        let adapter =
            IndexerAdapter::new(IndexerClient::new(mock_server.uri()).expect("client creation"));

        let cancel = CancellationToken::new();
        let txs = adapter
            .transactions_after("gno.land/r/guilds/users", TxCursor::new(42, 3), 100, &cancel)
            .await
            .expect("query failed");

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].ordering_key(), (50, 0));
    }

    #[tokio::test]
    async fn adapter_reports_tip() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "method": "index_latestBlockHeight"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": 4242
            })))
            .mount(&mock_server)
            .await;

        let adapter =
            IndexerAdapter::new(IndexerClient::new(mock_server.uri()).expect("client creation"));

        let cancel = CancellationToken::new();
        let tip = adapter.latest_height(&cancel).await.expect("query failed");
        assert_eq!(tip, 4242);
    }
}
