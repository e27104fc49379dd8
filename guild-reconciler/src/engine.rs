//! Engine orchestration.
//!
//! [`GuildEngine`] owns one event-stream processor and one verification
//! scheduler per guild, spawned as worker tasks on the shared runtime.
//! Stopping a guild cancels its pair and waits for both tasks; shutting
//! down cancels everything.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          GuildEngine                             │
//! │                                                                  │
//! │   guild G1 ──┬─ EventStreamProcessor ──┐                         │
//! │              └─ VerificationScheduler ─┤── Reconciler ── ports   │
//! │   guild G2 ──┬─ EventStreamProcessor ──┤                         │
//! │              └─ VerificationScheduler ─┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ports::{ConfigStore, GuildPlatform, Indexer, LockManager, RoleLink};
use crate::reconciler::Reconciler;
use crate::scheduler::{SchedulerConfig, VerificationScheduler};
use crate::stream::{EventRouter, EventStreamProcessor, StreamConfig};

// ═══════════════════════════════════════════════════════════════════════════════
// GUILD ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Worker tasks of one managed guild.
struct GuildTasks {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Per-guild processor/scheduler orchestration.
pub struct GuildEngine {
    store: Arc<dyn ConfigStore>,
    indexer: Arc<dyn Indexer>,
    reconciler: Arc<Reconciler>,
    stream_config: StreamConfig,
    scheduler_config: SchedulerConfig,
    guilds: Mutex<HashMap<String, GuildTasks>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for GuildEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildEngine")
            .field("guilds", &self.guilds.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GuildEngine {
    /// Create an engine over the given ports.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        indexer: Arc<dyn Indexer>,
        platform: Arc<dyn GuildPlatform>,
        rolelink: Arc<dyn RoleLink>,
        locks: Arc<dyn LockManager>,
        stream_config: StreamConfig,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            platform,
            rolelink,
            locks,
        ));

        Self {
            store,
            indexer,
            reconciler,
            stream_config,
            scheduler_config,
            guilds: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// The shared reconciler, for wiring gateway callbacks (presence
    /// updates) into the engine.
    #[must_use]
    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::clone(&self.reconciler)
    }

    /// Guild ids currently managed.
    #[must_use]
    pub fn managed_guilds(&self) -> Vec<String> {
        self.guilds.lock().keys().cloned().collect()
    }

    /// Start the processor/scheduler pair for a guild. Starting an
    /// already-managed guild is a no-op.
    #[instrument(skip(self), fields(guild_id))]
    pub fn start_guild(&self, guild_id: &str) {
        let mut guilds = self.guilds.lock();
        if guilds.contains_key(guild_id) {
            debug!(guild_id, "Guild already managed");
            return;
        }

        let cancel = self.shutdown.child_token();

        let processor = EventStreamProcessor::new(
            guild_id,
            Arc::clone(&self.store),
            Arc::clone(&self.indexer),
            Arc::new(EventRouter::for_guild(guild_id, self.reconciler())),
            self.stream_config.clone(),
        );
        let processor_cancel = cancel.clone();
        let processor_handle = tokio::spawn(async move {
            processor.run(processor_cancel).await;
        });

        let scheduler = VerificationScheduler::new(
            guild_id,
            Arc::clone(&self.store),
            self.reconciler(),
            self.scheduler_config.clone(),
        );
        let scheduler_cancel = cancel.clone();
        let scheduler_handle = tokio::spawn(async move {
            scheduler.run(scheduler_cancel).await;
        });

        guilds.insert(
            guild_id.to_string(),
            GuildTasks {
                cancel,
                handles: vec![processor_handle, scheduler_handle],
            },
        );
        info!(guild_id, "Guild started");
    }

    /// Stop one guild's tasks and wait for them to exit.
    #[instrument(skip(self), fields(guild_id))]
    pub async fn stop_guild(&self, guild_id: &str) {
        let Some(tasks) = self.guilds.lock().remove(guild_id) else {
            debug!(guild_id, "Guild not managed");
            return;
        };

        tasks.cancel.cancel();
        for handle in tasks.handles {
            if let Err(err) = handle.await {
                warn!(guild_id, error = %err, "Guild task panicked");
            }
        }
        info!(guild_id, "Guild stopped");
    }

    /// Cancel every guild's tasks and wait for all of them.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let drained: Vec<(String, GuildTasks)> = self.guilds.lock().drain().collect();
        for (guild_id, tasks) in drained {
            for handle in tasks.handles {
                if let Err(err) = handle.await {
                    warn!(guild_id = %guild_id, error = %err, "Guild task panicked");
                }
            }
        }
        info!("Engine shut down");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
