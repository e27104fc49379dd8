//! Tiered verification scheduler.
//!
//! Per guild, three independent periodic tasks drive member
//! re-verification:
//!
//! | Task | Default period | Selection |
//! |------|----------------|-----------|
//! | `verify_high_priority` | 1 minute | members with active presence |
//! | `verify_medium_priority` | 5 minutes | inactive members, bounded batch |
//! | `verify_low_priority` | 30 minutes | paged sweep, 10 users per pass |
//!
//! Each task runs at most once at a time per instance, guarded by its
//! query state's `is_executing` flag with the same persist-first claim
//! as the event-stream processor. Task errors are recorded and the next
//! run still scheduled, so a failing tier never monopolizes the loop.
//!
//! Verification tasks may interleave with event processing for the same
//! guild: they touch disjoint query-state rows and every role mutation
//! is idempotent, so the worst case is transient disagreement that the
//! next pass repairs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::ports::ConfigStore;
use crate::reconciler::{Reconciler, VerifyPriority};
use crate::store::{load_or_init, update_config};
use crate::stream::queries;

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULER CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables for one guild's verification tiers.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period of the high-priority tier.
    pub high_interval: Duration,

    /// Period of the medium-priority tier.
    pub medium_interval: Duration,

    /// Period of the low-priority tier.
    pub low_interval: Duration,

    /// Members per medium-priority pass.
    pub medium_batch: usize,

    /// Members per low-priority page.
    pub low_page_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            high_interval: Duration::from_secs(60),
            medium_interval: Duration::from_secs(300),
            low_interval: Duration::from_secs(1800),
            medium_batch: 10,
            low_page_size: 10,
        }
    }
}

impl SchedulerConfig {
    const fn interval(&self, priority: VerifyPriority) -> Duration {
        match priority {
            VerifyPriority::High => self.high_interval,
            VerifyPriority::Medium => self.medium_interval,
            VerifyPriority::Low => self.low_interval,
        }
    }

    const fn batch(&self, priority: VerifyPriority) -> usize {
        match priority {
            // The high tier verifies every active member
            VerifyPriority::High => usize::MAX,
            VerifyPriority::Medium => self.medium_batch,
            VerifyPriority::Low => self.low_page_size,
        }
    }
}

const fn query_id(priority: VerifyPriority) -> &'static str {
    match priority {
        VerifyPriority::High => queries::VERIFY_HIGH_PRIORITY,
        VerifyPriority::Medium => queries::VERIFY_MEDIUM_PRIORITY,
        VerifyPriority::Low => queries::VERIFY_LOW_PRIORITY,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFICATION SCHEDULER
// ═══════════════════════════════════════════════════════════════════════════════

/// The per-guild verification loop.
pub struct VerificationScheduler {
    guild_id: String,
    store: Arc<dyn ConfigStore>,
    reconciler: Arc<Reconciler>,
    config: SchedulerConfig,
}

impl std::fmt::Debug for VerificationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationScheduler")
            .field("guild_id", &self.guild_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VerificationScheduler {
    /// Create a scheduler for one guild.
    #[must_use]
    pub fn new(
        guild_id: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        reconciler: Arc<Reconciler>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            store,
            reconciler,
            config,
        }
    }

    /// Run all three tier timers until cancellation.
    #[instrument(skip(self, cancel), fields(guild_id = %self.guild_id))]
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            high = ?self.config.high_interval,
            medium = ?self.config.medium_interval,
            low = ?self.config.low_interval,
            "Starting verification scheduler"
        );

        let mut high = tokio::time::interval(self.config.high_interval);
        let mut medium = tokio::time::interval(self.config.medium_interval);
        let mut low = tokio::time::interval(self.config.low_interval);
        for ticker in [&mut high, &mut medium, &mut low] {
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        }

        loop {
            let priority = tokio::select! {
                () = cancel.cancelled() => {
                    info!("Verification scheduler stopping");
                    return;
                }
                _ = high.tick() => VerifyPriority::High,
                _ = medium.tick() => VerifyPriority::Medium,
                _ = low.tick() => VerifyPriority::Low,
            };

            if let Err(err) = self.run_tier(priority, &cancel).await {
                warn!(?priority, error = %err, "Verification tier failed");
            }
        }
    }

    /// Run one tier once, if it is enabled, due, and not executing.
    ///
    /// Returns the number of members processed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store is unusable; verification
    /// failures are recorded on the tier's query state.
    #[instrument(skip(self, cancel), fields(guild_id = %self.guild_id, ?priority))]
    pub async fn run_tier(
        &self,
        priority: VerifyPriority,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let query_id = query_id(priority);

        let Some(mut state) = self.claim(query_id).await? else {
            return Ok(0);
        };

        let outcome = self
            .reconciler
            .process_tiered_verification(
                &self.guild_id,
                &mut state,
                priority,
                self.config.batch(priority),
                cancel,
            )
            .await;

        let (processed, run_error) = match outcome {
            Ok(count) => (count, None),
            Err(err) => (0, Some(err.to_string())),
        };

        // Recorded-and-rescheduled: the flag clears and next_run advances
        // whether the pass worked or not.
        let interval = chrono::Duration::from_std(self.config.interval(priority))
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        update_config(self.store.as_ref(), &self.guild_id, |config| {
            let stored = config.query_state_mut(query_id);
            // Write back only what the pass owns: the paging cursor.
            // Presence tiers in the same scratch map may have advanced
            // concurrently and must not be rolled back to claim time.
            if let Some(index) = state.state.get(crate::types::entities::SCRATCH_LAST_USER_INDEX) {
                stored.state.insert(
                    crate::types::entities::SCRATCH_LAST_USER_INDEX.to_string(),
                    index.clone(),
                );
            }
            stored.error_count = state.error_count;
            stored.last_error = state.last_error.clone();
            stored.last_error_time = state.last_error_time;

            let now = Utc::now();
            if let Some(message) = &run_error {
                stored.record_error(message.clone(), now);
            }
            stored.record_run(now, interval);
            stored.is_executing = false;
        })
        .await?;

        if let Some(message) = run_error {
            warn!(query_id, error = %message, "Tier pass failed");
        } else {
            debug!(query_id, processed, "Tier pass complete");
        }
        Ok(processed)
    }

    /// Claim the tier's query state by persisting `is_executing = true`.
    async fn claim(&self, query_id: &str) -> Result<Option<crate::types::QueryState>> {
        let mut versioned = load_or_init(self.store.as_ref(), &self.guild_id).await?;

        let now = Utc::now();
        let state = versioned.value.query_state_mut(query_id);
        if !state.enabled || state.is_executing || !state.due(now) {
            return Ok(None);
        }
        state.is_executing = true;
        let claimed = state.clone();
        versioned.value.touch();

        match self
            .store
            .set(&versioned.value, Some(&versioned.version))
            .await
        {
            Ok(_) => Ok(Some(claimed)),
            Err(err) if err.is_conflict() => {
                debug!(query_id, "Lost claim race, skipping tick");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
