//! Durable presence tier map.
//!
//! The platform gateway reports presence changes as they happen; this
//! module folds them into the per-guild [`PresenceTiers`] map stored in
//! the high-priority verification query's scratch state. Persisting the
//! map keeps prioritization meaningful across restarts, when the
//! platform's own presence snapshots take a while to warm up.

use tracing::{debug, instrument};

use super::Reconciler;
use crate::error::Result;
use crate::ports::Presence;
use crate::store::update_config;
use crate::stream::queries::VERIFY_HIGH_PRIORITY;
use crate::types::PresenceTiers;
use crate::types::entities::SCRATCH_PRESENCE_TIERS;

impl Reconciler {
    /// Fold one presence change into the guild's tier map.
    ///
    /// The user is removed from all tiers, then re-inserted into `high`
    /// when the presence counts as active, `low` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the updated map cannot be persisted.
    #[instrument(skip(self), fields(guild_id, user_id, ?presence))]
    pub async fn handle_presence_update(
        &self,
        guild_id: &str,
        user_id: &str,
        presence: Presence,
    ) -> Result<()> {
        let active = presence.is_active();

        update_config(self.store().as_ref(), guild_id, |config| {
            let state = config.query_state_mut(VERIFY_HIGH_PRIORITY);
            let mut tiers: PresenceTiers =
                state.scratch(SCRATCH_PRESENCE_TIERS).unwrap_or_default();
            tiers.update(user_id, active);
            // PresenceTiers is plain vectors of strings; serialization
            // cannot fail
            let _ = state.set_scratch(SCRATCH_PRESENCE_TIERS, &tiers);
        })
        .await?;

        debug!(guild_id, user_id, active, "Updated presence tiers");
        Ok(())
    }
}
