//! Event router: a handler registry keyed by event-type name.
//!
//! Handlers are values in a map. Adding a new event type means adding a
//! parser arm in [`ChainEvent`], a handler, and one `register` call —
//! no control-flow changes elsewhere.
//!
//! # Error handling
//!
//! Parse failures are a permanent property of the chain: they are
//! logged and reported as [`RouteOutcome::Skipped`] so the processor
//! advances past them. Handler failures propagate so the processor
//! halts without advancing the cursor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use txindexer_rpc::TxEvent;

use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::types::events::{self, ChainEvent, EventMetadata};

// ═══════════════════════════════════════════════════════════════════════════════
// HANDLER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A registered event handler.
///
/// Handlers MUST be idempotent: delivery is at-least-once across
/// restarts.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one parsed event.
    ///
    /// # Errors
    ///
    /// A returned error halts the current processor pass; the cursor
    /// stays before the event's transaction and the pass retries later.
    async fn handle(&self, event: ChainEvent, meta: EventMetadata) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// What the router did with a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A handler processed the event.
    Handled,
    /// Unknown type, unregistered type, or malformed attributes; the
    /// processor advances past it.
    Skipped,
}

/// Routes parsed chain events to registered handlers.
pub struct EventRouter {
    handlers: HashMap<&'static str, Arc<dyn EventHandler>>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("registered", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create a router wired to the reconciler for one managing guild.
    ///
    /// Registers all four link events. Role events carry their target
    /// guild in the payload; the handlers ignore events for other
    /// guilds.
    #[must_use]
    pub fn for_guild(guild_id: impl Into<String>, reconciler: Arc<Reconciler>) -> Self {
        let guild_id = guild_id.into();
        let mut router = Self::new();

        router.register(
            events::USER_LINKED,
            Arc::new(UserEventHandler {
                reconciler: Arc::clone(&reconciler),
            }),
        );
        router.register(
            events::USER_UNLINKED,
            Arc::new(UserEventHandler {
                reconciler: Arc::clone(&reconciler),
            }),
        );
        router.register(
            events::ROLE_LINKED,
            Arc::new(RoleEventHandler {
                guild_id: guild_id.clone(),
                reconciler: Arc::clone(&reconciler),
            }),
        );
        router.register(
            events::ROLE_UNLINKED,
            Arc::new(RoleEventHandler {
                guild_id,
                reconciler,
            }),
        );

        router
    }

    /// Register a handler for an event-type name, replacing any previous
    /// registration.
    pub fn register(&mut self, event_type: &'static str, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(event_type, handler);
    }

    /// Whether a handler is registered for the type.
    #[must_use]
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Parse and dispatch one raw indexer event.
    ///
    /// # Errors
    ///
    /// Propagates handler errors only; parse failures and unknown types
    /// come back as [`RouteOutcome::Skipped`].
    pub async fn route(&self, raw: &TxEvent, meta: EventMetadata) -> Result<RouteOutcome> {
        let event = match ChainEvent::parse(raw) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(event_type = %raw.event_type, "Unhandled event type");
                return Ok(RouteOutcome::Skipped);
            }
            Err(err) => {
                // Malformed events are permanent chain state; skip them
                warn!(
                    event_type = %raw.event_type,
                    block = meta.block,
                    tx_index = meta.tx_index,
                    error = %err,
                    "Skipping malformed event"
                );
                return Ok(RouteOutcome::Skipped);
            }
        };

        let Some(handler) = self.handlers.get(event.event_type()) else {
            debug!(event_type = %event.event_type(), "No handler registered");
            return Ok(RouteOutcome::Skipped);
        };

        handler.handle(event, meta).await?;
        Ok(RouteOutcome::Handled)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECONCILER-BACKED HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Handles `UserLinked` and `UserUnlinked`.
struct UserEventHandler {
    reconciler: Arc<Reconciler>,
}

#[async_trait]
impl EventHandler for UserEventHandler {
    async fn handle(&self, event: ChainEvent, _meta: EventMetadata) -> Result<()> {
        match event {
            ChainEvent::UserLinked {
                discord_id,
                address,
            } => {
                self.reconciler
                    .handle_user_linked(&discord_id, &address)
                    .await?;
            }
            ChainEvent::UserUnlinked {
                discord_id,
                address,
                triggered_by,
            } => {
                self.reconciler
                    .handle_user_unlinked(&discord_id, &address, &triggered_by)
                    .await?;
            }
            ChainEvent::RoleLinked(_) | ChainEvent::RoleUnlinked(_) => {}
        }
        Ok(())
    }
}

/// Handles `RoleLinked` and `RoleUnlinked` for one managing guild.
struct RoleEventHandler {
    guild_id: String,
    reconciler: Arc<Reconciler>,
}

#[async_trait]
impl EventHandler for RoleEventHandler {
    async fn handle(&self, event: ChainEvent, _meta: EventMetadata) -> Result<()> {
        match event {
            ChainEvent::RoleLinked(role_event) => {
                self.reconciler
                    .handle_role_linked(&self.guild_id, &role_event)
                    .await?;
            }
            ChainEvent::RoleUnlinked(role_event) => {
                self.reconciler
                    .handle_role_unlinked(&self.guild_id, &role_event)
                    .await?;
            }
            ChainEvent::UserLinked { .. } | ChainEvent::UserUnlinked { .. } => {}
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
