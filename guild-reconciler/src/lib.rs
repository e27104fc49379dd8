//! Guild Reconciler
//!
//! Keeps chat-guild membership continuously consistent with role
//! assertions recorded on chain: users prove ownership of an on-chain
//! address, governance realms declare named roles and their holders, and
//! this engine mirrors both facts into native guild roles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       RECONCILIATION ENGINE                     │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌────────────────────┐   │
//! │  │ Event Stream │──▶│    Event     │──▶│                    │   │
//! │  │  Processor   │   │    Router    │   │                    │   │
//! │  └──────────────┘   └──────────────┘   │     Reconciler     │   │
//! │  ┌──────────────┐                      │  (4-state + realm  │   │
//! │  │ Verification │─────────────────────▶│      role sync)    │   │
//! │  │  Scheduler   │                      └─────────┬──────────┘   │
//! │  └──────────────┘                                │              │
//! │         │              ┌─────────────────────────┼───────────┐  │
//! │         ▼              ▼                         ▼           ▼  │
//! │  ┌────────────┐  ┌────────────┐          ┌────────────┐  ┌────┐ │
//! │  │ConfigStore │  │  Indexer   │          │  Platform  │  │Lock│ │
//! │  │ (+ cache)  │  │   client   │          │   adapter  │  │mgr │ │
//! │  └────────────┘  └────────────┘          └────────────┘  └────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Domain types (configs, query states, chain events)
//! - [`error`] - Layered error types
//! - [`config`] - Settings loading and validation
//! - [`ports`] - Capability traits for every external collaborator
//! - [`store`] - Configuration persistence (memory, object store, cache)
//! - [`lock`] - Best-effort cross-instance leases
//! - [`stream`] - Event-stream processing with durable cursors
//! - [`scheduler`] - Tiered periodic member re-verification
//! - [`reconciler`] - The per-user reconciliation core
//! - [`engine`] - Per-guild task orchestration

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod ports;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod stream;
pub mod types;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}
