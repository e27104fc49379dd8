//! Event-stream processing.
//!
//! - [`queries`] - Query-id definitions and enabled-set reconciliation
//! - [`router`] - Handler registry dispatching parsed chain events
//! - [`processor`] - Per-guild ticker loop with incremental cursor
//!   checkpointing

pub mod processor;
pub mod queries;
pub mod router;

pub use processor::{EventStreamProcessor, IndexerAdapter, StreamConfig};
pub use router::{EventHandler, EventRouter, RouteOutcome};
