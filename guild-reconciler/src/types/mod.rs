//! Domain types for the reconciliation engine.
//!
//! - [`entities`] - Persisted configuration records (guild config, query
//!   states, global config) and the value types around them
//! - [`events`] - Typed chain events parsed from indexer attribute lists

pub mod entities;
pub mod events;

pub use entities::{
    GlobalConfig, GuildConfig, PresenceTiers, QueryState, RoleMapping, TxCursor, VersionTag,
    Versioned,
};
pub use events::{ChainEvent, EventMetadata, RoleEvent};
