//! Capability ports for the reconciliation engine.
//!
//! Each trait defines the contract for one external collaborator.
//! Infrastructure adapters implement these; the engine core depends only
//! on the capabilities, never on a concrete platform or backend. A second
//! chat platform is added by providing another [`GuildPlatform`]
//! implementation — no changes to the reconciler.
//!
//! | Port | Concern |
//! |------|---------|
//! | [`ConfigStore`] | Versioned guild/global configuration persistence |
//! | [`ObjectStore`] | Raw conditional-put document storage |
//! | [`LockManager`] | Best-effort cross-instance leases |
//! | [`Indexer`] | Chain tip and ordered transaction queries |
//! | [`GuildPlatform`] | Chat-platform roster and role mutation |
//! | [`RoleLink`] | Read-only view of on-chain link state |

mod indexer;
mod lock;
mod platform;
mod rolelink;
mod store;

pub use indexer::Indexer;
pub use lock::{LockHandle, LockManager};
pub use platform::{GuildPlatform, Member, Presence, Role};
pub use rolelink::RoleLink;
pub use store::{ConfigStore, ObjectStore};
