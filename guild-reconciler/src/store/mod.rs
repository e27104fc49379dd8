//! Configuration persistence backends.
//!
//! - [`memory`] - In-memory backend for tests and single-process runs
//! - [`object`] - JSON-document backend over an abstract object store
//! - [`cache`] - TTL+LRU read-through cache wrapping any backend
//!
//! All backends implement the [`ConfigStore`](crate::ports::ConfigStore)
//! port: deep copies in both directions, version-tagged writes. The
//! helpers here wrap the port in the retry discipline every writer uses.

pub mod cache;
pub mod memory;
pub mod object;

pub use cache::CachedConfigStore;
pub use memory::MemoryConfigStore;
pub use object::{MemoryObjectStore, ObjectConfigStore};

use tracing::debug;

use crate::error::Result;
use crate::types::{GuildConfig, Versioned};

/// Attempts before a read-modify-write gives up on conflicts.
pub const MAX_CONFLICT_RETRIES: u32 = 5;

/// Load a guild's configuration, creating and persisting a default on
/// first observation.
///
/// # Errors
///
/// Returns an error if the store fails. Conflicts during default creation
/// resolve by re-reading the winner.
pub async fn load_or_init(
    store: &dyn crate::ports::ConfigStore,
    guild_id: &str,
) -> Result<Versioned<GuildConfig>> {
    if let Some(existing) = store.get(guild_id).await? {
        return Ok(existing);
    }

    debug!(guild_id, "First observation of guild, creating default config");
    let config = GuildConfig::new(guild_id);
    let version = store.set(&config, None).await?;
    Ok(Versioned::new(config, version))
}

/// Read-modify-write a guild's configuration with bounded conflict
/// retries.
///
/// `mutate` is applied to a fresh copy on every attempt, so it must be
/// safe to re-run. The document's `last_updated` stamp is refreshed on
/// each write.
///
/// # Errors
///
/// Returns the final conflict after [`MAX_CONFLICT_RETRIES`] losses, or
/// any non-conflict store error immediately.
pub async fn update_config<F>(
    store: &dyn crate::ports::ConfigStore,
    guild_id: &str,
    mut mutate: F,
) -> Result<GuildConfig>
where
    F: FnMut(&mut GuildConfig) + Send,
{
    let mut attempt = 0;
    loop {
        let mut versioned = load_or_init(store, guild_id).await?;
        mutate(&mut versioned.value);
        versioned.value.touch();

        match store.set(&versioned.value, Some(&versioned.version)).await {
            Ok(_) => return Ok(versioned.value),
            Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                attempt += 1;
                debug!(guild_id, attempt, "Config write conflicted, retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
