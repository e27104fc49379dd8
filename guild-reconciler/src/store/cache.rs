//! Read-through cache for guild configurations.
//!
//! Wraps any [`ConfigStore`] backend with a TTL+LRU layer:
//!
//! - **Read-through**: misses fall through to the backend and populate
//!   the cache.
//! - **Write-through**: successful `set`s replace the cached entry with
//!   the just-written value and its fresh version tag.
//! - **Conflict-transparent**: a `ConcurrencyConflict` from the backend
//!   is never masked; the stale entry is dropped so the caller's retry
//!   re-reads the winner.
//!
//! The global record is deliberately not cached; it is a diagnostic
//! singleton read far less often than guild configs.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache as MokaCache;
use tracing::debug;

use crate::error::Result;
use crate::ports::ConfigStore;
use crate::types::{GlobalConfig, GuildConfig, VersionTag, Versioned};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default guild-config TTL.
const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Default max cached guilds.
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHED CONFIG STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// TTL+LRU caching layer over a [`ConfigStore`] backend.
pub struct CachedConfigStore<S> {
    /// Backing store.
    inner: S,

    /// Guild-config cache keyed by guild id.
    cache: MokaCache<String, Versioned<GuildConfig>>,
}

impl<S> std::fmt::Debug for CachedConfigStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedConfigStore")
            .field("inner", &std::any::type_name::<S>())
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl<S> CachedConfigStore<S>
where
    S: ConfigStore,
{
    /// Wrap a backend with default TTL and capacity.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL, DEFAULT_MAX_CAPACITY)
    }

    /// Wrap a backend with explicit TTL and capacity.
    #[must_use]
    pub fn with_ttl(inner: S, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: MokaCache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop a guild's cached entry. External invalidation hook for
    /// writers that bypass this layer.
    pub fn invalidate(&self, guild_id: &str) {
        self.cache.invalidate(guild_id);
        debug!(guild_id, "Invalidated cached guild config");
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Access the wrapped backend.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S> ConfigStore for CachedConfigStore<S>
where
    S: ConfigStore,
{
    async fn get(&self, guild_id: &str) -> Result<Option<Versioned<GuildConfig>>> {
        if let Some(cached) = self.cache.get(guild_id) {
            return Ok(Some(cached));
        }

        let loaded = self.inner.get(guild_id).await?;
        if let Some(versioned) = &loaded {
            self.cache.insert(guild_id.to_string(), versioned.clone());
        }
        Ok(loaded)
    }

    async fn set(
        &self,
        config: &GuildConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        match self.inner.set(config, expected).await {
            Ok(version) => {
                self.cache.insert(
                    config.guild_id.clone(),
                    Versioned::new(config.clone(), version.clone()),
                );
                Ok(version)
            }
            Err(err) => {
                // On any write failure (conflicts included) the cached
                // entry may be stale; drop it so the retry re-reads.
                self.cache.invalidate(&config.guild_id);
                Err(err)
            }
        }
    }

    async fn delete(&self, guild_id: &str) -> Result<()> {
        self.inner.delete(guild_id).await?;
        self.cache.invalidate(guild_id);
        Ok(())
    }

    async fn get_global(&self) -> Result<Option<Versioned<GlobalConfig>>> {
        self.inner.get_global().await
    }

    async fn set_global(
        &self,
        global: &GlobalConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        self.inner.set_global(global, expected).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
