//! In-memory configuration store.
//!
//! The testing backend, also usable for single-process deployments that
//! accept losing state on restart. Version tags are monotonic counters;
//! optimistic concurrency behaves exactly like the object-store backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{InfraError, Result};
use crate::ports::ConfigStore;
use crate::types::{GlobalConfig, GuildConfig, VersionTag, Versioned};

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY CONFIG STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory [`ConfigStore`] backend.
///
/// Values are cloned on the way in and out, so callers can never alias
/// the stored copies.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    /// Guild configs with their current version counter.
    guilds: RwLock<HashMap<String, (GuildConfig, u64)>>,

    /// Global config with its current version counter.
    global: RwLock<Option<(GlobalConfig, u64)>>,

    /// Version counter shared by all records.
    versions: AtomicU64,
}

impl MemoryConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored guild configs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guilds.read().len()
    }

    /// Whether the store holds no guild configs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guilds.read().is_empty()
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed) + 1
    }
}

fn tag(version: u64) -> VersionTag {
    VersionTag::new(version.to_string())
}

fn check_expected(stored: u64, expected: Option<&VersionTag>, what: &str) -> Result<()> {
    if let Some(expected) = expected {
        if expected.as_str() != stored.to_string() {
            return Err(InfraError::ConcurrencyConflict(what.to_string()).into());
        }
    }
    Ok(())
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, guild_id: &str) -> Result<Option<Versioned<GuildConfig>>> {
        let guilds = self.guilds.read();
        Ok(guilds
            .get(guild_id)
            .map(|(config, version)| Versioned::new(config.clone(), tag(*version))))
    }

    async fn set(
        &self,
        config: &GuildConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        let mut guilds = self.guilds.write();

        match guilds.get(&config.guild_id) {
            Some((_, stored)) => {
                check_expected(*stored, expected, &format!("guild {}", config.guild_id))?;
            }
            None => {
                // A conditional write against a record that no longer
                // exists also lost its race.
                if expected.is_some() {
                    return Err(
                        InfraError::ConcurrencyConflict(format!("guild {}", config.guild_id))
                            .into(),
                    );
                }
            }
        }

        let version = self.next_version();
        guilds.insert(config.guild_id.clone(), (config.clone(), version));
        Ok(tag(version))
    }

    async fn delete(&self, guild_id: &str) -> Result<()> {
        self.guilds.write().remove(guild_id);
        Ok(())
    }

    async fn get_global(&self) -> Result<Option<Versioned<GlobalConfig>>> {
        let global = self.global.read();
        Ok(global
            .as_ref()
            .map(|(config, version)| Versioned::new(config.clone(), tag(*version))))
    }

    async fn set_global(
        &self,
        global: &GlobalConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        let mut stored = self.global.write();

        match stored.as_ref() {
            Some((_, version)) => check_expected(*version, expected, "global")?,
            None => {
                if expected.is_some() {
                    return Err(InfraError::ConcurrencyConflict("global".into()).into());
                }
            }
        }

        let version = self.next_version();
        *stored = Some((global.clone(), version));
        Ok(tag(version))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
