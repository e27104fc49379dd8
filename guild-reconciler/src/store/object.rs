//! Object-store-backed configuration store.
//!
//! Serializes each config as one JSON document:
//!
//! | Record | Key |
//! |--------|-----|
//! | Guild config | `<prefix><guildID>.json` |
//! | Global config | `<prefix>global.json` |
//!
//! Concurrency uses the backend's conditional put (compare the version
//! tag, e.g. an ETag); "no such key" reads as absent, not as an error.
//! The wire protocol behind [`ObjectStore`] is an adapter concern — this
//! module also ships [`MemoryObjectStore`], the in-process reference
//! backend used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{InfraError, Result};
use crate::ports::{ConfigStore, ObjectStore};
use crate::types::{GlobalConfig, GuildConfig, VersionTag, Versioned};

/// Key suffix for every configuration document.
const DOC_SUFFIX: &str = ".json";

/// Key stem of the global configuration document.
const GLOBAL_STEM: &str = "global";

// ═══════════════════════════════════════════════════════════════════════════════
// OBJECT CONFIG STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// [`ConfigStore`] over an abstract [`ObjectStore`].
#[derive(Debug)]
pub struct ObjectConfigStore<S> {
    /// Backing document store.
    store: S,
    /// Key prefix, typically ending in `/`.
    prefix: String,
}

impl<S> ObjectConfigStore<S>
where
    S: ObjectStore,
{
    /// Create a store writing under `prefix`.
    #[must_use]
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// The document key for a guild.
    #[must_use]
    pub fn guild_key(&self, guild_id: &str) -> String {
        format!("{}{guild_id}{DOC_SUFFIX}", self.prefix)
    }

    /// The document key for the global record.
    #[must_use]
    pub fn global_key(&self) -> String {
        format!("{}{GLOBAL_STEM}{DOC_SUFFIX}", self.prefix)
    }

    async fn read_doc<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Versioned<T>>> {
        match self.store.get(key).await? {
            Some((body, version)) => {
                let value =
                    serde_json::from_slice(&body).map_err(InfraError::Serialization)?;
                Ok(Some(Versioned::new(value, version)))
            }
            None => Ok(None),
        }
    }

    async fn write_doc<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        let body = serde_json::to_vec(value).map_err(InfraError::Serialization)?;
        let version = self.store.put(key, &body, expected).await?;
        debug!(key, version = %version, "Wrote configuration document");
        Ok(version)
    }
}

#[async_trait]
impl<S> ConfigStore for ObjectConfigStore<S>
where
    S: ObjectStore,
{
    async fn get(&self, guild_id: &str) -> Result<Option<Versioned<GuildConfig>>> {
        self.read_doc(&self.guild_key(guild_id)).await
    }

    async fn set(
        &self,
        config: &GuildConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        self.write_doc(&self.guild_key(&config.guild_id), config, expected)
            .await
    }

    async fn delete(&self, guild_id: &str) -> Result<()> {
        self.store.delete(&self.guild_key(guild_id)).await
    }

    async fn get_global(&self) -> Result<Option<Versioned<GlobalConfig>>> {
        self.read_doc(&self.global_key()).await
    }

    async fn set_global(
        &self,
        global: &GlobalConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        self.write_doc(&self.global_key(), global, expected).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY OBJECT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process [`ObjectStore`] with conditional-put semantics.
///
/// The reference backend: tests run against it, and adapters for real
/// object stores must match its behavior (tag comparison on conditional
/// put, absent keys as `None`, idempotent delete).
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    /// Documents with their current version counter.
    objects: RwLock<HashMap<String, (Vec<u8>, u64)>>,

    /// Version counter shared by all documents.
    versions: AtomicU64,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List all stored keys (test helper).
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, VersionTag)>> {
        let objects = self.objects.read();
        Ok(objects
            .get(key)
            .map(|(body, version)| (body.clone(), VersionTag::new(version.to_string()))))
    }

    async fn put(
        &self,
        key: &str,
        body: &[u8],
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag> {
        let mut objects = self.objects.write();

        if let Some(expected) = expected {
            let current = objects.get(key).map(|(_, v)| v.to_string());
            if current.as_deref() != Some(expected.as_str()) {
                return Err(InfraError::ConcurrencyConflict(key.to_string()).into());
            }
        }

        let version = self.versions.fetch_add(1, Ordering::Relaxed) + 1;
        objects.insert(key.to_string(), (body.to_vec(), version));
        Ok(VersionTag::new(version.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
