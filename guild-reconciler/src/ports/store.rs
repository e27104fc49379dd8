//! Persistence ports for configuration documents.
//!
//! [`ConfigStore`] is the typed contract the engine programs against.
//! [`ObjectStore`] is the raw document contract the object-backed store
//! builds on; its wire protocol (S3, GCS, a filesystem) is an adapter
//! concern.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GlobalConfig, GuildConfig, VersionTag, Versioned};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for versioned guild/global configuration persistence.
///
/// # Copy semantics
///
/// Every returned value is a deep, independent copy: mutations by the
/// caller never affect subsequent reads, and writes take effect only
/// through [`set`](Self::set)/[`set_global`](Self::set_global).
///
/// # Optimistic concurrency
///
/// `set` may carry the version tag obtained from the prior `get`; when the
/// backend detects a mismatch it fails with
/// [`InfraError::ConcurrencyConflict`](crate::error::InfraError), which
/// callers treat as retryable. Passing `None` writes unconditionally.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load a guild's configuration.
    ///
    /// Returns `None` when the guild has no stored configuration yet;
    /// callers create a default in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get(&self, guild_id: &str) -> Result<Option<Versioned<GuildConfig>>>;

    /// Store a guild's configuration.
    ///
    /// Returns the new version tag.
    ///
    /// # Errors
    ///
    /// Returns a concurrency conflict when `expected` no longer matches,
    /// or a backend error.
    async fn set(
        &self,
        config: &GuildConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag>;

    /// Delete a guild's configuration. Deleting an absent guild is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn delete(&self, guild_id: &str) -> Result<()>;

    /// Load the global configuration, `None` when never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_global(&self) -> Result<Option<Versioned<GlobalConfig>>>;

    /// Store the global configuration.
    ///
    /// # Errors
    ///
    /// Returns a concurrency conflict when `expected` no longer matches,
    /// or a backend error.
    async fn set_global(
        &self,
        global: &GlobalConfig,
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// OBJECT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for raw versioned document storage.
///
/// One JSON document per key; the version tag rides the transport (e.g.
/// an ETag header), never the body. "No such key" is represented as
/// `None`, not an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a document and its current version tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, VersionTag)>>;

    /// Write a document, conditionally when `expected` is given.
    ///
    /// Returns the new version tag.
    ///
    /// # Errors
    ///
    /// Returns a concurrency conflict when `expected` no longer matches
    /// the stored tag, or a backend error.
    async fn put(
        &self,
        key: &str,
        body: &[u8],
        expected: Option<&VersionTag>,
    ) -> Result<VersionTag>;

    /// Delete a document. Deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn delete(&self, key: &str) -> Result<()>;
}
