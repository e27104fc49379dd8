//! Layered error types for the reconciliation engine.
//!
//! - [`DomainError`] - Business-rule violations (malformed events, bad
//!   role-name conventions)
//! - [`InfraError`] - Infrastructure errors (store, indexer, platform)
//! - [`AppError`] - Application-level errors combining domain and infra
//!
//! # Error Philosophy
//!
//! - Concurrency conflicts and not-found are ordinary control flow for the
//!   versioned store: callers retry or create defaults.
//! - Per-role and per-user failures inside a verification pass are
//!   absorbed and counted on the query state, never propagated.
//! - Event-stream handler failures DO propagate so the cursor does not
//!   advance past unprocessed work.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain-level errors representing business-rule violations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DomainError {
    /// A chain event was missing a required attribute or carried a
    /// malformed value. The offending event is skipped; the cursor still
    /// advances past its transaction (the event is a permanent property
    /// of the chain).
    #[error("malformed {event_type} event: {reason}")]
    EventParse {
        /// The event type name as reported by the indexer.
        event_type: String,
        /// What was wrong with it.
        reason: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infrastructure-level errors from external systems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// A versioned write lost the race: the stored version tag no longer
    /// matches the one the caller read. Retry the read-modify-write.
    #[error("concurrent modification detected for {0}")]
    ConcurrencyConflict(String),

    /// The requested record does not exist in the store.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Store backend error (object store, serialization at the boundary).
    #[error("store error: {0}")]
    Store(String),

    /// Transaction-indexer error.
    #[error("indexer error: {0}")]
    Indexer(#[from] txindexer_rpc::IndexerRpcError),

    /// Chat-platform adapter error.
    #[error("platform error: {0}")]
    Platform(String),

    /// Role-link view error.
    #[error("role-link error: {0}")]
    RoleLink(String),

    /// Failed to acquire or release a cross-instance lease.
    #[error("lock error: {0}")]
    Lock(String),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout waiting for an operation.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl InfraError {
    /// Check whether this error is a concurrency conflict.
    ///
    /// Conflicts are retryable by re-reading and re-applying the change.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Check whether this error is a not-found.
    ///
    /// Callers treat not-found as "create a new default".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPLICATION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Application-level errors combining domain and infrastructure errors.
///
/// This is the primary error type used throughout the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure error.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Configuration error at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Initialization error.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// Graceful shutdown requested.
    #[error("shutdown requested")]
    ShutdownRequested,
}

impl AppError {
    /// Check whether this error is a store concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Infra(infra) if infra.is_conflict())
    }
}

/// Type alias for application Results.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
