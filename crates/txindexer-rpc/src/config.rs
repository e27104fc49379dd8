//! Configuration for the indexer RPC client.
//!
//! [`ClientConfig`] controls request timeouts and the retry policy used by
//! the `*_with_retry` client methods.
//!
//! # Example
//!
//! ```
//! use txindexer_rpc::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::default()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_max_retries(5);
//! ```

use std::time::Duration;

use crate::error::{IndexerRpcError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default timeout for HTTP requests to the indexer endpoint.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum retry attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay between retries (doubled each attempt).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Minimum allowed timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum allowed timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum allowed retry attempts.
pub const MAX_RETRIES_LIMIT: u32 = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration options for [`IndexerClient`](crate::IndexerClient).
///
/// Use the builder pattern to customize settings:
///
/// ```
/// use txindexer_rpc::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_max_retries(5)
///     .with_retry_delay(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout for HTTP calls.
    ///
    /// Default: 30 seconds. Range: 1-300 seconds.
    pub timeout: Duration,

    /// Maximum retry attempts for transient failures in the
    /// `*_with_retry` methods. `0` disables retries.
    ///
    /// Default: 3. Maximum: 20.
    pub max_retries: u32,

    /// Base delay before the first retry; doubled after each failed
    /// attempt (exponential backoff).
    ///
    /// Default: 500 ms.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ClientConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerRpcError::InvalidConfig`] if any value is outside
    /// its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.timeout < MIN_TIMEOUT || self.timeout > MAX_TIMEOUT {
            return Err(IndexerRpcError::InvalidConfig(format!(
                "timeout must be between {MIN_TIMEOUT:?} and {MAX_TIMEOUT:?}, got {:?}",
                self.timeout
            )));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(IndexerRpcError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.max_retries
            )));
        }

        if self.retry_delay.is_zero() {
            return Err(IndexerRpcError::InvalidConfig(
                "retry_delay must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
