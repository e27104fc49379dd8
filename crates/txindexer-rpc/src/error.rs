//! Error types for the transaction-indexer RPC client.
//!
//! [`IndexerRpcError`] is the single error type for all client operations.
//! Variants split along the usual fault lines: network, protocol, data,
//! and usage. [`IndexerRpcError::is_retryable`] classifies the transient
//! ones so callers (and the built-in retry loop) can decide what to do.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`IndexerRpcError`].
pub type Result<T> = std::result::Result<T, IndexerRpcError>;

/// Errors that can occur when talking to the transaction indexer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndexerRpcError {
    /// Failed to establish a connection to the indexer endpoint.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request timed out waiting for a response.
    ///
    /// The timeout duration is set by
    /// [`ClientConfig::timeout`](crate::ClientConfig).
    #[error("request timed out")]
    Timeout,

    /// HTTP-level error (non-2xx status code, TLS issues, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The indexer returned a JSON-RPC error object.
    #[error("RPC error ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable error message from the server.
        message: String,
        /// Optional additional data from the error response.
        data: Option<String>,
    },

    /// Failed to serialize a request or deserialize a response.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response was valid JSON but had an unexpected structure.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration provided to the client.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation was cancelled before it could complete.
    ///
    /// Returned by the `*_with_retry` methods when their
    /// `CancellationToken` fires between attempts.
    #[error("operation cancelled")]
    Cancelled,
}

impl IndexerRpcError {
    /// Create an RPC error from code and message.
    #[must_use]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Check if this error is likely transient and worth retrying.
    ///
    /// Returns `true` for network issues, timeouts, and server-side errors
    /// that might succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Http(msg) => {
                // 5xx responses are typically transient
                msg.contains("500")
                    || msg.contains("502")
                    || msg.contains("503")
                    || msg.contains("504")
            }
            Self::Rpc { code, .. } => {
                // Server overloaded or rate limited
                *code == -32005 // Limit exceeded
                    || *code == -32000 // Server error (generic)
            }
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS FROM reqwest ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<reqwest::Error> for IndexerRpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_request() || err.is_body() || err.is_decode() {
            Self::Http(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RPC ERROR DETAILS
// ═══════════════════════════════════════════════════════════════════════════════

/// Detailed information from a JSON-RPC error response.
///
/// Used internally for parsing error responses from the server.
#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct RpcErrorDetail {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RpcErrorDetail {
    /// Convert this detail into an [`IndexerRpcError`].
    pub fn into_error(self) -> IndexerRpcError {
        IndexerRpcError::Rpc {
            code: self.code,
            message: self.message,
            data: self.data.map(|v| v.to_string()),
        }
    }
}

impl fmt::Display for RpcErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error ({}): {}", self.code, self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_retryable() {
        assert!(IndexerRpcError::Timeout.is_retryable());
        assert!(IndexerRpcError::Connection("connection refused".into()).is_retryable());
        assert!(IndexerRpcError::Http("503 Service Unavailable".into()).is_retryable());
        assert!(IndexerRpcError::rpc(-32000, "server error").is_retryable());

        assert!(!IndexerRpcError::rpc(-32601, "method not found").is_retryable());
        assert!(!IndexerRpcError::InvalidResponse("missing field".into()).is_retryable());
        assert!(!IndexerRpcError::Cancelled.is_retryable());
    }

    #[test]
    fn rpc_error_detail_deserialization() {
        let json = r#"{"code": -32601, "message": "Method not found"}"#;
        let detail: RpcErrorDetail = serde_json::from_str(json).expect("parse failed");
        assert_eq!(detail.code, -32601);
        assert_eq!(detail.message, "Method not found");
        assert!(detail.data.is_none());
    }

    #[test]
    fn rpc_error_detail_into_error_keeps_data() {
        let json = r#"{"code": -32000, "message": "overloaded", "data": {"retry": true}}"#;
        let detail: RpcErrorDetail = serde_json::from_str(json).expect("parse failed");
        let err = detail.into_error();
        assert!(matches!(err, IndexerRpcError::Rpc { code: -32000, data: Some(_), .. }));
    }
}
