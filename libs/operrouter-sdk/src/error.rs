//! Error types shared by every transport adapter.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used to preserve the underlying transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`crate::OperRouterClient`] implementations.
///
/// Application-level failures reported by the service (`success == false`)
/// are **not** errors; they arrive inside the response envelope.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OperRouterError {
    /// Network, connection or native-call failure. The call was not applied.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The caller-supplied or default deadline elapsed.
    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),

    /// The shared library could not be loaded.
    #[error("failed to load library {}: {reason}", path.display())]
    LibraryLoad {
        /// Path passed to the loader
        path: PathBuf,
        /// Diagnostic reported by the system loader
        reason: String,
    },

    /// The shared library does not export the requested entry point.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// The adapter was closed before the call.
    #[error("client is closed")]
    Closed,

    /// Malformed reply, failed decode or ABI contract violation.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote service rejected the call (JSON-RPC error object or gRPC status).
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// Numeric error code as reported on the wire
        code: i64,
        /// Error message as reported on the wire
        message: String,
    },

    /// A required sub-object was absent in an otherwise well-formed reply.
    #[error("missing field in response: {0}")]
    MissingField(&'static str),

    /// Caller-provided configuration is incomplete or mistyped.
    #[error("invalid configuration field '{field}': {reason}")]
    InvalidConfig {
        /// Offending configuration key
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl OperRouterError {
    /// Build an [`OperRouterError::InvalidConfig`].
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any error as a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(err.into())
    }

    /// `true` for failures that happened before or while reaching the service.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Timeout(_)
                | Self::LibraryLoad { .. }
                | Self::SymbolNotFound(_)
                | Self::Closed
        )
    }

    /// `true` when the service was reached but the reply could not be used.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Rpc { .. } | Self::MissingField(_)
        )
    }
}

/// Result alias used throughout the SDK.
pub type OperRouterResult<T> = Result<T, OperRouterError>;
