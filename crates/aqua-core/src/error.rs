use std::time::Duration;

use thiserror::Error;

/// Result alias used by every typed transport operation
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport-level errors
///
/// None of these are fatal: each one is a local condition reported to the
/// immediate caller.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("handle is not open")]
    ClosedHandle,

    #[error("I/O error: {0}")]
    Access(#[from] std::io::Error),

    #[error("operation timed out after {}ms", .waited.as_millis())]
    TimedOut { waited: Duration },

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("peer disconnected")]
    Disconnected,

    #[error("no end marker within {max} bytes")]
    LineTooLong { max: usize },

    #[error("end marker must not be empty")]
    EmptyEndMarker,

    #[error("wait cancelled")]
    Cancelled,
}

impl TransportError {
    /// Build an `Open` error, keeping the underlying cause as its source
    pub fn open(
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TransportError::Open {
            target: target.into(),
            source: source.into(),
        }
    }

    /// True for the deadline-elapsed case
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::TimedOut { .. })
    }
}

/// Returned by `ResultBuffer` accessors when the buffer is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid access: result buffer is unavailable")]
pub struct InvalidAccess;
