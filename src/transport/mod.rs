//! Transport layer for the delivery sink
//!
//! The sink only needs two write operations from a backend plus the ability to
//! drop and re-establish its connection. Failures carry an explicit
//! [`TransportErrorKind`] so retry decisions are a match on data.

use std::fmt;
use thiserror::Error;

pub mod redis;

#[cfg(test)]
pub(crate) mod fake_server;

pub use self::redis::{RedisTransport, RedisTransportConfig};

/// Failure classes reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection was lost, refused or is closed. Recoverable by reconnecting.
    Connection,
    /// The backend answered with an error, or anything else went wrong.
    Backend,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connection => write!(f, "connection"),
            TransportErrorKind::Backend => write!(f, "backend"),
        }
    }
}

/// Error returned by every transport operation
#[derive(Error, Debug)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Create a connectivity-class error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self {
            kind: TransportErrorKind::Connection,
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self {
            kind: TransportErrorKind::Backend,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// True when the connection was lost and a reconnect may help
    pub fn is_connection(&self) -> bool {
        self.kind == TransportErrorKind::Connection
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Write-side capability of a messaging backend.
///
/// Implementations own exactly one connection and are driven from a single
/// thread; all calls block until the backend answers.
pub trait Transport: Send {
    /// Push a payload onto the head of a list
    fn enqueue(&mut self, key: &str, payload: &str) -> TransportResult<()>;

    /// Publish a payload on a channel
    fn publish(&mut self, channel: &str, payload: &str) -> TransportResult<()>;

    /// Force-close the current connection
    fn disconnect(&mut self);

    /// Establish a fresh connection
    fn reconnect(&mut self) -> TransportResult<()>;

    /// Close the connection for good. Later calls fail with a connection error.
    fn close(&mut self);
}
