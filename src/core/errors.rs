//! Error types for the change-event delivery sink
//! Provides structured error handling using thiserror for better error reporting

use crate::transport::TransportError;
use thiserror::Error;

/// Main error type for the delivery sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A record could not be turned into its wire payload
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Delivery failed and the producer error policy says to abort
    #[error("Delivery to {target} failed after {attempts} attempt(s)")]
    Delivery {
        target: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Transport errors outside of a delivery attempt (connect, stop)
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type alias for convenience
pub type SinkResult<T> = std::result::Result<T, SinkError>;

impl SinkError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a delivery error for a target
    pub fn delivery<S: Into<String>>(target: S, attempts: u32, source: TransportError) -> Self {
        Self::Delivery {
            target: target.into(),
            attempts,
            source,
        }
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
            source: err,
        }
    }
}
