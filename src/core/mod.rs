//! Core module containing fundamental types and configurations
//!
//! This module provides the basic building blocks for the wal2redis sink,
//! including configuration management, error handling, change records and
//! resume positions.

pub mod config;
pub mod errors;
pub mod position;
pub mod record;

// Re-export for convenience
pub use config::{DeliveryTarget, SinkConfig};
pub use errors::{SinkError, SinkResult};
pub use position::{PipelineContext, Position, PositionCursor};
pub use record::{ChangeRecord, OutputConfig, RowKind, RowRecord};
