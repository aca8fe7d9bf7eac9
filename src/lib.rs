//! Change-event delivery sink for Redis
//!
//! Takes ordered, position-tagged change records from a capture pipeline and
//! forwards each one to a Redis list or pub/sub channel, advancing the
//! pipeline's resume position only at transaction boundaries.

pub mod core;
pub mod event_sink;
pub mod metrics;
pub mod transport;

pub use crate::core::{
    ChangeRecord, DeliveryTarget, OutputConfig, PipelineContext, Position, PositionCursor,
    RowKind, RowRecord, SinkConfig, SinkError, SinkResult,
};
pub use event_sink::{EventSink, RedisEventSink, StoppableTask};
pub use metrics::{DeliveryMetrics, MetricsRegistry};
pub use transport::{
    RedisTransport, RedisTransportConfig, Transport, TransportError, TransportErrorKind,
};
