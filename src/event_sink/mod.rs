//! Event sink foundation for change-event delivery
//! Provides the pluggable sink contract the capture pipeline drives

use crate::core::errors::SinkResult;
use crate::core::record::ChangeRecord;
use std::time::Duration;

pub mod redis;
pub mod retry;

/// Graceful-shutdown contract every pluggable sink offers the host pipeline
pub trait StoppableTask {
    /// Ask the task to stop. Must not block.
    fn request_stop(&mut self);

    /// Wait up to `timeout` for the task to finish stopping
    fn await_stop(&mut self, timeout: Duration) -> SinkResult<()>;
}

/// A sink consumes change records one at a time, in pipeline order
pub trait EventSink {
    /// Deliver (or skip) one record. Blocks until the record is resolved.
    fn push(&mut self, record: &dyn ChangeRecord) -> SinkResult<()>;

    /// The task the host stops on shutdown
    fn stoppable_task(&mut self) -> &mut dyn StoppableTask;
}

pub use self::redis::RedisEventSink;
pub use retry::{RetryFailure, RetryPolicy};
