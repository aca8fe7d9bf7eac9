//! Redis delivery sink
//!
//! Forwards each change record to a Redis list or channel and advances the
//! pipeline's resume position once the record is resolved. Delivery is
//! at-least-once: the position only moves on transaction commits, so a restart
//! replays the whole unfinished transaction.

use super::retry::{RetryFailure, RetryPolicy};
use super::{EventSink, StoppableTask};
use crate::core::config::{DeliveryTarget, SinkConfig};
use crate::core::errors::{SinkError, SinkResult};
use crate::core::position::PipelineContext;
use crate::core::record::{ChangeRecord, OutputConfig};
use crate::metrics::DeliveryMetrics;
use crate::transport::{RedisTransport, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};

/// Sink delivering change records through a [`Transport`]
pub struct RedisEventSink<T: Transport = RedisTransport> {
    transport: T,
    target: DeliveryTarget,
    output: OutputConfig,
    ignore_producer_error: bool,
    retry: RetryPolicy,
    context: Arc<dyn PipelineContext>,
    metrics: DeliveryMetrics,
}

impl RedisEventSink<RedisTransport> {
    /// Connect to Redis and create the sink
    pub fn connect(
        config: &SinkConfig,
        context: Arc<dyn PipelineContext>,
        metrics: DeliveryMetrics,
    ) -> SinkResult<Self> {
        let transport = RedisTransport::connect(config.redis.clone())?;
        Ok(Self::with_transport(transport, config, context, metrics))
    }
}

impl<T: Transport> RedisEventSink<T> {
    /// Create a sink over an already connected transport
    pub fn with_transport(
        transport: T,
        config: &SinkConfig,
        context: Arc<dyn PipelineContext>,
        metrics: DeliveryMetrics,
    ) -> Self {
        Self {
            transport,
            target: config.target.clone(),
            output: config.output.clone(),
            ignore_producer_error: config.ignore_producer_error,
            retry: RetryPolicy::default(),
            context,
            metrics,
        }
    }

    pub fn target(&self) -> &DeliveryTarget {
        &self.target
    }

    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one payload, reconnecting on lost connections
    fn deliver(&mut self, payload: &str) -> Result<(), RetryFailure<TransportError>> {
        let target = &self.target;
        self.retry.run(
            &mut self.transport,
            |transport: &mut T| match target {
                DeliveryTarget::List { key } => transport.enqueue(key, payload),
                DeliveryTarget::Channel { channel } => transport.publish(channel, payload),
            },
            |error: &TransportError| error.is_connection(),
            |transport: &mut T, error: &TransportError, retry: u32| {
                warn!(
                    "lost connection to server, trying to reconnect (retry {}): {}",
                    retry, error
                );
                transport.disconnect();
                if let Err(e) = transport.reconnect() {
                    warn!("Reconnect failed: {}", e);
                }
            },
        )
    }
}

impl<T: Transport> EventSink for RedisEventSink<T> {
    fn push(&mut self, record: &dyn ChangeRecord) -> SinkResult<()> {
        if !record.should_output(&self.output) {
            self.context.set_position(record.next_position());
            return Ok(());
        }

        let payload = record.to_json(&self.output)?;

        match self.deliver(&payload) {
            Ok(()) => self.metrics.record_success(),
            Err(failure) => {
                self.metrics.record_failure();
                error!(
                    "Failed to deliver to {} after {} attempt(s){}: {}",
                    self.target,
                    failure.attempts,
                    if failure.exhausted { ", retries exhausted" } else { "" },
                    failure.error
                );

                if !self.ignore_producer_error {
                    return Err(SinkError::delivery(
                        self.target.to_string(),
                        failure.attempts,
                        failure.error,
                    ));
                }
            }
        }

        if record.is_tx_commit() {
            self.context.set_position(record.next_position());
        }

        if tracing::enabled!(Level::DEBUG) {
            debug!("->  {}, msg:{}", self.target, payload);
        }

        Ok(())
    }

    fn stoppable_task(&mut self) -> &mut dyn StoppableTask {
        self
    }
}

impl<T: Transport> StoppableTask for RedisEventSink<T> {
    fn request_stop(&mut self) {
        info!("Stopping redis sink for {}", self.target);
        self.transport.close();
    }

    // All work happens on the caller's thread, there is nothing to drain
    fn await_stop(&mut self, _timeout: Duration) -> SinkResult<()> {
        Ok(())
    }
}
