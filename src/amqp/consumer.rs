//! Game event consumer
//!
//! Deliveries arrive on a channel fed by `basic.consume` and are processed
//! one at a time by a dedicated task. Combined with the prefetch limit of 1
//! this keeps at most one unacknowledged delivery outstanding.

use crate::amqp::topology::BrokerTopology;
use crate::error::ConsumerError;
use crate::metrics::MetricsCollector;
use amqprs::channel::{
    BasicAckArguments, BasicCancelArguments, BasicConsumeArguments, BasicNackArguments, Channel,
    ConsumerMessage,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of the consumer, from connection to shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    TopologyReady,
    Consuming,
    Failed,
    Stopped,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Disconnected => "disconnected",
            ConsumerState::Connected => "connected",
            ConsumerState::TopologyReady => "topology_ready",
            ConsumerState::Consuming => "consuming",
            ConsumerState::Failed => "failed",
            ConsumerState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Consumer state shared with the health endpoints
pub type SharedConsumerState = Arc<RwLock<ConsumerState>>;

pub fn new_consumer_state() -> SharedConsumerState {
    Arc::new(RwLock::new(ConsumerState::Disconnected))
}

/// A single delivery taken off the game queue
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub delivery_tag: u64,
    pub routing_key: String,
    pub redelivered: bool,
    pub payload: Vec<u8>,
}

impl GameEvent {
    /// Build from a consumer message; `None` if the frame carries no deliver
    pub fn from_consumer_message(message: ConsumerMessage) -> Option<Self> {
        let deliver = message.deliver?;
        Some(Self {
            delivery_tag: deliver.delivery_tag(),
            routing_key: deliver.routing_key().to_string(),
            redelivered: deliver.redelivered(),
            payload: message.content.unwrap_or_default(),
        })
    }

    /// Decode the payload as UTF-8 text
    pub fn decode_text(&self) -> Result<&str, ConsumerError> {
        std::str::from_utf8(&self.payload).map_err(|e| ConsumerError::MessageDecodeFailure {
            delivery_tag: self.delivery_tag,
            reason: e.to_string(),
        })
    }
}

/// Business handling of a decoded game event
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, event: &GameEvent, text: &str) -> anyhow::Result<()>;
}

/// Default handler: log the message and nothing else
#[derive(Debug, Default)]
pub struct LoggingMessageHandler;

#[async_trait]
impl MessageHandler for LoggingMessageHandler {
    async fn handle_message(&self, event: &GameEvent, text: &str) -> anyhow::Result<()> {
        info!(delivery_tag = event.delivery_tag, "Message received: {}", text);
        Ok(())
    }
}

/// Settles deliveries with the broker
#[async_trait]
pub trait DeliveryAcknowledger: Send + Sync {
    /// Positive acknowledgment of exactly one delivery
    async fn ack(&self, delivery_tag: u64) -> Result<(), ConsumerError>;

    /// Negative acknowledgment of exactly one delivery
    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), ConsumerError>;
}

#[async_trait]
impl DeliveryAcknowledger for Channel {
    async fn ack(&self, delivery_tag: u64) -> Result<(), ConsumerError> {
        self.basic_ack(BasicAckArguments::new(delivery_tag, false))
            .await
            .map_err(|e| ConsumerError::AcknowledgeFailed {
                delivery_tag,
                message: e.to_string(),
            })
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), ConsumerError> {
        self.basic_nack(BasicNackArguments::new(delivery_tag, false, requeue))
            .await
            .map_err(|e| ConsumerError::AcknowledgeFailed {
                delivery_tag,
                message: e.to_string(),
            })
    }
}

/// How a delivery was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acked,
    Rejected,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Acked => "acked",
            DeliveryOutcome::Rejected => "rejected",
        }
    }
}

/// Decode, handle and settle one delivery
///
/// Every call issues exactly one ack or one nack. Failures are never requeued
/// so a poison message cannot loop back into the consumer.
pub async fn process_delivery(
    event: &GameEvent,
    handler: &dyn MessageHandler,
    acknowledger: &dyn DeliveryAcknowledger,
) -> Result<DeliveryOutcome, ConsumerError> {
    let handled = match event.decode_text() {
        Ok(text) => handler
            .handle_message(event, text)
            .await
            .map_err(|e| ConsumerError::HandlerFailed {
                delivery_tag: event.delivery_tag,
                reason: e.to_string(),
            }),
        Err(e) => Err(e),
    };

    match handled {
        Ok(()) => {
            acknowledger.ack(event.delivery_tag).await?;
            debug!("Delivery {} acknowledged", event.delivery_tag);
            Ok(DeliveryOutcome::Acked)
        }
        Err(e) => {
            error!(
                "Rejecting delivery {} ({} bytes, routing key '{}'): {}",
                event.delivery_tag,
                event.payload.len(),
                event.routing_key,
                e
            );
            acknowledger.nack(event.delivery_tag, false).await?;
            Ok(DeliveryOutcome::Rejected)
        }
    }
}

/// Source of game events for the consume loop
#[async_trait]
pub trait DeliverySource: Send {
    /// Next delivery, or `None` once the stream is closed
    async fn next_event(&mut self) -> Option<GameEvent>;
}

#[async_trait]
impl DeliverySource for UnboundedReceiver<ConsumerMessage> {
    async fn next_event(&mut self) -> Option<GameEvent> {
        loop {
            let message = self.recv().await?;
            match GameEvent::from_consumer_message(message) {
                Some(event) => return Some(event),
                None => warn!("Ignoring consumer message without delivery metadata"),
            }
        }
    }
}

/// Why the consume loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    StreamClosed,
}

/// Sequential dispatch of deliveries to the handler
///
/// Each delivery is settled before the next one is read, and a shutdown
/// request is only observed between deliveries.
pub struct DeliveryLoop {
    handler: Arc<dyn MessageHandler>,
    acknowledger: Arc<dyn DeliveryAcknowledger>,
    state: SharedConsumerState,
    metrics: Option<Arc<MetricsCollector>>,
}

impl DeliveryLoop {
    pub fn new(
        handler: Arc<dyn MessageHandler>,
        acknowledger: Arc<dyn DeliveryAcknowledger>,
        state: SharedConsumerState,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            handler,
            acknowledger,
            state,
            metrics,
        }
    }

    /// Consume until shutdown or until the stream closes
    ///
    /// A closed stream moves the consumer state to `Failed`.
    pub async fn run<S: DeliverySource>(
        &self,
        mut deliveries: S,
        mut shutdown: oneshot::Receiver<()>,
    ) -> LoopExit {
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Consumer shutdown requested");
                    return LoopExit::Shutdown;
                }
                event = deliveries.next_event() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        error!("Delivery stream closed by the broker");
                        *self.state.write().await = ConsumerState::Failed;
                        return LoopExit::StreamClosed;
                    }
                },
            }
        }
    }

    async fn dispatch(&self, event: GameEvent) {
        if event.redelivered {
            warn!("Delivery {} is a redelivery", event.delivery_tag);
        }

        let outcome =
            process_delivery(&event, self.handler.as_ref(), self.acknowledger.as_ref()).await;
        let label = match &outcome {
            Ok(outcome) => outcome.as_str(),
            Err(e) => {
                error!("{}", e);
                "settle_failed"
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_amqp_message(label);
        }
    }
}

/// Consumer bound to the game queue on its own channel
pub struct EventConsumer {
    channel: Channel,
    topology: BrokerTopology,
    handler: Arc<dyn MessageHandler>,
    state: SharedConsumerState,
    metrics: Option<Arc<MetricsCollector>>,
    consumer_tag: String,
}

impl EventConsumer {
    /// Create a consumer; the channel must already carry the declared topology
    pub fn new(
        channel: Channel,
        topology: BrokerTopology,
        handler: Arc<dyn MessageHandler>,
        state: SharedConsumerState,
    ) -> Self {
        let consumer_tag = format!("joke-api-consumer-{}", uuid::Uuid::new_v4());

        Self {
            channel,
            topology,
            handler,
            state,
            metrics: None,
            consumer_tag,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn consume_arguments(queue: &str, consumer_tag: &str) -> BasicConsumeArguments {
        BasicConsumeArguments::new(queue, consumer_tag)
            .manual_ack(true)
            .finish()
    }

    /// Register with the broker and spawn the consume task
    pub async fn start(self) -> Result<ConsumerHandle, ConsumerError> {
        let args = Self::consume_arguments(&self.topology.queue, &self.consumer_tag);

        let (consumer_tag, deliveries) = self
            .channel
            .basic_consume_rx(args)
            .await
            .map_err(|e| {
                ConsumerError::setup(
                    &format!("Failed to start consuming from {}", self.topology.queue),
                    e,
                )
            })?;

        *self.state.write().await = ConsumerState::Consuming;
        info!(
            "Consuming from queue '{}' with manual acknowledgment (consumer tag {})",
            self.topology.queue, consumer_tag
        );

        let delivery_loop = DeliveryLoop::new(
            self.handler.clone(),
            Arc::new(self.channel.clone()),
            self.state.clone(),
            self.metrics.clone(),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            match delivery_loop.run(deliveries, shutdown_rx).await {
                LoopExit::Shutdown => self.stop().await,
                LoopExit::StreamClosed => {}
            }
        });

        Ok(ConsumerHandle {
            consumer_tag,
            shutdown_tx: Some(shutdown_tx),
            join,
        })
    }

    /// Cancel the consumer and close the channel
    async fn stop(self) {
        if let Err(e) = self
            .channel
            .basic_cancel(BasicCancelArguments::new(&self.consumer_tag))
            .await
        {
            warn!("Failed to cancel consumer {}: {}", self.consumer_tag, e);
        }

        if let Err(e) = self.channel.close().await {
            warn!("Failed to close consumer channel: {}", e);
        }

        *self.state.write().await = ConsumerState::Stopped;
        info!("Consumer stopped");
    }
}

/// Handle to the running consume task
pub struct ConsumerHandle {
    consumer_tag: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Let the in-flight delivery finish, then cancel and close the channel
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone if the broker closed the stream.
            let _ = tx.send(());
        }
        self.join
            .await
            .map_err(|e| anyhow::anyhow!("Consumer task failed: {}", e))
    }
}
