//! Game event publisher
//!
//! Publishes plain-text game events to the configured exchange. Used by the
//! `event-publisher` tool and the live broker tests to drive the consumer.

use crate::amqp::topology::BrokerTopology;
use amqprs::channel::{BasicPublishArguments, Channel};
use amqprs::BasicProperties;
use anyhow::{Context, Result};
use tracing::debug;

/// Publishes text payloads to the game exchange
pub struct EventPublisher {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl EventPublisher {
    /// Create a publisher targeting the topology's exchange and routing key
    pub fn new(channel: Channel, topology: &BrokerTopology) -> Self {
        Self {
            channel,
            exchange: topology.exchange.clone(),
            routing_key: topology.routing_key.clone(),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Publish `text` as a UTF-8 message
    pub async fn publish_text(&self, text: &str) -> Result<()> {
        self.publish_bytes(text.as_bytes().to_vec(), "text/plain")
            .await
    }

    /// Publish raw bytes, for example to exercise the reject path
    pub async fn publish_bytes(&self, payload: Vec<u8>, content_type: &str) -> Result<()> {
        let size = payload.len();
        let args = BasicPublishArguments::new(&self.exchange, &self.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&uuid::Uuid::new_v4().to_string())
            .with_timestamp(chrono::Utc::now().timestamp() as u64)
            .with_content_type(content_type);

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .with_context(|| {
                format!(
                    "Failed to publish to {} with routing key {}",
                    self.exchange, self.routing_key
                )
            })?;

        debug!(
            "Published {} bytes to '{}' ({})",
            size, self.exchange, self.routing_key
        );
        Ok(())
    }

    /// Close the publishing channel
    pub async fn close(self) -> Result<()> {
        self.channel
            .close()
            .await
            .context("Failed to close publisher channel")
    }
}
