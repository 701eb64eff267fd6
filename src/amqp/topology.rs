//! Declarative broker topology for game events
//!
//! Exchange, queue and binding names are plain configuration; the queue flags
//! and the prefetch limit are fixed.
//! They are asserted exactly once, during startup, by [`BrokerTopology::declare`].

use crate::error::ConsumerError;
use amqprs::channel::{
    BasicQosArguments, Channel, ExchangeDeclareArguments, QueueBindArguments,
    QueueDeclareArguments,
};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default exchange for game events
pub const GAME_EXCHANGE: &str = "GameExchange";
/// Default queue the consumer reads from
pub const GAME_QUEUE: &str = "GameQueue";
/// Default routing key binding the queue to the exchange
pub const GAME_ROUTING_KEY: &str = "game-routing-key";

/// AMQP exchange type used for game events
const DIRECT_EXCHANGE: &str = "direct";

/// At most one unacknowledged delivery is held by the consumer
pub const PREFETCH_COUNT: u16 = 1;

/// Exchange, queue and binding the consumer depends on
///
/// Only the names are configurable. The queue is always non-durable,
/// non-exclusive and kept when unused, and the prefetch is always
/// [`PREFETCH_COUNT`]; unknown keys are rejected so those cannot be
/// overridden from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerTopology {
    /// Direct exchange name
    pub exchange: String,
    /// Queue name
    pub queue: String,
    /// Routing key binding `queue` to `exchange`
    pub routing_key: String,
}

impl Default for BrokerTopology {
    fn default() -> Self {
        Self {
            exchange: GAME_EXCHANGE.to_string(),
            queue: GAME_QUEUE.to_string(),
            routing_key: GAME_ROUTING_KEY.to_string(),
        }
    }
}

impl BrokerTopology {
    /// Check names before touching the broker
    pub fn validate(&self) -> Result<()> {
        if self.exchange.is_empty() {
            return Err(anyhow!("AMQP exchange name cannot be empty"));
        }
        if self.queue.is_empty() {
            return Err(anyhow!("AMQP queue name cannot be empty"));
        }
        if self.routing_key.is_empty() {
            return Err(anyhow!("AMQP routing key cannot be empty"));
        }
        Ok(())
    }

    pub(crate) fn exchange_arguments(&self) -> ExchangeDeclareArguments {
        ExchangeDeclareArguments::new(&self.exchange, DIRECT_EXCHANGE)
    }

    pub(crate) fn queue_arguments(&self) -> QueueDeclareArguments {
        QueueDeclareArguments::new(&self.queue)
            .durable(false)
            .exclusive(false)
            .auto_delete(false)
            .finish()
    }

    pub(crate) fn bind_arguments(&self) -> QueueBindArguments {
        QueueBindArguments::new(&self.queue, &self.exchange, &self.routing_key)
    }

    /// Per-consumer prefetch limit, never global
    pub(crate) fn qos_arguments(&self) -> BasicQosArguments {
        BasicQosArguments::new(0, PREFETCH_COUNT, false)
    }

    /// Assert the topology on `channel`
    ///
    /// Re-declaring matching entities is a no-op on the broker; a mismatch
    /// (for example an existing durable `GameQueue`) closes the channel and
    /// surfaces here as a setup failure.
    pub async fn declare(&self, channel: &Channel) -> std::result::Result<(), ConsumerError> {
        channel
            .exchange_declare(self.exchange_arguments())
            .await
            .map_err(|e| {
                ConsumerError::setup(&format!("Failed to declare exchange {}", self.exchange), e)
            })?;
        info!("Exchange '{}' declared ({})", self.exchange, DIRECT_EXCHANGE);

        channel
            .queue_declare(self.queue_arguments())
            .await
            .map_err(|e| {
                ConsumerError::setup(&format!("Failed to declare queue {}", self.queue), e)
            })?;
        info!("Queue '{}' declared", self.queue);

        channel.queue_bind(self.bind_arguments()).await.map_err(|e| {
            ConsumerError::setup(
                &format!(
                    "Failed to bind queue {} to {} with '{}'",
                    self.queue, self.exchange, self.routing_key
                ),
                e,
            )
        })?;
        info!(
            "Queue '{}' bound to '{}' with routing key '{}'",
            self.queue, self.exchange, self.routing_key
        );

        channel
            .basic_qos(self.qos_arguments())
            .await
            .map_err(|e| ConsumerError::setup("Failed to set channel QoS", e))?;
        info!("Channel prefetch set to {}", PREFETCH_COUNT);

        Ok(())
    }
}
