//! AMQP integration for the game event consumer
//!
//! This module handles the broker connection, the declarative topology, the
//! consume task and a small publisher for driving the consumer.

pub mod connection;
pub mod consumer;
pub mod publisher;
pub mod topology;

// Re-export commonly used types
pub use connection::{AmqpConfig, AmqpConnection};
pub use consumer::{
    process_delivery, ConsumerHandle, ConsumerState, DeliveryAcknowledger, DeliveryOutcome,
    EventConsumer, GameEvent, LoggingMessageHandler, MessageHandler, SharedConsumerState,
};
pub use publisher::EventPublisher;
pub use topology::{BrokerTopology, GAME_EXCHANGE, GAME_QUEUE, GAME_ROUTING_KEY, PREFETCH_COUNT};
