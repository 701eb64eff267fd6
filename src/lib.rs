//! Joke API - joke relay over HTTP plus a game event consumer over AMQP
//!
//! This crate relays two-part jokes from an upstream joke service and
//! consumes game events from a RabbitMQ queue with manual acknowledgment.

pub mod amqp;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod service;

// Re-export commonly used types and traits
pub use error::{ConsumerError, RelayError, Result};

// Re-export key components
pub use amqp::publisher::EventPublisher;
pub use amqp::{BrokerTopology, EventConsumer, MessageHandler};
pub use relay::{JokeRelay, RelayedJoke};
pub use service::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
