//! Health checks and readiness reporting
//!
//! This module provides health check functionality for the joke-api service,
//! including readiness and liveness probes.

use crate::amqp::consumer::{ConsumerState, SharedConsumerState};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional detail when not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl HealthCheck {
    /// Full health report for `/health`
    ///
    /// The relay has no standing connection to check, so the overall status
    /// follows the consumer: degraded while it is still starting up and
    /// unhealthy once it has failed or stopped.
    pub async fn check(service: &str, consumer_state: &SharedConsumerState) -> Self {
        let consumer_check = Self::check_consumer(consumer_state).await;

        HealthCheck {
            status: consumer_check.status,
            service: service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![consumer_check],
        }
    }

    /// Readiness: the service is ready once the consumer is attached
    pub async fn readiness_check(consumer_state: &SharedConsumerState) -> HealthStatus {
        Self::status_for(*consumer_state.read().await)
    }

    fn status_for(state: ConsumerState) -> HealthStatus {
        match state {
            ConsumerState::Consuming => HealthStatus::Healthy,
            ConsumerState::Disconnected
            | ConsumerState::Connected
            | ConsumerState::TopologyReady => HealthStatus::Degraded,
            ConsumerState::Failed | ConsumerState::Stopped => HealthStatus::Unhealthy,
        }
    }

    async fn check_consumer(consumer_state: &SharedConsumerState) -> ComponentCheck {
        let start = Instant::now();
        let state = *consumer_state.read().await;
        let status = Self::status_for(state);

        let message = match status {
            HealthStatus::Healthy => None,
            _ => Some(format!("Consumer is {}", state)),
        };

        ComponentCheck {
            name: "event_consumer".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
