//! Metrics and monitoring for the joke-api service

pub mod collector;

pub use collector::{ConsumerMetrics, MetricsCollector, MetricsTimer, RelayMetrics};
