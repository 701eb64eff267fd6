//! Metrics collection using Prometheus
//!
//! This module provides metrics for the joke relay and the game event
//! consumer, exposed through the `/metrics` endpoint.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Relay-related metrics
    relay_metrics: RelayMetrics,

    /// Consumer-related metrics
    consumer_metrics: ConsumerMetrics,
}

/// Joke relay metrics
#[derive(Clone)]
pub struct RelayMetrics {
    /// Relay calls by outcome (ok, upstream_unavailable, ...)
    pub requests_total: IntCounterVec,

    /// Round trip time of upstream calls
    pub upstream_duration: Histogram,
}

/// Game event consumer metrics
#[derive(Clone)]
pub struct ConsumerMetrics {
    /// Deliveries by outcome (acked, rejected, settle_failed)
    pub amqp_messages_total: IntCounterVec,

    /// 1 while the consumer is attached to its queue
    pub consuming: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let relay_metrics = RelayMetrics::new(&registry)?;
        let consumer_metrics = ConsumerMetrics::new(&registry)?;

        Ok(Self {
            registry,
            relay_metrics,
            consumer_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn relay(&self) -> &RelayMetrics {
        &self.relay_metrics
    }

    pub fn consumer(&self) -> &ConsumerMetrics {
        &self.consumer_metrics
    }

    /// Record one relay call
    ///
    /// `upstream_duration` is `None` when the request was rejected before any
    /// upstream call, so the latency histogram only sees real round trips.
    pub fn record_relay_request(&self, outcome: &str, upstream_duration: Option<Duration>) {
        self.relay_metrics
            .requests_total
            .with_label_values(&[outcome])
            .inc();
        if let Some(duration) = upstream_duration {
            self.relay_metrics
                .upstream_duration
                .observe(duration.as_secs_f64());
        }
    }

    /// Record one settled delivery
    pub fn record_amqp_message(&self, outcome: &str) {
        self.consumer_metrics
            .amqp_messages_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn set_consuming(&self, consuming: bool) {
        self.consumer_metrics.consuming.set(consuming as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        TextEncoder::new()
            .encode_to_string(&metric_families)
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
    }

    /// Content type of [`encode_text`](Self::encode_text) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

impl RelayMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "joke_api_relay_requests_total",
                "Total joke relay requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let upstream_duration = Histogram::with_opts(
            HistogramOpts::new(
                "joke_api_upstream_request_duration_seconds",
                "Upstream joke API round trip time",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(upstream_duration.clone()))?;

        Ok(Self {
            requests_total,
            upstream_duration,
        })
    }
}

impl ConsumerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let amqp_messages_total = IntCounterVec::new(
            Opts::new(
                "joke_api_amqp_messages_total",
                "Total game event deliveries by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(amqp_messages_total.clone()))?;

        let consuming = IntGauge::new(
            "joke_api_consumer_active",
            "Whether the game event consumer is attached (1) or not (0)",
        )?;
        registry.register(Box::new(consuming.clone()))?;

        Ok(Self {
            amqp_messages_total,
            consuming,
        })
    }
}
