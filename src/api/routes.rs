//! HTTP routes: the joke relay endpoint plus health and metrics
//!
//! Relay failures of any kind produce a bare 400. The cause is logged by the
//! relay and counted in the metrics, never exposed to the caller.

use crate::amqp::consumer::SharedConsumerState;
use crate::metrics::MetricsCollector;
use crate::relay::{JokeRelay, RelayedJoke};
use crate::service::health::{HealthCheck, HealthStatus};
use anyhow::Context;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Route serving relayed jokes
pub const JOKES_ROUTE: &str = "/api/v1/joke/jokes";

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub relay: JokeRelay,
    pub metrics: Arc<MetricsCollector>,
    pub consumer_state: SharedConsumerState,
    pub service_name: String,
    pub default_joke_count: u32,
}

/// Query string of the jokes route
#[derive(Debug, Deserialize)]
pub struct JokeQuery {
    #[serde(rename = "nrOfJokes")]
    pub nr_of_jokes: Option<u32>,
}

/// Build the router with CORS restricted to `allowed_origin`
pub fn create_router(state: ApiState, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("Invalid allowed origin: {}", allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET]);

    Ok(Router::new()
        .route("/", get(root_handler))
        .route(JOKES_ROUTE, get(jokes_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [JOKES_ROUTE, "/health", "/ready", "/metrics"]
    }))
}

/// `GET /api/v1/joke/jokes[?nrOfJokes=n]`
async fn jokes_handler(
    State(state): State<ApiState>,
    query: Result<Query<JokeQuery>, QueryRejection>,
) -> Response {
    let count = match query {
        Ok(Query(query)) => query.nr_of_jokes.unwrap_or(state.default_joke_count),
        Err(rejection) => {
            warn!("Rejected joke query: {}", rejection);
            state.metrics.record_relay_request("invalid_query", None);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let timer = state.metrics.start_timer();
    let result = state.relay.fetch_jokes(count).await;
    let elapsed = timer.stop();

    match result {
        Ok(jokes) => {
            state.metrics.record_relay_request("ok", Some(elapsed));
            Json::<Vec<RelayedJoke>>(jokes).into_response()
        }
        Err(e) => {
            debug!("Joke relay failed: {}", e);
            let upstream_duration = e.reached_upstream().then_some(elapsed);
            state
                .metrics
                .record_relay_request(e.outcome(), upstream_duration);
            e.into_response()
        }
    }
}

/// Liveness: always 200 while the process serves HTTP; the body carries
/// the component detail
async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthCheck::check(&state.service_name, &state.consumer_state).await)
}

/// Ready once the game event consumer is attached
async fn ready_handler(State(state): State<ApiState>) -> impl IntoResponse {
    match HealthCheck::readiness_check(&state.consumer_state).await {
        HealthStatus::Healthy => (StatusCode::OK, "Ready"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.metrics.encode_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}
