//! Test fixtures for integration testing: upstream joke payloads and a
//! mocked upstream joke service.

#![allow(dead_code)]

use joke_api::amqp::consumer::new_consumer_state;
use joke_api::api::{create_router, ApiState};
use joke_api::metrics::MetricsCollector;
use joke_api::relay::JokeRelay;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ALLOWED_ORIGIN: &str = "http://localhost:9000";

/// One upstream two-part joke, with the extra fields the relay drops
pub fn upstream_joke(id: u64, category: &str, setup: &str, delivery: &str) -> Value {
    json!({
        "category": category,
        "type": "twopart",
        "setup": setup,
        "delivery": delivery,
        "flags": {
            "nsfw": false,
            "religious": false,
            "political": false,
            "racist": false,
            "sexist": false,
            "explicit": false
        },
        "id": id,
        "safe": true,
        "lang": "en"
    })
}

/// Upstream envelope around `jokes`
pub fn envelope(jokes: Vec<Value>) -> Value {
    json!({
        "error": false,
        "amount": jokes.len(),
        "jokes": jokes
    })
}

/// `count` distinct jokes, numbered from 1
pub fn numbered_jokes(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| {
            upstream_joke(
                i as u64,
                "Programming",
                &format!("setup {}", i),
                &format!("delivery {}", i),
            )
        })
        .collect()
}

/// Mount a mocked `GET /Any?type=twopart&amount=n` answering with `body`
pub async fn mount_jokes(server: &MockServer, amount: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/Any"))
        .and(query_param("type", "twopart"))
        .and(query_param("amount", amount.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a mocked upstream that always answers with `status`
pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Router state pointing the relay at `upstream`
pub fn api_state(upstream: &str) -> ApiState {
    ApiState {
        relay: JokeRelay::new(upstream, Duration::from_secs(2)).unwrap(),
        metrics: Arc::new(MetricsCollector::new().unwrap()),
        consumer_state: new_consumer_state(),
        service_name: "joke-api".to_string(),
        default_joke_count: 6,
    }
}

/// Router with the standard CORS origin
pub fn router(state: ApiState) -> axum::Router {
    create_router(state, ALLOWED_ORIGIN).unwrap()
}
