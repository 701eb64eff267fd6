//! Outbound client for the upstream joke API

use crate::error::RelayError;
use crate::relay::models::{RelayedJoke, UpstreamJokeEnvelope};
use anyhow::Context;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Joke category segment requested upstream
const ANY_CATEGORY: &str = "Any";
/// Only two-part jokes carry a setup and a delivery
const TWO_PART: &str = "twopart";

/// Relays joke requests to the upstream joke API
///
/// The underlying `reqwest::Client` is built once and cloned cheaply, so every
/// call reuses the same connection pool.
#[derive(Clone)]
pub struct JokeRelay {
    client: Client,
    base_url: String,
}

impl JokeRelay {
    /// Build a relay with a pooled client bounded by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("joke-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn jokes_url(&self) -> String {
        format!("{}/{}", self.base_url, ANY_CATEGORY)
    }

    /// Fetch `count` two-part jokes, in upstream order
    ///
    /// Never returns an empty list: an empty upstream result is an error.
    pub async fn fetch_jokes(&self, count: u32) -> Result<Vec<RelayedJoke>, RelayError> {
        if count == 0 {
            warn!("Rejecting joke request for 0 jokes");
            return Err(RelayError::InvalidJokeCount { count });
        }

        let amount = count.to_string();
        let response = self
            .client
            .get(self.jokes_url())
            .query(&[("type", TWO_PART), ("amount", amount.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!("Request to JokeApi failed: {}", e);
                RelayError::UpstreamUnavailable {
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "A response status code from JokeApi was not success: {}",
                status
            );
            return Err(RelayError::UpstreamUnavailable {
                message: format!("status {}", status),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read JokeApi response body: {}", e);
            RelayError::UpstreamMalformedResponse {
                reason: e.to_string(),
            }
        })?;

        let envelope = Self::decode_envelope(&body)?;
        let jokes = envelope.into_relayed();

        if jokes.is_empty() {
            warn!("A list of jokes is empty.");
            return Err(RelayError::UpstreamEmptyResult);
        }

        debug!("Relayed {} jokes (requested {})", jokes.len(), count);
        Ok(jokes)
    }

    /// Decode an upstream body; a JSON `null` counts as malformed
    pub fn decode_envelope(body: &[u8]) -> Result<UpstreamJokeEnvelope, RelayError> {
        match serde_json::from_slice::<Option<UpstreamJokeEnvelope>>(body) {
            Ok(Some(envelope)) => Ok(envelope),
            Ok(None) => {
                warn!("Response from JokeApi is null.");
                Err(RelayError::UpstreamMalformedResponse {
                    reason: "response body is null".to_string(),
                })
            }
            Err(e) => {
                warn!("Response from JokeApi could not be decoded: {}", e);
                Err(RelayError::UpstreamMalformedResponse {
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn joke_json(id: u64) -> serde_json::Value {
        json!({
            "category": "Programming",
            "type": "twopart",
            "setup": format!("setup {}", id),
            "delivery": format!("delivery {}", id),
            "flags": { "nsfw": false, "religious": false },
            "id": id,
            "safe": true,
            "lang": "en"
        })
    }

    fn relay_for(server: &MockServer) -> JokeRelay {
        JokeRelay::new(&format!("{}/joke/", server.uri()), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_jokes_success_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joke/Any"))
            .and(query_param("type", "twopart"))
            .and(query_param("amount", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": false,
                "amount": 3,
                "jokes": [joke_json(3), joke_json(1), joke_json(2)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let jokes = relay_for(&server).fetch_jokes(3).await.unwrap();

        let setups: Vec<&str> = jokes.iter().map(|j| j.setup.as_str()).collect();
        assert_eq!(setups, vec!["setup 3", "setup 1", "setup 2"]);
        assert_eq!(jokes[0].category, "Programming");
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": false,
                "amount": 1,
                "jokes": [joke_json(1)]
            })))
            .mount(&server)
            .await;

        let result = relay_for(&server).fetch_jokes(1).await;
        assert!(matches!(
            result,
            Err(RelayError::UpstreamUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let server = MockServer::start().await;
        let mut joke = joke_json(1);
        joke.as_object_mut().unwrap().remove("delivery");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": false,
                "amount": 1,
                "jokes": [joke]
            })))
            .mount(&server)
            .await;

        let result = relay_for(&server).fetch_jokes(1).await;
        assert!(matches!(
            result,
            Err(RelayError::UpstreamMalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_null_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let result = relay_for(&server).fetch_jokes(2).await;
        assert!(matches!(
            result,
            Err(RelayError::UpstreamMalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_jokes_is_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": false,
                "amount": 0,
                "jokes": []
            })))
            .mount(&server)
            .await;

        let result = relay_for(&server).fetch_jokes(2).await;
        assert!(matches!(result, Err(RelayError::UpstreamEmptyResult)));
    }

    #[tokio::test]
    async fn test_zero_count_skips_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = relay_for(&server).fetch_jokes(0).await;
        assert!(matches!(
            result,
            Err(RelayError::InvalidJokeCount { count: 0 })
        ));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "error": false, "amount": 1, "jokes": [joke_json(1)] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let relay = JokeRelay::new(&format!("{}/joke", server.uri()), Duration::from_millis(100))
            .unwrap();
        let result = relay.fetch_jokes(1).await;
        assert!(matches!(
            result,
            Err(RelayError::UpstreamUnavailable { .. })
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let relay =
            JokeRelay::new("https://v2.jokeapi.dev/joke/", Duration::from_secs(5)).unwrap();
        assert_eq!(relay.base_url(), "https://v2.jokeapi.dev/joke");
        assert_eq!(relay.jokes_url(), "https://v2.jokeapi.dev/joke/Any");
    }

    #[test]
    fn test_decode_envelope_rejects_garbage() {
        assert!(JokeRelay::decode_envelope(b"<html>oops</html>").is_err());
        assert!(JokeRelay::decode_envelope(b"null").is_err());
    }
}
