//! Upstream joke API payloads and the relayed joke shape

use serde::{Deserialize, Serialize};

/// Response envelope of the upstream joke API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamJokeEnvelope {
    pub error: bool,
    pub amount: u32,
    #[serde(default)]
    pub jokes: Vec<UpstreamJoke>,
}

/// A two-part joke as returned upstream; every field is required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamJoke {
    pub id: u64,
    pub setup: String,
    pub delivery: String,
    pub category: String,
    #[serde(rename = "type")]
    pub joke_type: String,
    pub safe: bool,
    pub lang: String,
    pub flags: serde_json::Value,
}

/// The joke shape this service hands to its callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedJoke {
    pub category: String,
    pub setup: String,
    pub delivery: String,
}

impl From<UpstreamJoke> for RelayedJoke {
    fn from(joke: UpstreamJoke) -> Self {
        Self {
            category: joke.category,
            setup: joke.setup,
            delivery: joke.delivery,
        }
    }
}

impl UpstreamJokeEnvelope {
    /// Project every joke, in upstream order
    pub fn into_relayed(self) -> Vec<RelayedJoke> {
        self.jokes.into_iter().map(RelayedJoke::from).collect()
    }
}
