//! Joke relay: fetches two-part jokes upstream and narrows them to
//! the service's own shape.

pub mod client;
pub mod models;

pub use client::JokeRelay;
pub use models::{RelayedJoke, UpstreamJoke, UpstreamJokeEnvelope};
