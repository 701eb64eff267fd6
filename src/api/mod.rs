//! HTTP surface of the service: joke relay route, health and metrics.

pub mod routes;
pub mod server;

pub use routes::{create_router, ApiState, JokeQuery, JOKES_ROUTE};
pub use server::{HttpServer, HttpServerHandle};
