//! Service layer for the joke-api process
//!
//! This module contains the application state that owns the broker connection,
//! the game event consumer and the HTTP server, plus health reporting.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{ComponentCheck, HealthCheck, HealthStatus};
