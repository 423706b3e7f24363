//! HTTP API layer for nagare.
//!
//! This crate provides the JSON API and real-time streams:
//!
//! - **Endpoints**: posts, comments, reactions, reports, admin, profile
//! - **Extractors**: caller identity resolved by the auth middleware
//! - **SSE**: per-topic change streams backed by the fan-out bus
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::router;
pub use middleware::AppState;
