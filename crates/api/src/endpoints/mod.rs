//! API endpoints.

mod admin;
mod comments;
mod posts;
mod profile;
mod reactions;
mod reports;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

pub use reactions::{TargetRef, TargetType};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/reactions", reactions::router())
        .nest("/reports", reports::router())
        .nest("/admin", admin::router())
        .nest("/profile", profile::router())
        .nest("/sse", sse::router())
}
