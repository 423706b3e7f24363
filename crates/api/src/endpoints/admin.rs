//! Admin moderation endpoints.
//!
//! Privilege checks live in the services; these handlers only pass the
//! resolved caller through.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use nagare_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::{posts::PostResponse, reports::ReportResponse},
    extractors::AuthUser,
    middleware::AppState,
    response::ApiResponse,
};

const fn default_limit() -> u64 {
    20
}

/// Paged queue query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// The pending moderation queue, oldest first.
async fn pending_queue(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let posts = state
        .moderation_service
        .pending_queue(&caller, query.limit.min(100), query.offset)
        .await?;

    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Pending count response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCountResponse {
    pub count: u64,
}

/// Number of posts awaiting moderation.
async fn pending_count(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PendingCountResponse>> {
    let count = state.moderation_service.pending_count(&caller).await?;
    Ok(ApiResponse::ok(PendingCountResponse { count }))
}

/// Approve a pending post.
async fn approve(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.moderation_service.approve(&caller, &id).await?;
    Ok(ApiResponse::ok(()))
}

/// Reject a pending post.
async fn reject(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.moderation_service.reject(&caller, &id).await?;
    Ok(ApiResponse::ok(()))
}

/// Pending reports, newest first.
async fn reports_queue(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state
        .moderation_service
        .reports_queue(&caller, query.limit.min(100), query.offset)
        .await?;

    Ok(ApiResponse::ok(
        reports.into_iter().map(Into::into).collect(),
    ))
}

/// Resolve a pending report.
async fn resolve_report(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.moderation_service.resolve_report(&caller, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(pending_queue))
        .route("/pending/count", get(pending_count))
        .route("/posts/{id}/approve", post(approve))
        .route("/posts/{id}/reject", post(reject))
        .route("/reports", get(reports_queue))
        .route("/reports/{id}/resolve", post(resolve_report))
}
