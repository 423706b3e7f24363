//! Report endpoints.

use axum::{Json, Router, extract::State, routing::post};
use nagare_common::AppResult;
use nagare_db::entities::report::ReportStatus;
use nagare_queue::WriteIntent;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::reactions::TargetRef, extractors::AuthUser, middleware::AppState,
    response::ApiResponse,
};

/// Report response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_by: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<nagare_db::entities::report::Model> for ReportResponse {
    fn from(r: nagare_db::entities::report::Model) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            post_id: r.post_id,
            comment_id: r.comment_id,
            reason: r.reason,
            status: r.status,
            resolved_by: r.resolved_by,
            created_at: r.created_at.to_rfc3339(),
            resolved_at: r.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// File report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReportRequest {
    #[serde(flatten)]
    pub target: TargetRef,
    pub reason: String,
}

/// File a report against a post or comment. Held in the offline journal
/// if the store is unreachable.
async fn create(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FileReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let intent = WriteIntent::FileReport {
        target: req.target.clone().into(),
        reason: req.reason.clone(),
    };

    let result = async {
        state.profile_service.ensure_profile(&caller).await?;
        state
            .moderation_service
            .file_report(&caller, req.target.into(), &req.reason)
            .await
    }
    .await;

    match result {
        Ok(report) => Ok(ApiResponse::ok(report.into())),
        Err(e) => Err(state.capture_failed_write(&caller, intent, e).await),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create))
}
