//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use nagare_common::AppResult;
use nagare_queue::WriteIntent;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Comment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub likes: i32,
    pub created_at: String,
}

impl From<nagare_db::entities::comment::Model> for CommentResponse {
    fn from(c: nagare_db::entities::comment::Model) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            author_id: c.author_id,
            author_username: c.author_username,
            author_avatar: c.author_avatar,
            content: c.content,
            likes: c.likes,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub content: String,
    pub parent_id: Option<String>,
}

/// Create a comment (optionally a one-level reply). Held in the offline
/// journal if the store is unreachable.
async fn create(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let intent = WriteIntent::CreateComment {
        post_id: req.post_id.clone(),
        parent_id: req.parent_id.clone(),
        content: req.content.clone(),
    };

    let result = async {
        state.profile_service.ensure_profile(&caller).await?;
        state
            .comment_service
            .create(&caller, &req.post_id, &req.content, req.parent_id.as_deref())
            .await
    }
    .await;

    match result {
        Ok(comment) => Ok(ApiResponse::ok(comment.into())),
        Err(e) => Err(state.capture_failed_write(&caller, intent, e).await),
    }
}

/// List comments query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    pub post_id: String,
}

/// List a post's comments, oldest first.
async fn list(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListCommentsQuery>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list(caller.as_ref(), &query.post_id)
        .await?;

    Ok(ApiResponse::ok(
        comments.into_iter().map(Into::into).collect(),
    ))
}

/// Delete a comment (author or admin).
async fn delete_comment(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&caller, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", delete(delete_comment))
}
