//! Post endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use nagare_common::AppResult;
use nagare_core::NewPost;
use nagare_db::entities::post::{Category, PostStatus};
use nagare_queue::WriteIntent;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Post response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub category: Category,
    pub likes: i32,
    pub dislikes: i32,
    pub status: PostStatus,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<nagare_db::entities::post::Model> for PostResponse {
    fn from(p: nagare_db::entities::post::Model) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            author_username: p.author_username,
            author_avatar: p.author_avatar,
            content: p.content,
            image_url: p.image_url,
            link_url: p.link_url,
            category: p.category,
            likes: p.likes,
            dislikes: p.dislikes,
            status: p.status,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Approved feed query. `limit` falls back to the configured page size.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

/// Get the approved feed, newest first.
async fn feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let limit = query.limit.unwrap_or(state.feed_page_size).min(100);
    let posts = state
        .post_service
        .approved_feed(limit, query.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(posts.into_iter().map(Into::into).collect()))
}

/// Create post request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
}

/// Submit a new post. It enters the pending queue; if the store is
/// unreachable the submission is held in the offline journal instead.
async fn create(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<PostResponse>> {
    let intent = WriteIntent::SubmitPost {
        content: req.content.clone(),
        category: req.category.as_str().to_string(),
        image_url: req.image_url.clone(),
        link_url: req.link_url.clone(),
    };

    let result = async {
        state.profile_service.ensure_profile(&caller).await?;
        state
            .post_service
            .submit(
                &caller,
                NewPost {
                    content: req.content,
                    category: req.category,
                    image_url: req.image_url,
                    link_url: req.link_url,
                },
            )
            .await
    }
    .await;

    match result {
        Ok(post) => Ok(ApiResponse::ok(post.into())),
        Err(e) => Err(state.capture_failed_write(&caller, intent, e).await),
    }
}

/// Get a single post, applying visibility rules.
async fn get_post(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.get(caller.as_ref(), &id).await?;
    Ok(ApiResponse::ok(post.into()))
}

/// Delete a post (author or admin).
async fn delete_post(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.post_service.delete(&caller, &id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed).post(create))
        .route("/{id}", get(get_post).delete(delete_post))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_post_response_is_camel_case() {
        let response = PostResponse {
            id: "p1".to_string(),
            author_id: "user_a".to_string(),
            author_username: "a".to_string(),
            author_avatar: None,
            content: "hello".to_string(),
            image_url: None,
            link_url: None,
            category: Category::Discussion,
            likes: 1,
            dislikes: 0,
            status: PostStatus::Approved,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"authorUsername\":\"a\""));
        assert!(json.contains("\"category\":\"discussion\""));
        assert!(json.contains("\"status\":\"approved\""));
    }

    #[test]
    fn test_create_request_parses() {
        let req: CreatePostRequest = serde_json::from_str(
            r#"{"content":"hi","category":"fanart","imageUrl":"https://example.com/a.png"}"#,
        )
        .unwrap();

        assert_eq!(req.category, Category::Fanart);
        assert_eq!(req.image_url.as_deref(), Some("https://example.com/a.png"));
        assert!(req.link_url.is_none());
    }

    #[test]
    fn test_feed_query_defaults() {
        let query: FeedQuery = serde_json::from_str("{}").unwrap();
        assert!(query.limit.is_none());
        assert!(query.until_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_submit_lands_in_journal() {
        use nagare_common::Identity;
        use sea_orm::{DatabaseBackend, DbErr, MockDatabase, RuntimeErr};

        use crate::middleware::testing::state_over;

        // First store touch (the profile bootstrap insert) fails hard.
        let state = state_over(MockDatabase::new(DatabaseBackend::Postgres).append_exec_errors(
            [DbErr::Conn(RuntimeErr::Internal(
                "connection refused".to_string(),
            ))],
        ));
        let caller = Identity::plain("user_a", "a");

        let result = create(
            AuthUser(caller),
            State(state.clone()),
            Json(CreatePostRequest {
                content: "held for later".to_string(),
                category: Category::News,
                image_url: None,
                link_url: None,
            }),
        )
        .await;
        assert!(result.is_err());

        let entries = state.journal.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, "user_a");
        assert_eq!(
            entries[0].intent,
            WriteIntent::SubmitPost {
                content: "held for later".to_string(),
                category: "news".to_string(),
                image_url: None,
                link_url: None,
            }
        );

        tokio::fs::remove_file(state.journal.path()).await.unwrap();
    }
}
