//! Post service.

use std::time::Duration;

use crate::services::event_publisher::EventPublisherService;
use nagare_common::{AppError, AppResult, IdGenerator, Identity, with_deadline};
use nagare_db::{
    entities::post::{self, Category, PostStatus},
    repositories::PostRepository,
};
use sea_orm::Set;

/// Maximum post body length in characters.
const MAX_CONTENT_LEN: usize = 5000;

/// Input for a new post submission.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Post body text.
    pub content: String,
    /// Post category.
    pub category: Category,
    /// Optional attached image URL.
    pub image_url: Option<String>,
    /// Optional external link URL.
    pub link_url: Option<String>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
    op_deadline: Duration,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(post_repo: PostRepository) -> Self {
        Self {
            post_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
            op_deadline: Duration::from_secs(10),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Set the per-call deadline for mutating operations.
    pub const fn set_op_deadline(&mut self, deadline: Duration) {
        self.op_deadline = deadline;
    }

    /// Whether a post is visible to a viewer.
    ///
    /// Approved posts are public; pending and rejected posts are visible
    /// only to their author and to admins. Callers translate "not visible"
    /// into not-found, never forbidden, so hidden rows do not leak.
    #[must_use]
    pub fn visible_to(post: &post::Model, viewer: Option<&Identity>) -> bool {
        post.status == PostStatus::Approved
            || viewer.is_some_and(|v| v.is_admin || v.id == post.author_id)
    }

    /// Submit a new post. Always enters the pending queue.
    pub async fn submit(&self, author: &Identity, input: NewPost) -> AppResult<post::Model> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Post content is empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(AppError::Validation(format!(
                "Post content exceeds {MAX_CONTENT_LEN} characters"
            )));
        }
        validate_optional_url("image_url", input.image_url.as_deref())?;
        validate_optional_url("link_url", input.link_url.as_deref())?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author.id.clone()),
            author_username: Set(author.username.clone()),
            author_avatar: Set(if author.avatar_url.is_empty() {
                None
            } else {
                Some(author.avatar_url.clone())
            }),
            content: Set(content.to_string()),
            image_url: Set(input.image_url),
            link_url: Set(input.link_url),
            category: Set(input.category),
            likes: Set(0),
            dislikes: Set(0),
            status: Set(PostStatus::Pending),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let created = with_deadline(self.op_deadline, self.post_repo.create(model)).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish_post_submitted(&created.id).await {
                tracing::warn!(error = %e, "Failed to publish post submitted event");
            }
        }

        Ok(created)
    }

    /// Get a post by ID, applying visibility rules.
    pub async fn get(&self, viewer: Option<&Identity>, id: &str) -> AppResult<post::Model> {
        let post = self
            .post_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))?;

        if !Self::visible_to(&post, viewer) {
            return Err(AppError::PostNotFound(id.to_string()));
        }

        Ok(post)
    }

    /// Get the approved feed, newest first (keyset pagination).
    pub async fn approved_feed(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo.approved_feed(limit, until_id).await
    }

    /// Delete a post. Allowed for the author and admins; comments and
    /// reactions go with it.
    pub async fn delete(&self, caller: &Identity, id: &str) -> AppResult<()> {
        let post = self
            .post_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))?;

        if post.author_id != caller.id && !caller.is_admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete a post".to_string(),
            ));
        }

        with_deadline(self.op_deadline, self.post_repo.delete(id)).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish_post_deleted(id).await {
                tracing::warn!(error = %e, "Failed to publish post deleted event");
            }
        }

        Ok(())
    }
}

fn validate_optional_url(field: &str, value: Option<&str>) -> AppResult<()> {
    if let Some(value) = value {
        url::Url::parse(value)
            .map_err(|_| AppError::Validation(format!("{field} is not a valid URL")))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_post(id: &str, author_id: &str, status: PostStatus) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            author_username: "author".to_string(),
            author_avatar: None,
            content: "hello world".to_string(),
            image_url: None,
            link_url: None,
            category: Category::Discussion,
            likes: 0,
            dislikes: 0,
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn new_post(content: &str) -> NewPost {
        NewPost {
            content: content.to_string(),
            category: Category::Discussion,
            image_url: None,
            link_url: None,
        }
    }

    fn service_with(db: sea_orm::DatabaseConnection) -> PostService {
        PostService::new(PostRepository::new(Arc::new(db)))
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_content() {
        let service =
            service_with(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let author = Identity::plain("user_a", "a");

        let result = service.submit(&author, new_post("   ")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_link_url() {
        let service =
            service_with(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let author = Identity::plain("user_a", "a");

        let mut input = new_post("hello");
        input.link_url = Some("not a url".to_string());
        let result = service.submit(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_creates_pending_post() {
        let created = create_test_post("p1", "user_a", PostStatus::Pending);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created]])
                .into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let post = service.submit(&author, new_post("hello world")).await.unwrap();

        assert_eq!(post.status, PostStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_hidden_post_as_stranger() {
        let post = create_test_post("p1", "user_a", PostStatus::Pending);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let viewer = Identity::plain("user_b", "b");
        let result = service.get(Some(&viewer), "p1").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_hidden_post_as_author() {
        let post = create_test_post("p1", "user_a", PostStatus::Pending);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let viewer = Identity::plain("user_a", "a");
        let result = service.get(Some(&viewer), "p1").await.unwrap();

        assert_eq!(result.id, "p1");
    }

    #[tokio::test]
    async fn test_get_rejected_post_as_admin() {
        let post = create_test_post("p1", "user_a", PostStatus::Rejected);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let viewer = Identity::admin("user_mod", "mod");
        let result = service.get(Some(&viewer), "p1").await.unwrap();

        assert_eq!(result.status, PostStatus::Rejected);
    }

    #[tokio::test]
    async fn test_delete_forbidden_for_stranger() {
        let post = create_test_post("p1", "user_a", PostStatus::Approved);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let caller = Identity::plain("user_b", "b");
        let result = service.delete(&caller, "p1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_admin() {
        let post = create_test_post("p1", "user_a", PostStatus::Approved);

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let caller = Identity::admin("user_mod", "mod");
        assert!(service.delete(&caller, "p1").await.is_ok());
    }
}
