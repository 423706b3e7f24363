//! Comment service.

use std::time::Duration;

use crate::services::event_publisher::EventPublisherService;
use crate::services::post::PostService;
use nagare_common::{AppError, AppResult, IdGenerator, Identity, with_deadline};
use nagare_db::{
    entities::comment,
    repositories::{CommentRepository, PostRepository},
};
use sea_orm::Set;

/// Maximum comment body length in characters.
const MAX_CONTENT_LEN: usize = 2000;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
    op_deadline: Duration,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(comment_repo: CommentRepository, post_repo: PostRepository) -> Self {
        Self {
            comment_repo,
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

    /// Create a comment on a post.
    ///
    /// Nesting is bounded to two levels: a reply's parent must itself be a
    /// top-level comment on the same post.
    pub async fn create(
        &self,
        author: &Identity,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> AppResult<comment::Model> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment content is empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(AppError::Validation(format!(
                "Comment content exceeds {MAX_CONTENT_LEN} characters"
            )));
        }

        let post = self
            .post_repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        if !PostService::visible_to(&post, Some(author)) {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        if let Some(parent_id) = parent_id {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Comment {parent_id} not found")))?;

            if parent.post_id != post_id {
                return Err(AppError::Validation(
                    "Parent comment belongs to a different post".to_string(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::Validation(
                    "Replies cannot be nested further".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            parent_id: Set(parent_id.map(ToString::to_string)),
            author_id: Set(author.id.clone()),
            author_username: Set(author.username.clone()),
            author_avatar: Set(if author.avatar_url.is_empty() {
                None
            } else {
                Some(author.avatar_url.clone())
            }),
            content: Set(content.to_string()),
            likes: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = with_deadline(self.op_deadline, self.comment_repo.create(model)).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher
                .publish_comment_created(post_id, &created.id)
                .await
            {
                tracing::warn!(error = %e, "Failed to publish comment created event");
            }
        }

        Ok(created)
    }

    /// List all comments on a post, oldest first.
    pub async fn list(
        &self,
        viewer: Option<&Identity>,
        post_id: &str,
    ) -> AppResult<Vec<comment::Model>> {
        let post = self
            .post_repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        if !PostService::visible_to(&post, viewer) {
            return Err(AppError::PostNotFound(post_id.to_string()));
        }

        self.comment_repo.find_by_post(post_id).await
    }

    /// Delete a comment. Allowed for the author and admins.
    pub async fn delete(&self, caller: &Identity, comment_id: &str) -> AppResult<()> {
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;

        if comment.author_id != caller.id && !caller.is_admin {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete a comment".to_string(),
            ));
        }

        with_deadline(self.op_deadline, self.comment_repo.delete(comment_id)).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher
                .publish_comment_deleted(&comment.post_id, comment_id)
                .await
            {
                tracing::warn!(error = %e, "Failed to publish comment deleted event");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nagare_db::entities::post::{self, Category, PostStatus};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_post(id: &str, author_id: &str, status: PostStatus) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            author_username: "author".to_string(),
            author_avatar: None,
            content: "post body".to_string(),
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

    fn create_test_comment(id: &str, post_id: &str, parent_id: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            parent_id: parent_id.map(ToString::to_string),
            author_id: "user_a".to_string(),
            author_username: "a".to_string(),
            author_avatar: None,
            content: "nice".to_string(),
            likes: 0,
            created_at: Utc::now().into(),
        }
    }

    fn service(
        comment_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
    ) -> CommentService {
        CommentService::new(
            CommentRepository::new(Arc::new(comment_db)),
            PostRepository::new(Arc::new(post_db)),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let result = service.create(&author, "p1", "  ", None).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_on_invisible_post() {
        let post = create_test_post("p1", "user_other", PostStatus::Pending);

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let result = service.create(&author, "p1", "hi", None).await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_nested_reply() {
        let post = create_test_post("p1", "user_other", PostStatus::Approved);
        let reply = create_test_comment("c2", "p1", Some("c1"));

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[reply]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let result = service.create(&author, "p1", "hi", Some("c2")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_parent_from_other_post() {
        let post = create_test_post("p1", "user_other", PostStatus::Approved);
        let parent = create_test_comment("c1", "p2", None);

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[parent]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let result = service.create(&author, "p1", "hi", Some("c1")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_reply_to_top_level() {
        let post = create_test_post("p1", "user_other", PostStatus::Approved);
        let parent = create_test_comment("c1", "p1", None);
        let created = create_test_comment("c2", "p1", Some("c1"));

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[parent]])
                .append_query_results([[created]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );
        let author = Identity::plain("user_a", "a");

        let result = service.create(&author, "p1", "hi", Some("c1")).await.unwrap();

        assert_eq!(result.parent_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_delete_forbidden_for_stranger() {
        let comment = create_test_comment("c1", "p1", None);

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let caller = Identity::plain("user_b", "b");

        let result = service.delete(&caller, "c1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
