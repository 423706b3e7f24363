//! Reaction service.

use std::time::Duration;

use crate::services::event_publisher::EventPublisherService;
use crate::services::post::PostService;
use nagare_common::{AppError, AppResult, IdGenerator, Identity, with_deadline};
use nagare_db::{
    entities::reaction::ReactionKind,
    repositories::{CommentRepository, PostRepository, ReactionRepository, ReactionTarget},
};
use serde::Serialize;

/// The caller-visible result of a toggle: their reaction after the call
/// plus the target's recomputed counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionState {
    /// The caller's reaction after the toggle (`None` after un-reacting).
    pub reaction: Option<ReactionKind>,
    /// Recomputed like count for the target.
    pub likes: i32,
    /// Recomputed dislike count for the target (always 0 for comments).
    pub dislikes: i32,
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
    op_deadline: Duration,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub fn new(
        reaction_repo: ReactionRepository,
        post_repo: PostRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            reaction_repo,
            post_repo,
            comment_repo,
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

    /// Toggle the caller's reaction on a target.
    ///
    /// Same kind twice un-reacts; the opposite kind replaces. The counter
    /// swap happens inside one store transaction, so no reader ever
    /// observes a half-applied toggle.
    pub async fn toggle(
        &self,
        reactor: &Identity,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> AppResult<ReactionState> {
        // Visibility first: an invisible target reads as missing.
        let post_id = match &target {
            ReactionTarget::Post(post_id) => {
                let post = self
                    .post_repo
                    .find_by_id(post_id)
                    .await?
                    .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;
                if !PostService::visible_to(&post, Some(reactor)) {
                    return Err(AppError::PostNotFound(post_id.to_string()));
                }
                post.id
            }
            ReactionTarget::Comment(comment_id) => {
                if kind == ReactionKind::Dislike {
                    return Err(AppError::Validation(
                        "Comments only support likes".to_string(),
                    ));
                }
                let comment = self
                    .comment_repo
                    .find_by_id(comment_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;
                let post = self
                    .post_repo
                    .find_by_id(&comment.post_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;
                if !PostService::visible_to(&post, Some(reactor)) {
                    return Err(AppError::NotFound(format!("Comment {comment_id} not found")));
                }
                post.id
            }
        };

        let reaction_id = self.id_gen.generate();
        let outcome = with_deadline(
            self.op_deadline,
            self.reaction_repo
                .toggle(&reaction_id, &reactor.id, &target, kind),
        )
        .await?;

        if let Some(ref event_publisher) = self.event_publisher {
            let publish = match &target {
                ReactionTarget::Post(_) => event_publisher.publish_post_reaction(&post_id).await,
                ReactionTarget::Comment(comment_id) => {
                    event_publisher
                        .publish_comment_reaction(&post_id, comment_id)
                        .await
                }
            };
            if let Err(e) = publish {
                tracing::warn!(error = %e, "Failed to publish reaction event");
            }
        }

        Ok(ReactionState {
            reaction: outcome.kind,
            likes: outcome.likes,
            dislikes: outcome.dislikes,
        })
    }

    /// The caller's current reaction on a post, if any.
    pub async fn current_on_post(
        &self,
        reactor: &Identity,
        post_id: &str,
    ) -> AppResult<Option<ReactionKind>> {
        Ok(self
            .reaction_repo
            .find_on_post(&reactor.id, post_id)
            .await?
            .map(|r| r.kind))
    }

    /// The caller's current reaction on a comment, if any.
    pub async fn current_on_comment(
        &self,
        reactor: &Identity,
        comment_id: &str,
    ) -> AppResult<Option<ReactionKind>> {
        Ok(self
            .reaction_repo
            .find_on_comment(&reactor.id, comment_id)
            .await?
            .map(|r| r.kind))
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

    fn service(
        reaction_db: sea_orm::DatabaseConnection,
        post_db: sea_orm::DatabaseConnection,
        comment_db: sea_orm::DatabaseConnection,
    ) -> ReactionService {
        ReactionService::new(
            ReactionRepository::new(Arc::new(reaction_db)),
            PostRepository::new(Arc::new(post_db)),
            CommentRepository::new(Arc::new(comment_db)),
        )
    }

    #[tokio::test]
    async fn test_toggle_missing_post() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let reactor = Identity::plain("user_a", "a");

        let result = service
            .toggle(
                &reactor,
                ReactionTarget::Post("missing".to_string()),
                ReactionKind::Like,
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_pending_post_invisible_to_stranger() {
        let post = create_test_post("p1", "user_other", PostStatus::Pending);

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let reactor = Identity::plain("user_a", "a");

        let result = service
            .toggle(
                &reactor,
                ReactionTarget::Post("p1".to_string()),
                ReactionKind::Like,
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_toggle_dislike_on_comment_rejected() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );
        let reactor = Identity::plain("user_a", "a");

        let result = service
            .toggle(
                &reactor,
                ReactionTarget::Comment("c1".to_string()),
                ReactionKind::Dislike,
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
