//! Moderation service.
//!
//! Approve/reject decisions and the report queue. Every transition is a
//! compare-and-swap at the store: the status filter rides along with the
//! `UPDATE`, so of two racing moderators exactly one wins and the loser
//! gets a `Conflict`.

use std::time::Duration;

use crate::services::event_publisher::EventPublisherService;
use crate::services::post::PostService;
use nagare_common::{AppError, AppResult, IdGenerator, Identity, with_deadline};
use nagare_db::{
    entities::{
        post::{self, PostStatus},
        report::{self, ReportStatus},
    },
    repositories::{CommentRepository, PostRepository, ReactionTarget, ReportRepository},
};
use sea_orm::Set;

/// Maximum report reason length in characters.
const MAX_REASON_LEN: usize = 2000;

/// Moderation service for business logic.
#[derive(Clone)]
pub struct ModerationService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    report_repo: ReportRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
    op_deadline: Duration,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        report_repo: ReportRepository,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            report_repo,
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

    /// Approve a pending post.
    pub async fn approve(&self, admin: &Identity, post_id: &str) -> AppResult<()> {
        self.transition(admin, post_id, PostStatus::Approved).await
    }

    /// Reject a pending post.
    pub async fn reject(&self, admin: &Identity, post_id: &str) -> AppResult<()> {
        self.transition(admin, post_id, PostStatus::Rejected).await
    }

    async fn transition(&self, admin: &Identity, post_id: &str, to: PostStatus) -> AppResult<()> {
        require_admin(admin)?;

        let post = self
            .post_repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        if post.status != PostStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Post {post_id} is not pending"
            )));
        }

        let rows = with_deadline(
            self.op_deadline,
            self.post_repo.transition_from_pending(post_id, to),
        )
        .await?;

        // The post was pending a moment ago; zero rows means another
        // moderator got there first.
        if rows == 0 {
            return Err(AppError::Conflict(format!(
                "Post {post_id} was moderated concurrently"
            )));
        }

        if let Some(ref event_publisher) = self.event_publisher {
            let publish = match to {
                PostStatus::Approved => event_publisher.publish_post_approved(post_id).await,
                _ => event_publisher.publish_post_rejected(post_id).await,
            };
            if let Err(e) = publish {
                tracing::warn!(error = %e, "Failed to publish moderation event");
            }
        }

        Ok(())
    }

    /// Get the pending moderation queue, oldest first.
    pub async fn pending_queue(
        &self,
        admin: &Identity,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        require_admin(admin)?;
        self.post_repo.pending_queue(limit, offset).await
    }

    /// Count pending posts (admin badge).
    pub async fn pending_count(&self, admin: &Identity) -> AppResult<u64> {
        require_admin(admin)?;
        self.post_repo.count_pending().await
    }

    /// File a report against a post or comment.
    pub async fn file_report(
        &self,
        reporter: &Identity,
        target: ReactionTarget,
        reason: &str,
    ) -> AppResult<report::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Report reason is empty".to_string()));
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(AppError::Validation(format!(
                "Report reason exceeds {MAX_REASON_LEN} characters"
            )));
        }

        // The target must exist and be visible to the reporter.
        let (post_id, comment_id) = match &target {
            ReactionTarget::Post(post_id) => {
                let post = self
                    .post_repo
                    .find_by_id(post_id)
                    .await?
                    .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;
                if !PostService::visible_to(&post, Some(reporter)) {
                    return Err(AppError::PostNotFound(post_id.to_string()));
                }
                (Some(post_id.clone()), None)
            }
            ReactionTarget::Comment(comment_id) => {
                self.comment_repo
                    .find_by_id(comment_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;
                (None, Some(comment_id.clone()))
            }
        };

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter.id.clone()),
            post_id: Set(post_id),
            comment_id: Set(comment_id),
            reason: Set(reason.to_string()),
            status: Set(ReportStatus::Pending),
            resolved_by: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            resolved_at: Set(None),
        };

        let created = with_deadline(self.op_deadline, self.report_repo.create(model)).await?;

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish_report_filed(&created.id).await {
                tracing::warn!(error = %e, "Failed to publish report filed event");
            }
        }

        Ok(created)
    }

    /// Resolve a pending report.
    pub async fn resolve_report(&self, admin: &Identity, report_id: &str) -> AppResult<()> {
        require_admin(admin)?;

        let report = self.report_repo.get(report_id).await?;

        if report.status != ReportStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Report {report_id} is not pending"
            )));
        }

        let rows = with_deadline(
            self.op_deadline,
            self.report_repo.resolve(report_id, &admin.id),
        )
        .await?;

        if rows == 0 {
            return Err(AppError::Conflict(format!(
                "Report {report_id} was resolved concurrently"
            )));
        }

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish_report_resolved(report_id).await {
                tracing::warn!(error = %e, "Failed to publish report resolved event");
            }
        }

        Ok(())
    }

    /// Get pending reports, newest first.
    pub async fn reports_queue(
        &self,
        admin: &Identity,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        require_admin(admin)?;
        self.report_repo.pending_queue(limit, offset).await
    }
}

fn require_admin(caller: &Identity) -> AppResult<()> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin privilege required".to_string()))
    }
}
