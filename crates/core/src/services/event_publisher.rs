//! Event publisher service.
//!
//! Provides an abstraction for publishing change notifications.
//! The actual implementation is provided by the queue crate (Redis Pub/Sub
//! bridged into the local fan-out bus).
//!
//! Every event is a hint, never a payload: subscribers re-fetch the
//! affected aggregate, so a coalesced or duplicated delivery is harmless.

use async_trait::async_trait;
use nagare_common::AppResult;
use std::sync::Arc;

/// Trait for publishing change notifications.
///
/// This allows the core services to publish events without directly
/// depending on the queue/pubsub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// A post was submitted (enters the pending queue).
    async fn publish_post_submitted(&self, post_id: &str) -> AppResult<()>;

    /// A pending post was approved (enters the approved feed).
    async fn publish_post_approved(&self, post_id: &str) -> AppResult<()>;

    /// A pending post was rejected.
    async fn publish_post_rejected(&self, post_id: &str) -> AppResult<()>;

    /// A post was removed by its author or an admin.
    async fn publish_post_deleted(&self, post_id: &str) -> AppResult<()>;

    /// A comment was added to a post.
    async fn publish_comment_created(&self, post_id: &str, comment_id: &str) -> AppResult<()>;

    /// A comment was removed.
    async fn publish_comment_deleted(&self, post_id: &str, comment_id: &str) -> AppResult<()>;

    /// A reaction was toggled on a post.
    async fn publish_post_reaction(&self, post_id: &str) -> AppResult<()>;

    /// A reaction was toggled on a comment.
    async fn publish_comment_reaction(&self, post_id: &str, comment_id: &str) -> AppResult<()>;

    /// A report was filed.
    async fn publish_report_filed(&self, report_id: &str) -> AppResult<()>;

    /// A report was resolved.
    async fn publish_report_resolved(&self, report_id: &str) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_post_submitted(&self, _post_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_post_approved(&self, _post_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_post_rejected(&self, _post_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_post_deleted(&self, _post_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_comment_created(&self, _post_id: &str, _comment_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_comment_deleted(&self, _post_id: &str, _comment_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_post_reaction(&self, _post_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_comment_reaction(&self, _post_id: &str, _comment_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_report_filed(&self, _report_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_report_resolved(&self, _report_id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
