//! Redis Pub/Sub for cross-instance event distribution.
//!
//! Change events are serialized to JSON on a small set of channels; every
//! instance bridges inbound messages into its local [`FanoutBus`], so a
//! mutation on one instance invalidates subscribers everywhere.

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use nagare_common::AppResult;
use nagare_core::services::EventPublisher;
use tracing::{debug, info, warn};

use crate::fanout::{ChangeEvent, ChangeOp, EntityKind, FanoutBus, Topic};

/// Wire channel names under an instance prefix.
///
/// `posts` carries post lifecycle and aggregate changes (comments,
/// reactions); `reports` carries report queue changes.
#[must_use]
pub fn channel_names(prefix: &str) -> (String, String) {
    (format!("{prefix}:posts"), format!("{prefix}:reports"))
}

/// Local topics an inbound event fans out to.
#[must_use]
pub fn topics_for(event: &ChangeEvent) -> Vec<Topic> {
    match (event.entity, event.op) {
        // A submission only concerns the pending queue.
        (EntityKind::Post, ChangeOp::Created) => vec![Topic::PendingPosts],
        // An approval leaves the pending queue and enters the feed.
        (EntityKind::Post, ChangeOp::Approved) => vec![
            Topic::ApprovedPosts,
            Topic::PendingPosts,
            Topic::Post(event.id.clone()),
        ],
        (EntityKind::Post, ChangeOp::Rejected) => {
            vec![Topic::PendingPosts, Topic::Post(event.id.clone())]
        }
        (EntityKind::Post, ChangeOp::Deleted) => {
            vec![Topic::ApprovedPosts, Topic::Post(event.id.clone())]
        }
        // Comment and reaction changes invalidate just the affected post.
        (EntityKind::Comment | EntityKind::Reaction, _) => event
            .post_id
            .clone()
            .map(Topic::Post)
            .into_iter()
            .collect(),
        (EntityKind::Report, _) => vec![Topic::Reports],
        _ => Vec::new(),
    }
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    bus: FanoutBus,
    posts_channel: String,
    reports_channel: String,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager bridging into a local bus.
    ///
    /// `prefix` namespaces the wire channels so instances of different
    /// deployments can share one Redis.
    pub async fn new(redis_url: &str, prefix: &str, bus: FanoutBus) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        info!("Redis Pub/Sub initialized");

        let (posts_channel, reports_channel) = channel_names(prefix);

        Ok(Self {
            publisher,
            subscriber,
            bus,
            posts_channel,
            reports_channel,
        })
    }

    /// Subscribe to the standard channels and start the bridge loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.subscribe(self.posts_channel.clone()).await?;
        self.subscriber
            .subscribe(self.reports_channel.clone())
            .await?;

        info!("Subscribed to Redis Pub/Sub channels");

        let bus = self.bus.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<ChangeEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "Received Pub/Sub event");
                            for topic in topics_for(&event) {
                                bus.publish(&topic, event.clone()).await;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event to a channel.
    pub async fn publish(&self, channel: &str, event: &ChangeEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self.publisher.publish(channel, payload).await?;
        debug!(channel, ?event, "Published Pub/Sub event");
        Ok(())
    }

    async fn publish_post_event(&self, event: ChangeEvent) -> AppResult<()> {
        self.publish(&self.posts_channel, &event)
            .await
            .map_err(|e| nagare_common::AppError::Redis(e.to_string()))
    }

    async fn publish_report_event(&self, event: ChangeEvent) -> AppResult<()> {
        self.publish(&self.reports_channel, &event)
            .await
            .map_err(|e| nagare_common::AppError::Redis(e.to_string()))
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_post_submitted(&self, post_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Post,
            id: post_id.to_string(),
            op: ChangeOp::Created,
            post_id: None,
        })
        .await
    }

    async fn publish_post_approved(&self, post_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Post,
            id: post_id.to_string(),
            op: ChangeOp::Approved,
            post_id: None,
        })
        .await
    }

    async fn publish_post_rejected(&self, post_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Post,
            id: post_id.to_string(),
            op: ChangeOp::Rejected,
            post_id: None,
        })
        .await
    }

    async fn publish_post_deleted(&self, post_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Post,
            id: post_id.to_string(),
            op: ChangeOp::Deleted,
            post_id: None,
        })
        .await
    }

    async fn publish_comment_created(&self, post_id: &str, comment_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Comment,
            id: comment_id.to_string(),
            op: ChangeOp::Created,
            post_id: Some(post_id.to_string()),
        })
        .await
    }

    async fn publish_comment_deleted(&self, post_id: &str, comment_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Comment,
            id: comment_id.to_string(),
            op: ChangeOp::Deleted,
            post_id: Some(post_id.to_string()),
        })
        .await
    }

    async fn publish_post_reaction(&self, post_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Reaction,
            id: post_id.to_string(),
            op: ChangeOp::Updated,
            post_id: Some(post_id.to_string()),
        })
        .await
    }

    async fn publish_comment_reaction(&self, post_id: &str, comment_id: &str) -> AppResult<()> {
        self.publish_post_event(ChangeEvent {
            entity: EntityKind::Reaction,
            id: comment_id.to_string(),
            op: ChangeOp::Updated,
            post_id: Some(post_id.to_string()),
        })
        .await
    }

    async fn publish_report_filed(&self, report_id: &str) -> AppResult<()> {
        self.publish_report_event(ChangeEvent {
            entity: EntityKind::Report,
            id: report_id.to_string(),
            op: ChangeOp::Created,
            post_id: None,
        })
        .await
    }

    async fn publish_report_resolved(&self, report_id: &str) -> AppResult<()> {
        self.publish_report_event(ChangeEvent {
            entity: EntityKind::Report,
            id: report_id.to_string(),
            op: ChangeOp::Resolved,
            post_id: None,
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_use_prefix() {
        let (posts, reports) = channel_names("nagare");
        assert_eq!(posts, "nagare:posts");
        assert_eq!(reports, "nagare:reports");
    }

    #[test]
    fn test_change_event_serialization() {
        let event = ChangeEvent {
            entity: EntityKind::Post,
            id: "p1".to_string(),
            op: ChangeOp::Approved,
            post_id: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"entity\":\"post\""));
        assert!(json.contains("\"op\":\"approved\""));
        assert!(!json.contains("post_id"));

        let parsed: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_approval_fans_out_to_feed_queue_and_post() {
        let event = ChangeEvent {
            entity: EntityKind::Post,
            id: "p1".to_string(),
            op: ChangeOp::Approved,
            post_id: None,
        };

        let topics = topics_for(&event);

        assert!(topics.contains(&Topic::ApprovedPosts));
        assert!(topics.contains(&Topic::PendingPosts));
        assert!(topics.contains(&Topic::Post("p1".to_string())));
    }

    #[test]
    fn test_reaction_scopes_to_one_post() {
        let event = ChangeEvent {
            entity: EntityKind::Reaction,
            id: "p1".to_string(),
            op: ChangeOp::Updated,
            post_id: Some("p1".to_string()),
        };

        assert_eq!(topics_for(&event), vec![Topic::Post("p1".to_string())]);
    }

    #[test]
    fn test_report_routes_to_reports_topic() {
        let event = ChangeEvent {
            entity: EntityKind::Report,
            id: "rep1".to_string(),
            op: ChangeOp::Created,
            post_id: None,
        };

        assert_eq!(topics_for(&event), vec![Topic::Reports]);
    }

    #[test]
    fn test_submission_routes_to_pending_only() {
        let event = ChangeEvent {
            entity: EntityKind::Post,
            id: "p1".to_string(),
            op: ChangeOp::Created,
            post_id: None,
        };

        assert_eq!(topics_for(&event), vec![Topic::PendingPosts]);
    }
}
