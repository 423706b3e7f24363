//! In-process fan-out bus.
//!
//! One `tokio::sync::broadcast` channel per topic. Publishing never
//! blocks: a lagging subscriber sees `Lagged` and re-fetches, a dropped
//! receiver is simply skipped. Subscribers on the same topic are fully
//! independent of each other.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

/// Default per-topic channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// The entity a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Post,
    Comment,
    Reaction,
    Report,
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
    Approved,
    Rejected,
    Resolved,
}

/// A change notification.
///
/// The payload is a hint, not a source of truth: consumers re-fetch the
/// affected aggregate, so duplicates and coalesced deliveries are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Entity type that changed.
    pub entity: EntityKind,
    /// ID of the changed entity.
    pub id: String,
    /// What happened.
    pub op: ChangeOp,
    /// The post this change rolls up to, for scoped invalidation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
}

/// A feed a consumer can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The public approved-posts feed.
    ApprovedPosts,
    /// The admin pending queue.
    PendingPosts,
    /// The admin reports queue.
    Reports,
    /// A single post's aggregate (comments, reactions).
    Post(String),
}

impl Topic {
    /// Stable map key for this topic.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::ApprovedPosts => "posts:approved".to_string(),
            Self::PendingPosts => "posts:pending".to_string(),
            Self::Reports => "reports".to_string(),
            Self::Post(id) => format!("post:{id}"),
        }
    }
}

/// Per-topic broadcast channels.
#[derive(Clone)]
pub struct FanoutBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
    capacity: usize,
}

impl FanoutBus {
    /// Create a new fan-out bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new fan-out bus with a custom per-topic capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to a topic. Each receiver gets every event published
    /// after this call, independently of all other receivers.
    pub async fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<ChangeEvent> {
        let key = topic.key();

        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&key) {
                return sender.subscribe();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to a topic. Never blocks; returns the number of
    /// receivers the event reached.
    pub async fn publish(&self, topic: &Topic, event: ChangeEvent) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&topic.key())
            .map_or(0, |sender| sender.send(event).unwrap_or(0))
    }

    /// Prune topics with no live receivers.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Number of topics with at least one channel allocated.
    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for FanoutBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn approved_event(id: &str) -> ChangeEvent {
        ChangeEvent {
            entity: EntityKind::Post,
            id: id.to_string(),
            op: ChangeOp::Approved,
            post_id: None,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = FanoutBus::new();
        let mut rx1 = bus.subscribe(&Topic::ApprovedPosts).await;
        let mut rx2 = bus.subscribe(&Topic::ApprovedPosts).await;

        let reached = bus.publish(&Topic::ApprovedPosts, approved_event("p1")).await;

        assert_eq!(reached, 2);
        assert_eq!(rx1.recv().await.unwrap().id, "p1");
        assert_eq!(rx2.recv().await.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = FanoutBus::new();
        let mut posts_rx = bus.subscribe(&Topic::ApprovedPosts).await;
        let mut reports_rx = bus.subscribe(&Topic::Reports).await;

        bus.publish(&Topic::ApprovedPosts, approved_event("p1")).await;

        assert_eq!(posts_rx.recv().await.unwrap().id, "p1");
        assert!(matches!(reports_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_affect_others() {
        let bus = FanoutBus::new();
        let rx_dropped = bus.subscribe(&Topic::ApprovedPosts).await;
        let mut rx_live = bus.subscribe(&Topic::ApprovedPosts).await;

        drop(rx_dropped);

        let reached = bus.publish(&Topic::ApprovedPosts, approved_event("p1")).await;

        assert_eq!(reached, 1);
        assert_eq!(rx_live.recv().await.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_lagged_subscriber_sees_lagged_then_catches_up() {
        let bus = FanoutBus::with_capacity(2);
        let mut rx = bus.subscribe(&Topic::ApprovedPosts).await;

        for i in 0..4 {
            bus.publish(&Topic::ApprovedPosts, approved_event(&format!("p{i}")))
                .await;
        }

        // The two oldest events were overwritten; the receiver learns it
        // lagged and then reads what is still buffered.
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().id, "p2");
        assert_eq!(rx.recv().await.unwrap().id, "p3");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = FanoutBus::new();
        let reached = bus.publish(&Topic::Post("p1".to_string()), approved_event("p1")).await;
        assert_eq!(reached, 0);
    }

    #[tokio::test]
    async fn test_cleanup_prunes_dead_topics() {
        let bus = FanoutBus::new();
        let rx = bus.subscribe(&Topic::Post("p1".to_string())).await;
        let _live = bus.subscribe(&Topic::ApprovedPosts).await;

        drop(rx);
        bus.cleanup().await;

        assert_eq!(bus.topic_count().await, 1);
    }
}
