//! Fan-out bus, Redis Pub/Sub transport, and the offline write-intent
//! journal for nagare.

pub mod fanout;
pub mod offline;
pub mod pubsub;
pub mod retry;

pub use fanout::{ChangeEvent, ChangeOp, EntityKind, FanoutBus, Topic};
pub use offline::{
    DrainReport, IntentTarget, OfflineJournal, QueuedWrite, WriteIntent, is_transient,
};
pub use pubsub::RedisPubSub;
pub use retry::RetryConfig;
