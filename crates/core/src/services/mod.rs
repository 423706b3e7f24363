//! Business logic services.

pub mod comment;
pub mod event_publisher;
pub mod moderation;
pub mod post;
pub mod profile;
pub mod reaction;

pub use comment::CommentService;
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use moderation::ModerationService;
pub use post::{NewPost, PostService};
pub use profile::ProfileService;
pub use reaction::{ReactionService, ReactionState};
