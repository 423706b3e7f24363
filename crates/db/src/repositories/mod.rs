//! Database repositories.

pub mod admin_key;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod report;
pub mod user_profile;

pub use admin_key::AdminKeyRepository;
pub use comment::CommentRepository;
pub use post::PostRepository;
pub use reaction::{ReactionRepository, ReactionTarget, ToggleOutcome};
pub use report::ReportRepository;
pub use user_profile::UserProfileRepository;
