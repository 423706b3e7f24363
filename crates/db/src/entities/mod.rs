//! Database entities.

pub mod admin_key;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod report;
pub mod user_profile;

pub use admin_key::Entity as AdminKey;
pub use comment::Entity as Comment;
pub use post::Entity as Post;
pub use reaction::Entity as Reaction;
pub use report::Entity as Report;
pub use user_profile::Entity as UserProfile;
