//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[sea_orm(string_value = "discussion")]
    Discussion,
    #[sea_orm(string_value = "news")]
    News,
    #[sea_orm(string_value = "fanart")]
    Fanart,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "question")]
    Question,
}

impl Category {
    /// The stored column value for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discussion => "discussion",
            Self::News => "news",
            Self::Fanart => "fanart",
            Self::Review => "review",
            Self::Question => "question",
        }
    }
}

/// Post moderation status.
///
/// `Pending` is the only state with outgoing transitions; `Approved` and
/// `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PostStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Author's username at submission time (denormalized)
    pub author_username: String,

    /// Author's avatar URL at submission time (denormalized)
    #[sea_orm(nullable)]
    pub author_avatar: Option<String>,

    /// Post body text
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Optional attached image URL
    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Optional external link URL
    #[sea_orm(nullable)]
    pub link_url: Option<String>,

    pub category: Category,

    /// Like count (recomputed from reaction rows)
    #[sea_orm(default_value = 0)]
    pub likes: i32,

    /// Dislike count (recomputed from reaction rows)
    #[sea_orm(default_value = 0)]
    pub dislikes: i32,

    pub status: PostStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,

    #[sea_orm(has_many = "super::reaction::Entity")]
    Reaction,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
