//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The post this comment belongs to (immutable)
    #[sea_orm(indexed)]
    pub post_id: String,

    /// Parent comment for replies; replies cannot be nested further
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Author's username at write time (denormalized)
    pub author_username: String,

    /// Author's avatar URL at write time (denormalized)
    #[sea_orm(nullable)]
    pub author_avatar: Option<String>,

    /// Comment body text
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Like count (comments have no dislikes)
    #[sea_orm(default_value = 0)]
    pub likes: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
