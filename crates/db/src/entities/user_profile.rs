//! User profile entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profile")]
pub struct Model {
    /// Identity-provider-derived user ID (`user_{username}`).
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Display username.
    pub username: String,

    /// Avatar URL.
    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Admin privilege flag. The only source of privilege in the system.
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// When the profile row was first created.
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
