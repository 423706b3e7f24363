//! Admin key entity (single-use privilege grant tokens).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_key")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The opaque redemption code.
    #[sea_orm(unique)]
    pub code: String,

    /// A key transitions `false -> true` exactly once.
    #[sea_orm(default_value = false)]
    pub is_used: bool,

    /// The user who redeemed the key.
    #[sea_orm(nullable)]
    pub used_by: Option<String>,

    /// When the key was redeemed.
    #[sea_orm(nullable)]
    pub used_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
