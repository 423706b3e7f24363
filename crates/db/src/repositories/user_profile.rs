//! User profile repository.

use std::sync::Arc;

use crate::entities::{UserProfile, user_profile};
use nagare_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// User profile repository for database operations.
#[derive(Clone)]
pub struct UserProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl UserProfileRepository {
    /// Create a new user profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by user ID.
    pub async fn find_by_id(&self, user_id: &str) -> AppResult<Option<user_profile::Model>> {
        UserProfile::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a profile if none exists yet (idempotent bootstrap).
    ///
    /// Concurrent bootstrap attempts for the same identity race on the
    /// primary key; the loser's insert is a no-op.
    pub async fn ensure(&self, model: user_profile::ActiveModel) -> AppResult<()> {
        UserProfile::insert(model)
            .on_conflict(
                OnConflict::column(user_profile::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Update the display fields of a profile.
    pub async fn update_display(
        &self,
        user_id: &str,
        username: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AppResult<u64> {
        let mut update = UserProfile::update_many();

        if let Some(username) = username {
            update = update.col_expr(
                user_profile::Column::Username,
                Expr::value(username.to_string()),
            );
        }
        if let Some(avatar_url) = avatar_url {
            update = update.col_expr(
                user_profile::Column::AvatarUrl,
                Expr::value(Some(avatar_url.to_string())),
            );
        }

        let result = update
            .filter(user_profile::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
