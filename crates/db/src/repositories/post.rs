//! Post repository.

use std::sync::Arc;

use crate::entities::{
    Post,
    post::{self, PostStatus},
};
use nagare_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get approved posts, newest first (keyset pagination).
    pub async fn approved_feed(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::Status.eq(PostStatus::Approved))
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get pending posts for the moderation queue, oldest first.
    pub async fn pending_queue(&self, limit: u64, offset: u64) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::Status.eq(PostStatus::Pending))
            .order_by_asc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count pending posts.
    pub async fn count_pending(&self) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::Status.eq(PostStatus::Pending))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition a pending post to a terminal status.
    ///
    /// The status check is part of the `UPDATE` itself (compare-and-swap),
    /// so two concurrent moderators cannot both win. Returns the number of
    /// rows changed: `0` means the post was no longer pending.
    pub async fn transition_from_pending(&self, id: &str, to: PostStatus) -> AppResult<u64> {
        let result = Post::update_many()
            .col_expr(post::Column::Status, Expr::value(to))
            .col_expr(
                post::Column::UpdatedAt,
                Expr::value(chrono::Utc::now()),
            )
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::Status.eq(PostStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete a post. Comments and reactions are removed by FK cascade.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let result = Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
