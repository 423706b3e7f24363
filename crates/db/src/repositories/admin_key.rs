//! Admin key repository.

use std::sync::Arc;

use crate::entities::{AdminKey, UserProfile, admin_key, user_profile};
use nagare_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};

/// Admin key repository for database operations.
#[derive(Clone)]
pub struct AdminKeyRepository {
    db: Arc<DatabaseConnection>,
}

impl AdminKeyRepository {
    /// Create a new admin key repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a key by its code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<admin_key::Model>> {
        AdminKey::find()
            .filter(admin_key::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Redeem a key for a user.
    ///
    /// Marking the key used and flipping the profile's `is_admin` flag
    /// happen in one transaction. The key write is a compare-and-swap on
    /// `is_used = false`: of two concurrent redeemers exactly one sees a
    /// changed row; the loser gets [`AppError::Conflict`] and no grant.
    pub async fn redeem(&self, code: &str, user_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = AdminKey::update_many()
            .col_expr(admin_key::Column::IsUsed, Expr::value(true))
            .col_expr(
                admin_key::Column::UsedBy,
                Expr::value(Some(user_id.to_string())),
            )
            .col_expr(admin_key::Column::UsedAt, Expr::value(chrono::Utc::now()))
            .filter(admin_key::Column::Code.eq(code))
            .filter(admin_key::Column::IsUsed.eq(false))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Err(AppError::Conflict("Admin key already redeemed".to_string()));
        }

        UserProfile::update_many()
            .col_expr(user_profile::Column::IsAdmin, Expr::value(true))
            .filter(user_profile::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_key(id: &str, code: &str, is_used: bool) -> admin_key::Model {
        admin_key::Model {
            id: id.to_string(),
            code: code.to_string(),
            is_used,
            used_by: None,
            used_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_code() {
        let key = create_test_key("k1", "380015", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[key]])
                .into_connection(),
        );

        let repo = AdminKeyRepository::new(db);
        let result = repo.find_by_code("380015").await.unwrap();

        assert!(result.is_some());
        assert!(!result.unwrap().is_used);
    }

    #[tokio::test]
    async fn test_redeem_success() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // CAS on the key, then the profile flag flip
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = AdminKeyRepository::new(db);
        assert!(repo.redeem("380015", "user_akira").await.is_ok());
    }

    #[tokio::test]
    async fn test_redeem_lost_race() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = AdminKeyRepository::new(db);
        let result = repo.redeem("380015", "user_akira").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
