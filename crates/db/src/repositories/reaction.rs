//! Reaction repository.
//!
//! The toggle path is the only place in the system that needs true mutual
//! exclusion: the target row is locked (`SELECT ... FOR UPDATE`) for the
//! duration of the transaction, scoped to that one post or comment, and the
//! counters are recomputed by counting reaction rows rather than applying
//! deltas, so concurrent reactors can never drift the totals.

use std::sync::Arc;

use crate::entities::{
    Comment, Post, Reaction, comment, post,
    reaction::{self, ReactionKind},
};
use nagare_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};

/// The object a reaction applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionTarget {
    /// A post, by ID.
    Post(String),
    /// A comment, by ID.
    Comment(String),
}

/// Result of a reaction toggle: the reactor's reaction after the toggle
/// (none if they un-reacted) and the target's recomputed counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The caller's reaction after the toggle.
    pub kind: Option<ReactionKind>,
    /// Recomputed like count.
    pub likes: i32,
    /// Recomputed dislike count (always 0 for comments).
    pub dislikes: i32,
}

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the caller's reaction on a post.
    pub async fn find_on_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the caller's reaction on a comment.
    pub async fn find_on_comment(
        &self,
        user_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::CommentId.eq(comment_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Toggle the caller's reaction on a target.
    ///
    /// Runs in one transaction: lock the target row, apply the toggle
    /// (delete / replace / insert), recount reaction rows per kind, write
    /// the counters back. Either everything commits or nothing does.
    pub async fn toggle(
        &self,
        reaction_id: &str,
        user_id: &str,
        target: &ReactionTarget,
        kind: ReactionKind,
    ) -> AppResult<ToggleOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let outcome = match target {
            ReactionTarget::Post(post_id) => {
                Self::toggle_on_post(&txn, reaction_id, user_id, post_id, kind).await
            }
            ReactionTarget::Comment(comment_id) => {
                Self::toggle_on_comment(&txn, reaction_id, user_id, comment_id, kind).await
            }
        };

        match outcome {
            Ok(outcome) => {
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(outcome)
            }
            Err(e) => {
                txn.rollback()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Err(e)
            }
        }
    }

    async fn toggle_on_post(
        txn: &DatabaseTransaction,
        reaction_id: &str,
        user_id: &str,
        post_id: &str,
        kind: ReactionKind,
    ) -> AppResult<ToggleOutcome> {
        // Per-target lock; serializes concurrent toggles on the same post.
        Post::find_by_id(post_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        let existing = Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PostId.eq(post_id))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = reaction::ActiveModel {
            id: Set(reaction_id.to_string()),
            user_id: Set(user_id.to_string()),
            post_id: Set(Some(post_id.to_string())),
            comment_id: Set(None),
            kind: Set(kind),
            created_at: Set(chrono::Utc::now().into()),
        };
        let new_kind = Self::apply_toggle(txn, existing, kind, model)
            .await?
            .then_some(kind);

        let likes = Self::count_on_post(txn, post_id, ReactionKind::Like).await?;
        let dislikes = Self::count_on_post(txn, post_id, ReactionKind::Dislike).await?;

        Post::update_many()
            .col_expr(post::Column::Likes, Expr::value(likes))
            .col_expr(post::Column::Dislikes, Expr::value(dislikes))
            .filter(post::Column::Id.eq(post_id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ToggleOutcome {
            kind: new_kind,
            likes,
            dislikes,
        })
    }

    async fn toggle_on_comment(
        txn: &DatabaseTransaction,
        reaction_id: &str,
        user_id: &str,
        comment_id: &str,
        kind: ReactionKind,
    ) -> AppResult<ToggleOutcome> {
        Comment::find_by_id(comment_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;

        let existing = Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::CommentId.eq(comment_id))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = reaction::ActiveModel {
            id: Set(reaction_id.to_string()),
            user_id: Set(user_id.to_string()),
            post_id: Set(None),
            comment_id: Set(Some(comment_id.to_string())),
            kind: Set(kind),
            created_at: Set(chrono::Utc::now().into()),
        };
        let new_kind = Self::apply_toggle(txn, existing, kind, model)
            .await?
            .then_some(kind);

        let likes = Self::count_on_comment(txn, comment_id, ReactionKind::Like).await?;

        Comment::update_many()
            .col_expr(comment::Column::Likes, Expr::value(likes))
            .filter(comment::Column::Id.eq(comment_id))
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ToggleOutcome {
            kind: new_kind,
            likes,
            dislikes: 0,
        })
    }

    /// Apply the toggle against the caller's existing reaction row.
    ///
    /// Returns `true` if a reaction row for `kind` exists afterwards.
    async fn apply_toggle(
        txn: &DatabaseTransaction,
        existing: Option<reaction::Model>,
        kind: ReactionKind,
        replacement: reaction::ActiveModel,
    ) -> AppResult<bool> {
        match existing {
            // Same kind: un-react.
            Some(r) if r.kind == kind => {
                Reaction::delete_by_id(&r.id)
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(false)
            }
            // Opposite kind: replace.
            Some(r) => {
                Reaction::delete_by_id(&r.id)
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Reaction::insert(replacement)
                    .exec_without_returning(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(true)
            }
            // No reaction yet: insert.
            None => {
                Reaction::insert(replacement)
                    .exec_without_returning(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(true)
            }
        }
    }

    async fn count_on_post(
        txn: &DatabaseTransaction,
        post_id: &str,
        kind: ReactionKind,
    ) -> AppResult<i32> {
        let count = Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::Kind.eq(kind))
            .count(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn count_on_comment(
        txn: &DatabaseTransaction,
        comment_id: &str,
        kind: ReactionKind,
    ) -> AppResult<i32> {
        let count = Reaction::find()
            .filter(reaction::Column::CommentId.eq(comment_id))
            .filter(reaction::Column::Kind.eq(kind))
            .count(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::post::{Category, PostStatus};
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn test_post(id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: "user_author".to_string(),
            author_username: "author".to_string(),
            author_avatar: None,
            content: "body".to_string(),
            image_url: None,
            link_url: None,
            category: Category::Discussion,
            likes: 0,
            dislikes: 0,
            status: PostStatus::Approved,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_reaction(id: &str, user_id: &str, post_id: &str, kind: ReactionKind) -> reaction::Model {
        reaction::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: Some(post_id.to_string()),
            comment_id: None,
            kind,
            created_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[tokio::test]
    async fn test_toggle_inserts_first_reaction() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // lock target, existing reaction (none), like count, dislike count
                .append_query_results([[test_post("p1")]])
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_results([vec![count_row(1)]])
                .append_query_results([vec![count_row(0)]])
                // insert reaction, write counters
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

        let repo = ReactionRepository::new(db);
        let outcome = repo
            .toggle(
                "r1",
                "user_a",
                &ReactionTarget::Post("p1".to_string()),
                ReactionKind::Like,
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind, Some(ReactionKind::Like));
        assert_eq!(outcome.likes, 1);
        assert_eq!(outcome.dislikes, 0);
    }

    #[tokio::test]
    async fn test_toggle_same_kind_unreacts() {
        let existing = test_reaction("r1", "user_a", "p1", ReactionKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_post("p1")]])
                .append_query_results([[existing]])
                .append_query_results([vec![count_row(0)]])
                .append_query_results([vec![count_row(0)]])
                // delete reaction, write counters
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

        let repo = ReactionRepository::new(db);
        let outcome = repo
            .toggle(
                "r2",
                "user_a",
                &ReactionTarget::Post("p1".to_string()),
                ReactionKind::Like,
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind, None);
        assert_eq!(outcome.likes, 0);
        assert_eq!(outcome.dislikes, 0);
    }

    #[tokio::test]
    async fn test_toggle_opposite_kind_swaps() {
        let existing = test_reaction("r1", "user_a", "p1", ReactionKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_post("p1")]])
                .append_query_results([[existing]])
                .append_query_results([vec![count_row(0)]])
                .append_query_results([vec![count_row(1)]])
                // delete old, insert new, write counters
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
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

        let repo = ReactionRepository::new(db);
        let outcome = repo
            .toggle(
                "r2",
                "user_a",
                &ReactionTarget::Post("p1".to_string()),
                ReactionKind::Dislike,
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind, Some(ReactionKind::Dislike));
        assert_eq!(outcome.likes, 0);
        assert_eq!(outcome.dislikes, 1);
    }

    #[tokio::test]
    async fn test_like_dislike_dislike_round_trip() {
        let exec_ok = MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // like: no existing reaction
                .append_query_results([[test_post("p1")]])
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_results([vec![count_row(1)]])
                .append_query_results([vec![count_row(0)]])
                // dislike: replaces the like
                .append_query_results([[test_post("p1")]])
                .append_query_results([[test_reaction("r1", "user_a", "p1", ReactionKind::Like)]])
                .append_query_results([vec![count_row(0)]])
                .append_query_results([vec![count_row(1)]])
                // dislike again: un-reacts
                .append_query_results([[test_post("p1")]])
                .append_query_results([[test_reaction(
                    "r2",
                    "user_a",
                    "p1",
                    ReactionKind::Dislike,
                )]])
                .append_query_results([vec![count_row(0)]])
                .append_query_results([vec![count_row(0)]])
                // insert+update, delete+insert+update, delete+update
                .append_exec_results([
                    exec_ok.clone(),
                    exec_ok.clone(),
                    exec_ok.clone(),
                    exec_ok.clone(),
                    exec_ok.clone(),
                    exec_ok.clone(),
                    exec_ok,
                ])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let target = ReactionTarget::Post("p1".to_string());

        let liked = repo
            .toggle("r1", "user_a", &target, ReactionKind::Like)
            .await
            .unwrap();
        assert_eq!((liked.kind, liked.likes, liked.dislikes), (Some(ReactionKind::Like), 1, 0));

        let swapped = repo
            .toggle("r2", "user_a", &target, ReactionKind::Dislike)
            .await
            .unwrap();
        assert_eq!(
            (swapped.kind, swapped.likes, swapped.dislikes),
            (Some(ReactionKind::Dislike), 0, 1)
        );

        let cleared = repo
            .toggle("r3", "user_a", &target, ReactionKind::Dislike)
            .await
            .unwrap();
        assert_eq!((cleared.kind, cleared.likes, cleared.dislikes), (None, 0, 0));
    }

    #[tokio::test]
    async fn test_toggle_missing_target() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo
            .toggle(
                "r1",
                "user_a",
                &ReactionTarget::Post("missing".to_string()),
                ReactionKind::Like,
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }
}
