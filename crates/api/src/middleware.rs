//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use nagare_common::{AppError, Identity, IdGenerator};
use nagare_core::{
    CommentService, ModerationService, PostService, ProfileService, ReactionService,
};
use nagare_queue::{FanoutBus, OfflineJournal, QueuedWrite, WriteIntent, is_transient};

/// Identity header set by the upstream identity provider.
pub const IDENTITY_USER_HEADER: &str = "x-identity-user";
/// Optional avatar header set alongside the identity.
pub const IDENTITY_AVATAR_HEADER: &str = "x-identity-avatar";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub reaction_service: ReactionService,
    pub moderation_service: ModerationService,
    pub profile_service: ProfileService,
    pub fanout: FanoutBus,
    pub journal: Arc<OfflineJournal>,
    pub feed_page_size: u64,
}

impl AppState {
    /// Hold a failed write in the offline journal if the failure was
    /// transient (store or transport trouble), then hand the error back.
    ///
    /// Journaled intents are resubmitted by the next drain, so a store
    /// outage stalls writes instead of losing them. Rejections the store
    /// itself produced (validation, visibility, state) are not queued:
    /// replaying them would fail the same way.
    pub(crate) async fn capture_failed_write(
        &self,
        caller: &Identity,
        intent: WriteIntent,
        error: AppError,
    ) -> AppError {
        if !is_transient(&error) {
            return error;
        }

        let entry = QueuedWrite::new(IdGenerator::new().generate(), caller.id.clone(), intent);
        match self.journal.enqueue(&entry).await {
            Ok(()) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    user_id = %caller.id,
                    error = %error,
                    "Store write failed, intent queued to offline journal"
                );
            }
            Err(e) => {
                tracing::error!(
                    user_id = %caller.id,
                    error = %e,
                    "Failed to journal write intent after store failure"
                );
            }
        }

        error
    }
}

/// Authentication middleware.
///
/// The upstream identity provider authenticates the caller and forwards
/// the username; this middleware derives the stable user id and resolves
/// the authoritative `is_admin` flag from the profile row. A caller with
/// no profile yet is a plain user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(username) = header_str(&req, IDENTITY_USER_HEADER) {
        let avatar_url = header_str(&req, IDENTITY_AVATAR_HEADER).unwrap_or_default();
        let id = Identity::user_id_for(&username);

        let is_admin = match state.profile_service.get(&id).await {
            Ok(profile) => profile.is_some_and(|p| p.is_admin),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %id, "Profile lookup failed, treating caller as plain user");
                false
            }
        };

        req.extensions_mut().insert(Identity {
            id,
            username,
            avatar_url,
            is_admin,
        });
    }

    next.run(req).await
}

fn header_str(req: &Request<Body>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nagare_queue::IntentTarget;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn like_intent(post_id: &str) -> WriteIntent {
        WriteIntent::ToggleReaction {
            target: IntentTarget::Post {
                id: post_id.to_string(),
            },
            kind: "like".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_journaled() {
        let state = testing::state_over(MockDatabase::new(DatabaseBackend::Postgres));
        let caller = Identity::plain("user_a", "a");

        let returned = state
            .capture_failed_write(
                &caller,
                like_intent("p1"),
                AppError::Database("connection refused".to_string()),
            )
            .await;

        assert!(matches!(returned, AppError::Database(_)));

        let entries = state.journal.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, "user_a");
        assert_eq!(entries[0].intent, like_intent("p1"));

        tokio::fs::remove_file(state.journal.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_write_is_not_journaled() {
        let state = testing::state_over(MockDatabase::new(DatabaseBackend::Postgres));
        let caller = Identity::plain("user_a", "a");

        let returned = state
            .capture_failed_write(
                &caller,
                like_intent("p1"),
                AppError::Validation("empty content".to_string()),
            )
            .await;

        assert!(matches!(returned, AppError::Validation(_)));
        assert!(state.journal.load().await.unwrap().is_empty());
    }
}
