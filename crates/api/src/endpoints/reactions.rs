//! Reaction endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use nagare_common::AppResult;
use nagare_core::ReactionState;
use nagare_db::{entities::reaction::ReactionKind, repositories::ReactionTarget};
use nagare_queue::{IntentTarget, WriteIntent};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// What a reaction or report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Post,
    Comment,
}

/// A target reference as sent by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: String,
}

impl From<TargetRef> for ReactionTarget {
    fn from(t: TargetRef) -> Self {
        match t.target_type {
            TargetType::Post => Self::Post(t.target_id),
            TargetType::Comment => Self::Comment(t.target_id),
        }
    }
}

impl From<TargetRef> for IntentTarget {
    fn from(t: TargetRef) -> Self {
        match t.target_type {
            TargetType::Post => Self::Post { id: t.target_id },
            TargetType::Comment => Self::Comment { id: t.target_id },
        }
    }
}

/// Toggle reaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    #[serde(flatten)]
    pub target: TargetRef,
    pub kind: ReactionKind,
}

/// Toggle the caller's reaction; returns the resulting state and the
/// recomputed counters. Held in the offline journal if the store is
/// unreachable.
async fn toggle(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ToggleReactionRequest>,
) -> AppResult<ApiResponse<ReactionState>> {
    let intent = WriteIntent::ToggleReaction {
        target: req.target.clone().into(),
        kind: req.kind.as_str().to_string(),
    };

    let result = async {
        state.profile_service.ensure_profile(&caller).await?;
        state
            .reaction_service
            .toggle(&caller, req.target.into(), req.kind)
            .await
    }
    .await;

    match result {
        Ok(outcome) => Ok(ApiResponse::ok(outcome)),
        Err(e) => Err(state.capture_failed_write(&caller, intent, e).await),
    }
}

/// Current reaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentReactionResponse {
    pub reaction: Option<ReactionKind>,
}

/// The caller's current reaction on a target.
async fn mine(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Query(target): Query<TargetRef>,
) -> AppResult<ApiResponse<CurrentReactionResponse>> {
    let reaction = match target.target_type {
        TargetType::Post => {
            state
                .reaction_service
                .current_on_post(&caller, &target.target_id)
                .await?
        }
        TargetType::Comment => {
            state
                .reaction_service
                .current_on_comment(&caller, &target.target_id)
                .await?
        }
    };

    Ok(ApiResponse::ok(CurrentReactionResponse { reaction }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/mine", get(mine))
}
