//! Profile and admin-key endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use nagare_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Profile response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub joined_at: String,
}

impl From<nagare_db::entities::user_profile::Model> for ProfileResponse {
    fn from(p: nagare_db::entities::user_profile::Model) -> Self {
        Self {
            user_id: p.user_id,
            username: p.username,
            avatar_url: p.avatar_url,
            is_admin: p.is_admin,
            joined_at: p.joined_at.to_rfc3339(),
        }
    }
}

/// The caller's own profile, bootstrapping it on first sight.
async fn me(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    state.profile_service.ensure_profile(&caller).await?;

    let profile = state
        .profile_service
        .get(&caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", caller.id)))?;

    Ok(ApiResponse::ok(profile.into()))
}

/// Update profile request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// Update the caller's display fields.
async fn update(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<ApiResponse<()>> {
    state.profile_service.ensure_profile(&caller).await?;
    state
        .profile_service
        .update_display(&caller, req.username.as_deref(), req.avatar_url.as_deref())
        .await?;

    Ok(ApiResponse::ok(()))
}

/// Redeem admin key request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemKeyRequest {
    pub code: String,
}

/// Redeem a single-use admin key for the caller.
async fn redeem_key(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RedeemKeyRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .profile_service
        .redeem_admin_key(&caller, &req.code)
        .await?;

    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me).patch(update))
        .route("/admin-key", post(redeem_key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_request_parses() {
        let req: RedeemKeyRequest = serde_json::from_str(r#"{"code":"380015"}"#).unwrap();
        assert_eq!(req.code, "380015");
    }

    #[test]
    fn test_profile_response_is_camel_case() {
        let response = ProfileResponse {
            user_id: "user_a".to_string(),
            username: "a".to_string(),
            avatar_url: None,
            is_admin: true,
            joined_at: "2026-01-01T00:00:00+00:00".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"userId\":\"user_a\""));
        assert!(json.contains("\"isAdmin\":true"));
    }
}
