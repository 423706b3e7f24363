//! Profile bootstrap service.
//!
//! Profiles are created lazily: every writing surface calls
//! [`ProfileService::ensure_profile`] before the identity's first write.
//! Bootstrap is idempotent, so concurrent first writes race harmlessly on
//! the profile's primary key.

use std::time::Duration;

use nagare_common::{AppError, AppResult, Identity, with_deadline};
use nagare_db::{
    entities::user_profile,
    repositories::{AdminKeyRepository, UserProfileRepository},
};
use sea_orm::Set;

/// Username length bounds for display updates.
const USERNAME_MIN: usize = 2;
const USERNAME_MAX: usize = 30;

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: UserProfileRepository,
    admin_key_repo: AdminKeyRepository,
    op_deadline: Duration,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(
        profile_repo: UserProfileRepository,
        admin_key_repo: AdminKeyRepository,
    ) -> Self {
        Self {
            profile_repo,
            admin_key_repo,
            op_deadline: Duration::from_secs(10),
        }
    }

    /// Set the per-call deadline for mutating operations.
    pub const fn set_op_deadline(&mut self, deadline: Duration) {
        self.op_deadline = deadline;
    }

    /// Ensure a profile row exists for this identity (idempotent).
    pub async fn ensure_profile(&self, identity: &Identity) -> AppResult<()> {
        let model = user_profile::ActiveModel {
            user_id: Set(identity.id.clone()),
            username: Set(identity.username.clone()),
            avatar_url: Set(if identity.avatar_url.is_empty() {
                None
            } else {
                Some(identity.avatar_url.clone())
            }),
            is_admin: Set(false),
            joined_at: Set(chrono::Utc::now().into()),
        };

        with_deadline(self.op_deadline, self.profile_repo.ensure(model)).await
    }

    /// Get a profile by user ID.
    pub async fn get(&self, user_id: &str) -> AppResult<Option<user_profile::Model>> {
        self.profile_repo.find_by_id(user_id).await
    }

    /// Update the caller's display fields.
    pub async fn update_display(
        &self,
        identity: &Identity,
        username: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AppResult<()> {
        if username.is_none() && avatar_url.is_none() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }

        if let Some(username) = username {
            let len = username.chars().count();
            if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
                return Err(AppError::Validation(format!(
                    "Username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
                )));
            }
        }
        if let Some(avatar_url) = avatar_url {
            url::Url::parse(avatar_url)
                .map_err(|_| AppError::Validation("avatar_url is not a valid URL".to_string()))?;
        }

        let rows = with_deadline(
            self.op_deadline,
            self.profile_repo
                .update_display(&identity.id, username, avatar_url),
        )
        .await?;

        if rows == 0 {
            return Err(AppError::NotFound(format!(
                "Profile {} not found",
                identity.id
            )));
        }

        Ok(())
    }

    /// Redeem an admin key for the caller.
    ///
    /// A missing code is `NotFound`, a used key is `InvalidState`; losing
    /// the race between the lookup and the redeem write is `Conflict`.
    /// Exactly one of two concurrent redeemers can ever succeed.
    pub async fn redeem_admin_key(&self, identity: &Identity, code: &str) -> AppResult<()> {
        let key = self
            .admin_key_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin key not found".to_string()))?;

        if key.is_used {
            return Err(AppError::InvalidState(
                "Admin key already used".to_string(),
            ));
        }

        self.ensure_profile(identity).await?;

        with_deadline(
            self.op_deadline,
            self.admin_key_repo.redeem(code, &identity.id),
        )
        .await
    }
}
