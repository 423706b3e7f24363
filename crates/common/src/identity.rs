//! Resolved caller identity.
//!
//! The identity provider (external to this system) authenticates callers
//! and hands the engine an already-resolved identity. Engine operations
//! never see raw credentials; privilege comes exclusively from the
//! `is_admin` flag on the caller's profile row.

use serde::{Deserialize, Serialize};

/// An authenticated caller, as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id, derived deterministically from the username.
    pub id: String,
    /// Display username at resolution time.
    pub username: String,
    /// Avatar URL at resolution time (may be empty).
    pub avatar_url: String,
    /// Whether the caller holds admin privilege.
    pub is_admin: bool,
}

impl Identity {
    /// Derive the stable user id for a username.
    ///
    /// Identity ids are deterministic so that the same username always
    /// maps to the same profile row, matching the identity provider's
    /// scheme.
    #[must_use]
    pub fn user_id_for(username: &str) -> String {
        format!("user_{}", username.to_lowercase())
    }

    /// Build an identity for a known user id with no privileges.
    #[must_use]
    pub fn plain(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar_url: String::new(),
            is_admin: false,
        }
    }

    /// Build an admin identity (test and wiring helper).
    #[must_use]
    pub fn admin(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::plain(id, username)
        }
    }
}
