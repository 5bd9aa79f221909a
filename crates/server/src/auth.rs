//! Identity resolution
//!
//! Stand-in for the external auth/session provider: callers identify through
//! the `X-User-Id` header, which is resolved against the users table. Missing,
//! malformed or unknown identities are rejected with 401 before any handler
//! logic runs.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use bookstore_core::policy::Identity;

use crate::{error::AppError, state::AppState};

pub const USER_HEADER: &str = "x-user-id";

/// The authenticated requester, ready to hand to the access policy.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id: i64 = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or(AppError::Unauthorized)?;

        let user = state
            .db
            .fetch_user(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::Unauthorized)?;

        Ok(Self(Identity::new(user.id, user.is_staff)))
    }
}
