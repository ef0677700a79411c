use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header set by the upstream gateway after it authenticated the caller.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller identity taken from the `X-User-Id` header.
///
/// Add this as a handler parameter to require an identified caller.
pub struct AuthUser {
    pub user_id: i32,
}

impl AuthUser {
    /// Returns `Ok(())` if the caller is `user_id`, `Err(PermissionDenied)` otherwise.
    pub fn require_self(&self, user_id: i32) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let user_id = raw
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::Validation(format!("{USER_ID_HEADER} must be an integer")))?;

        Ok(AuthUser { user_id })
    }
}
