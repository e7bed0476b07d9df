//! Shared-secret bearer authentication for the trigger and logs endpoints.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use wxcard_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the configured access code as a
/// `Authorization: Bearer <code>` header.
///
/// Use this as an extractor parameter in any handler that requires the
/// shared secret:
///
/// ```ignore
/// async fn my_handler(_auth: AccessToken) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AccessToken;

impl FromRequestParts<AppState> for AccessToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.access_code.as_str();
        if expected.is_empty() {
            return Err(AppError::NotConfigured("ACCESS_CODE is not set".into()));
        }

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if !constant_time_eq(token, expected) {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid access code".into(),
            )));
        }

        Ok(AccessToken)
    }
}

/// Constant-time string comparison to prevent timing-based attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_match() {
        assert!(constant_time_eq("secret", "secret"));
    }

    #[test]
    fn different_strings_do_not_match() {
        assert!(!constant_time_eq("secret", "secre7"));
        assert!(!constant_time_eq("secret", "secrets"));
        assert!(!constant_time_eq("", "secret"));
    }
}
