//! Resolving the caller's identity from a session token.
//!
//! Identity is owned by an external provider; the API only verifies the
//! token and trusts its `sub` claim as the user id. HTTP requests carry the
//! token as `Authorization: Bearer <token>`, the WebSocket upgrade as a
//! `token` query parameter (see [`AuthUser::from_token`]).

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use lumen_core::error::CoreError;
use lumen_core::types::UserId;

use crate::auth::jwt::{validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Longest provider subject accepted as a user id.
pub const MAX_SUBJECT_LEN: usize = 255;

/// The signed-in user behind a request.
///
/// ```ignore
/// async fn create(auth: AuthUser, ...) -> AppResult<...> {
///     GalleryRepo::create(&state.pool, &auth.user_id, &input).await?;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The identity provider's subject for this user.
    pub user_id: UserId,
}

impl AuthUser {
    /// Verify `token` and take its subject as the user id.
    ///
    /// A token without a usable subject is rejected like an invalid one, so
    /// no row is ever owned by an empty id.
    pub fn from_token(token: &str, jwt: &JwtConfig) -> Result<Self, AppError> {
        let claims = validate_token(token, jwt).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            unauthorized("Invalid or expired token")
        })?;

        let subject = claims.sub.trim();
        if subject.is_empty() || subject.len() > MAX_SUBJECT_LEN {
            return Err(unauthorized("Session token has no valid subject"));
        }
        Ok(Self {
            user_id: subject.to_string(),
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = bearer_token(header).ok_or_else(|| {
            unauthorized("Invalid Authorization format. Expected: Bearer <token>")
        })?;

        Self::from_token(token, &state.config.jwt)
    }
}

/// The token of a `Bearer` credential. The scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}
