use axum::http::{HeaderMap, header};

use crate::{
    domain::shared::ids::ActorId,
    presentation::http::{errors::AppError, state::AppState},
};

/// The caller behind a live bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub uid: ActorId,
    pub username: String,
    pub token: String,
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Resolves the caller, failing with `AUTH_ERROR` when the token is missing,
/// invalid, expired or no longer in the caller's token list.
pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Forbidden("Missing bearer token".to_string()))?;
    let claims = state.users.authenticate(&token).await?;
    Ok(AuthenticatedUser {
        uid: claims.uid,
        username: claims.username,
        token,
    })
}

/// Like `require_user`, but anonymous callers and bad tokens yield `None`.
pub async fn optional_user(state: &AppState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    extract_bearer_token(headers)?;
    require_user(state, headers).await.ok()
}
