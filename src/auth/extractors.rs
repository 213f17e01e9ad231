use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::auth::provider::AuthIdentity;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and validates the bearer token, returning the caller's identity.
pub struct AuthUser(pub AuthIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::auth("Token manquant ou invalide"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::auth("Token manquant ou invalide"))?;

        let identity = state
            .auth
            .validate_token(token)
            .await
            .map_err(|_| ApiError::auth("Token invalide ou expiré"))?;

        Ok(AuthUser(identity))
    }
}
