use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::config::JwtConfig;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Who the auth provider says the bearer of a token is. The rest of the app
/// only ever needs the id (to key the local profile) and the email.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

#[derive(Error, Debug)]
pub enum AuthProviderError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Identity service boundary. Handlers and extractors talk to this trait;
/// the concrete implementation is injected through `AppState`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthIdentity, Option<SessionTokens>), AuthProviderError>;

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthIdentity, SessionTokens), AuthProviderError>;

    async fn validate_token(&self, token: &str) -> Result<AuthIdentity, AuthProviderError>;

    async fn refresh_session(&self, refresh_token: &str)
        -> Result<SessionTokens, AuthProviderError>;

    async fn invalidate_session(&self, refresh_token: &str) -> Result<(), AuthProviderError>;
}

#[derive(Debug, Clone, FromRow)]
struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
    #[allow(dead_code)]
    created_at: OffsetDateTime,
}

/// Local JWT-backed implementation. Credentials live in the `accounts` table,
/// separate from the `users` profile table that the review path syncs lazily.
pub struct JwtAuthProvider {
    db: PgPool,
    keys: JwtKeys,
}

impl JwtAuthProvider {
    pub fn new(db: PgPool, cfg: &JwtConfig) -> Self {
        Self {
            db,
            keys: JwtKeys::new(cfg),
        }
    }

    async fn find_account(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    fn session_for(&self, id: Uuid, email: &str) -> anyhow::Result<SessionTokens> {
        Ok(SessionTokens {
            access_token: self.keys.sign_access(id, email)?,
            refresh_token: self.keys.sign_refresh(id, email)?,
            expires_at: self.keys.access_expires_at(),
        })
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthIdentity, Option<SessionTokens>), AuthProviderError> {
        if self
            .find_account(email)
            .await
            .map_err(AuthProviderError::Backend)?
            .is_some()
        {
            return Err(AuthProviderError::EmailTaken);
        }

        let hash = hash_password(password)?;
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AuthProviderError::Backend(e.into()))?;

        let identity = AuthIdentity {
            user_id: account.id,
            email: account.email.clone(),
        };
        let session = self.session_for(account.id, &account.email)?;
        Ok((identity, Some(session)))
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthIdentity, SessionTokens), AuthProviderError> {
        let account = self
            .find_account(email)
            .await
            .map_err(AuthProviderError::Backend)?
            .ok_or(AuthProviderError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AuthProviderError::InvalidCredentials);
        }

        let identity = AuthIdentity {
            user_id: account.id,
            email: account.email.clone(),
        };
        let session = self.session_for(account.id, &account.email)?;
        Ok((identity, session))
    }

    async fn validate_token(&self, token: &str) -> Result<AuthIdentity, AuthProviderError> {
        let claims = self
            .keys
            .verify(token)
            .map_err(|_| AuthProviderError::InvalidToken)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthProviderError::InvalidToken);
        }
        Ok(AuthIdentity {
            user_id: claims.sub,
            email: claims.email,
        })
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<SessionTokens, AuthProviderError> {
        let claims = self
            .keys
            .verify_refresh(refresh_token)
            .map_err(|_| AuthProviderError::InvalidToken)?;
        Ok(self.session_for(claims.sub, &claims.email)?)
    }

    async fn invalidate_session(&self, _refresh_token: &str) -> Result<(), AuthProviderError> {
        // Tokens are stateless; logout is the client discarding them.
        debug!("session invalidated client-side");
        Ok(())
    }
}


#[cfg(test)]
mod provider_tests {
    use super::*;
    use crate::state::AppState;

    fn make_provider() -> JwtAuthProvider {
        let state = AppState::fake();
        JwtAuthProvider::new(state.db.clone(), &state.config.jwt)
    }

    #[tokio::test]
    async fn validate_token_accepts_access_and_rejects_refresh() {
        let provider = make_provider();
        let user_id = Uuid::new_v4();
        let access = provider.keys.sign_access(user_id, "u@test.fr").unwrap();
        let refresh = provider.keys.sign_refresh(user_id, "u@test.fr").unwrap();

        let identity = provider.validate_token(&access).await.expect("valid");
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.email, "u@test.fr");

        let err = provider.validate_token(&refresh).await.unwrap_err();
        assert!(matches!(err, AuthProviderError::InvalidToken));
    }

    #[tokio::test]
    async fn refresh_session_issues_new_pair() {
        let provider = make_provider();
        let user_id = Uuid::new_v4();
        let refresh = provider.keys.sign_refresh(user_id, "u@test.fr").unwrap();

        let session = provider.refresh_session(&refresh).await.expect("refresh");
        let identity = provider
            .validate_token(&session.access_token)
            .await
            .expect("new access token valid");
        assert_eq!(identity.user_id, user_id);
    }

    #[tokio::test]
    async fn refresh_session_rejects_access_token() {
        let provider = make_provider();
        let access = provider
            .keys
            .sign_access(Uuid::new_v4(), "u@test.fr")
            .unwrap();
        let err = provider.refresh_session(&access).await.unwrap_err();
        assert!(matches!(err, AuthProviderError::InvalidToken));
    }
}
