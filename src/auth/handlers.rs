use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, LogoutRequest, MessageResponse, PublicUser,
            RefreshRequest, SignupRequest, SignupResponse, UpdateProfileRequest,
        },
        extractors::AuthUser,
        provider::{is_valid_email, AuthProviderError, SessionTokens},
    },
    error::ApiError,
    state::AppState,
    users::repo::{ProfileFields, UserProfile},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me).put(put_me))
}

fn provider_error(e: AuthProviderError, message: &str) -> ApiError {
    match e {
        AuthProviderError::InvalidCredentials => {
            ApiError::auth("Email ou mot de passe incorrect")
        }
        AuthProviderError::InvalidToken => ApiError::auth("Token invalide ou expiré"),
        AuthProviderError::EmailTaken => {
            ApiError::validation("Un compte existe déjà avec cet email")
        }
        AuthProviderError::Backend(err) => ApiError::dependency(message, err),
    }
}

/// Best-effort profile sync. Failure here must never fail the request.
async fn sync_profile(
    state: &AppState,
    user_id: uuid::Uuid,
    email: &str,
    fields: &ProfileFields,
) -> Option<UserProfile> {
    match UserProfile::upsert(&state.db, user_id, email, fields).await {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, %user_id, "profile sync failed; continuing");
            None
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("Email invalide"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation(
            "Mot de passe trop court (6 caractères minimum)",
        ));
    }

    let (identity, session) = state
        .auth
        .create_account(&payload.email, &payload.password)
        .await
        .map_err(|e| provider_error(e, "Erreur serveur lors de l'inscription"))?;

    let fields = ProfileFields {
        first_name: payload.first_name.clone(),
        last_name: payload.last_name.clone(),
        handicap_type: payload.handicap_type.clone(),
        phone: payload.phone.clone(),
    };
    let profile = sync_profile(&state, identity.user_id, &identity.email, &fields).await;

    info!(user_id = %identity.user_id, email = %identity.email, "account created");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Compte créé avec succès".into(),
            user: public_user(identity.user_id, &identity.email, profile),
            session,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("Email invalide"));
    }

    let (identity, session) = state
        .auth
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(|e| provider_error(e, "Erreur serveur lors de la connexion"))?;

    let profile = sync_profile(
        &state,
        identity.user_id,
        &identity.email,
        &ProfileFields::default(),
    )
    .await;

    info!(user_id = %identity.user_id, "user logged in");
    Ok(Json(LoginResponse {
        user: public_user(identity.user_id, &identity.email, profile),
        session,
    }))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(token) = payload.refresh_token.as_deref() {
        state
            .auth
            .invalidate_session(token)
            .await
            .map_err(|e| provider_error(e, "Erreur lors de la déconnexion"))?;
    }
    Ok(Json(MessageResponse {
        message: "Déconnexion réussie".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<SessionTokens>, ApiError> {
    let session = state
        .auth
        .refresh_session(&payload.refresh_token)
        .await
        .map_err(|e| match e {
            AuthProviderError::InvalidToken => {
                ApiError::auth("Refresh token invalide ou expiré")
            }
            other => provider_error(other, "Erreur serveur lors du rafraîchissement"),
        })?;
    Ok(Json(session))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let profile = UserProfile::find_by_id(&state.db, identity.user_id)
        .await
        .map_err(|e| ApiError::dependency("Erreur serveur", e))?;

    // First read for an authenticated-but-unsynced user materializes the row.
    let profile = match profile {
        Some(p) => Some(p),
        None => {
            sync_profile(
                &state,
                identity.user_id,
                &identity.email,
                &ProfileFields::default(),
            )
            .await
        }
    };

    Ok(Json(
        public_user(identity.user_id, &identity.email, profile),
    ))
}

#[instrument(skip(state, payload))]
pub async fn put_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let fields = ProfileFields {
        first_name: payload.first_name,
        last_name: payload.last_name,
        handicap_type: payload.handicap_type,
        phone: payload.phone,
    };

    let profile = UserProfile::upsert(&state.db, identity.user_id, &identity.email, &fields)
        .await
        .map_err(|e| ApiError::dependency("Erreur serveur lors de la mise à jour", e))?;

    Ok(Json(
        public_user(identity.user_id, &identity.email, Some(profile)),
    ))
}

fn public_user(user_id: uuid::Uuid, email: &str, profile: Option<UserProfile>) -> PublicUser {
    match profile {
        Some(p) => PublicUser {
            id: p.id,
            email: p.email,
            first_name: p.first_name,
            last_name: p.last_name,
            handicap_type: p.handicap_type,
            phone: p.phone,
            created_at: Some(p.created_at),
        },
        None => PublicUser {
            id: user_id,
            email: email.to_string(),
            first_name: None,
            last_name: None,
            handicap_type: None,
            phone: None,
            created_at: None,
        },
    }
}
