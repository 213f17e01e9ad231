use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Dependency {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn dependency(msg: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Dependency {
            message: msg.into(),
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

/// Translates well-known dependency failure messages into user-facing
/// French hints. Anything unrecognized gets no hint.
pub fn dependency_hint(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    if lower.contains("password authentication failed") {
        Some("Identifiants de base de données invalides".into())
    } else if lower.contains("rate limit") {
        Some("Trop de requêtes, réessayez dans quelques instants".into())
    } else if lower.contains("already registered") {
        Some("Un compte existe déjà avec cet email".into())
    } else if lower.contains("timeout") {
        Some("Le service met trop de temps à répondre".into())
    } else {
        None
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    hint: None,
                },
            ),
            ApiError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: msg,
                    hint: None,
                },
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: msg,
                    hint: None,
                },
            ),
            ApiError::Dependency { message, source } => {
                error!(error = %source, "dependency failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        hint: dependency_hint(&source.to_string()),
                        error: message,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_dependency_messages_get_french_hints() {
        assert!(dependency_hint("FATAL: password authentication failed for user").is_some());
        assert!(dependency_hint("Rate limit exceeded").is_some());
        assert!(dependency_hint("user already registered").is_some());
        assert!(dependency_hint("connection timeout expired").is_some());
        assert!(dependency_hint("some other failure").is_none());
    }

    #[test]
    fn validation_error_maps_to_400() {
        let res = ApiError::validation("Rating doit être entre 1 et 5").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let res = ApiError::not_found("Centre non trouvé").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
