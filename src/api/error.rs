use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, LocationError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),

    EmailNotVerified { email: String },

    RateLimited { locked_until: DateTime<Utc> },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::EmailNotVerified { email } => write!(f, "Email not verified: {email}"),
            Self::RateLimited { locked_until } => write!(f, "Rate limited until {locked_until}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Stable machine-readable code carried in the error envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DatabaseError(_) | Self::InternalError(_) => "INTERNAL_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) | Self::EmailNotVerified { .. } => "FORBIDDEN",
            Self::RateLimited { .. } => "RATE_LIMITED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message, details) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    None,
                )
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            Self::EmailNotVerified { email } => (
                StatusCode::FORBIDDEN,
                "Email address has not been verified".to_string(),
                Some(json!({ "email": email })),
            ),
            Self::RateLimited { locked_until } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many failed login attempts, try again later".to_string(),
                Some(json!({
                    "locked_until": locked_until.to_rfc3339_opts(SecondsFormat::Secs, true)
                })),
            ),
        };

        let mut body = ApiResponse::<()>::error(error_message, code);
        if let Some(details) = details {
            body = body.with_details(details);
        }
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::InvalidCredentials | AuthError::Unauthorized | AuthError::InvalidToken => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::EmailNotVerified { email } => Self::EmailNotVerified { email },
            AuthError::Locked { locked_until } => Self::RateLimited { locked_until },
            AuthError::UnknownOneTimeToken | AuthError::OneTimeTokenUnusable => {
                Self::ValidationError(err.to_string())
            }
            AuthError::SessionNotFound => Self::NotFound(err.to_string()),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<LocationError> for ApiError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::NotFound(_) => Self::NotFound(err.to_string()),
            LocationError::Forbidden => Self::Forbidden(err.to_string()),
            LocationError::Conflict(msg) => Self::Conflict(msg),
            LocationError::Validation(msg) => Self::ValidationError(msg),
            LocationError::Database(msg) => Self::DatabaseError(msg),
            LocationError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized(AuthError::Unauthorized.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(ApiError::unauthorized().code(), "UNAUTHORIZED");
        assert_eq!(
            ApiError::from(LocationError::Forbidden).code(),
            "FORBIDDEN"
        );
        assert_eq!(
            ApiError::from(AuthError::Locked {
                locked_until: Utc::now()
            })
            .code(),
            "RATE_LIMITED"
        );
    }

    #[test]
    fn test_status_mapping() {
        let resp = ApiError::from(AuthError::EmailNotVerified {
            email: "a@b.c".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = ApiError::from(AuthError::OneTimeTokenUnusable).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::from(AuthError::SessionNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::from(LocationError::Conflict("busy".into())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
