use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::auth::progression::ProgressionError;
use crate::auth::repo::StoreError;

/// Every failure a handler can report. Rendered as `{"error": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    Conflict,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Email not found")]
    EmailNotFound,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Already checked in today")]
    AlreadyCheckedIn,
    #[error("Not enough points")]
    InsufficientPoints,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Error hashing password")]
    Hashing(#[source] PasswordError),
    #[error("Error generating token")]
    Token(#[source] TokenError),
    #[error("Internal server error")]
    Store(#[source] StoreError),
    #[error("Error saving file")]
    Storage(#[source] anyhow::Error),
    #[error("Too many concurrent updates, try again")]
    Contention,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn invalid_payload() -> Self {
        Self::Validation("Invalid request payload".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict
            | Self::InvalidCredentials
            | Self::EmailNotFound
            | Self::InvalidOrExpiredToken
            | Self::AlreadyCheckedIn
            | Self::InsufficientPoints => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Contention => StatusCode::CONFLICT,
            Self::Hashing(_) | Self::Token(_) | Self::Store(_) | Self::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => Self::Conflict,
            other => Self::Store(other),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        Self::Hashing(e)
    }
}

impl From<ProgressionError> for ApiError {
    fn from(e: ProgressionError) -> Self {
        match e {
            ProgressionError::AlreadyCheckedIn => Self::AlreadyCheckedIn,
            ProgressionError::InsufficientPoints => Self::InsufficientPoints,
            ProgressionError::NegativeCost => Self::Validation("Points must not be negative".into()),
            ProgressionError::MaxLevel => Self::Validation("Maximum level reached".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match std::error::Error::source(&self) {
                Some(cause) => error!(error = %self, cause = %cause, "request failed"),
                None => error!(error = %self, "request failed"),
            }
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
