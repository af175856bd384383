use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use messagely_auth::TokenError;
use messagely_auth::password::PasswordError;
use messagely_db::StoreError;
use messagely_types::api::ErrorResponse;

/// Every way a request can fail, each with a fixed status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token, or one that does not verify.
    #[error("missing or invalid token")]
    InvalidToken,

    /// Login failed. Deliberately the same for unknown users and wrong passwords.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("username already taken")]
    DuplicateUsername,

    #[error("permission denied")]
    PermissionDenied,

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => ApiError::DuplicateUsername,
            StoreError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => ApiError::InvalidToken,
            TokenError::Signing(e) => ApiError::Internal(format!("token signing failed: {e}")),
            TokenError::Lifetime => ApiError::Internal(TokenError::Lifetime.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
