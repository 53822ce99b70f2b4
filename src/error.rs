use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors that leave the process as JSON responses.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationFailed(String),

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Invalid token or user is inactive")]
    InvalidOrInactiveUser,

    #[error("Media catalog unavailable")]
    SourceUnavailable(String),

    #[error("Internal server error")]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::MissingToken
            | AppError::InvalidOrExpiredToken
            | AppError::InvalidOrInactiveUser => StatusCode::UNAUTHORIZED,
            AppError::AccountInactive => StatusCode::FORBIDDEN,
            AppError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::SourceUnavailable(details) => Some(details.clone()),
            AppError::Unexpected(e) if cfg!(debug_assertions) => Some(format!("{e:#}")),
            _ => None,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Unexpected(e) => tracing::error!(error = ?e, "unexpected error"),
            AppError::SourceUnavailable(details) => {
                tracing::warn!(details = %details, "media catalog unavailable")
            }
            _ => {}
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
