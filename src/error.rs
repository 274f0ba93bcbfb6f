use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{auth::AuthError, users::repo_types::StoreError, webhooks::WebhookError};

/// Request-scoped failure. The detail is logged; clients only see the status
/// and a generic message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("not found")]
    NotFound,
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Bad request",
            AppError::Auth(_) => "Unauthorized",
            AppError::NotFound => "Not found",
            AppError::Persistence(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Persistence(detail) => error!(error = %detail, "request failed"),
            other => warn!(error = %other, "request rejected"),
        }
        (self.status(), self.public_message()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e.to_string())
    }
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::MissingHeader(_) => AppError::Validation(e.to_string()),
            WebhookError::InvalidSecret(_) => AppError::Persistence(e.to_string()),
            other => AppError::Auth(other.to_string()),
        }
    }
}
