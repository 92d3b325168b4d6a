use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can surface. All routes go through the single
/// `IntoResponse` impl below, so clients always see `{ message, code }`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,

    #[error("Error occurred during purchase")]
    PurchaseFailed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to issue token")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidId(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::PurchaseFailed | AppError::Store(_) | AppError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidId(_) => "request.invalid_id",
            AppError::Validation(_) => "validation.failed",
            AppError::Unauthorized => "auth.missing",
            AppError::Forbidden => "auth.forbidden",
            AppError::PurchaseFailed => "purchase.failed",
            AppError::Store(_) | AppError::Token(_) => "server.error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            debug!(code = self.code(), error = %self, "request rejected");
        }

        (
            status,
            Json(json!({ "message": self.to_string(), "code": self.code() })),
        )
            .into_response()
    }
}
