use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rejection reported by the hosted backend; the message is shown verbatim.
    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    Upload(String),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation { field, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Backend(_) | AppError::Upload(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AppError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Logs the cause and returns the message shown to the caller. Database
    /// details stay in the log.
    pub fn report(&self) -> String {
        match self {
            AppError::NotFound => "পাওয়া যায়নি".to_string(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::Backend(msg) => {
                warn!("backend rejected request: {}", msg);
                msg.clone()
            }
            AppError::Upload(msg) => {
                warn!("upload failed: {}", msg);
                msg.clone()
            }
            AppError::Http(e) => {
                error!("backend unreachable: {}", e);
                e.to_string()
            }
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                msg.clone()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.report(),
            field: self.field(),
        });

        (status, body).into_response()
    }
}
