use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Infrastructure failures. Expected backend and validation failures are
/// rendered into pages by the handlers and never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

/// Only raised while locating the configuration directory.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SessionError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let error = match &self {
            AppError::SessionError(msg) => {
                tracing::error!(error = %msg, "Session store failure");
                "Session error"
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Configuration failure");
                "Configuration error"
            }
        };

        (
            self.status_code(),
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}
