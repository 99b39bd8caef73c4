use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::command::CommandError;
use crate::port::PortError;

/// A specialized `Result` type for HTTP handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced to the remote caller of the control endpoint.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request was malformed or out of range.
    #[error("{0}")]
    InvalidCommand(#[from] CommandError),

    /// The device write failed, including "no device connected".
    #[error("{0}")]
    Port(#[from] PortError),

    /// The blocking write task died before reporting back.
    #[error("write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            Self::Port(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCommand(_) => "InvalidCommand",
            Self::Port(PortError::NotConnected) => "NotConnected",
            Self::Port(_) => "WriteError",
            Self::Task(_) => "TaskError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = axum::Json(json!({
            "status": "error",
            "error": { "type": self.kind(), "message": self.to_string() }
        }));
        (self.status(), body).into_response()
    }
}
