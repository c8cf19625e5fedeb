use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{services::embedding::EmbeddingError, state::state_machine::InvalidTransition};

/// Game-rule errors raised by the room engine.
///
/// Every variant aborts the in-progress action before any mutation is
/// committed, is returned only to the caller that issued the action, and is
/// never broadcast to the room.
#[derive(Debug, Error)]
pub enum GameError {
    /// Referenced room, player, question or answer does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Action is illegal in the room's current status.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),
    /// Room is full or the round ceiling has been reached.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    /// Duplicate player name or a self-guess.
    #[error("conflict: {0}")]
    Conflict(String),
    /// No active questions, or no submitted answers to reveal.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
    /// The similarity provider failed; the action was aborted untouched.
    #[error("dependency failure: {0}")]
    Dependency(#[from] EmbeddingError),
    /// The room's exclusive section could not be acquired in time.
    #[error("room action timed out")]
    Timeout,
}

impl From<InvalidTransition> for GameError {
    fn from(err: InvalidTransition) -> Self {
        GameError::InvalidPhase(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable (provider failure or lock timeout).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::NotFound(message) => AppError::NotFound(message),
            GameError::InvalidPhase(message)
            | GameError::CapacityExceeded(message)
            | GameError::Conflict(message) => AppError::Conflict(message),
            GameError::ResourceUnavailable(message) => AppError::BadRequest(message),
            GameError::Dependency(source) => AppError::ServiceUnavailable(source.to_string()),
            GameError::Timeout => AppError::ServiceUnavailable("room action timed out".into()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
