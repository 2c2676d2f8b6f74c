use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{
    cell::WriteError,
    round::RoundError,
    state_machine::StageError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A write was kept locally but did not reach the store.
    #[error("persistence failed")]
    Persistence(#[source] WriteError),
    /// A write was kept locally but did not reach the other contexts.
    #[error("broadcast failed")]
    Broadcast(#[source] WriteError),
    /// No game is in progress.
    #[error("no active question")]
    NoActiveQuestion,
    /// The answer was revealed earlier in the round.
    #[error("already revealed: {0}")]
    AlreadyRevealed(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<WriteError> for ServiceError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Broadcast { .. } => ServiceError::Broadcast(err),
            WriteError::Persistence { .. } | WriteError::Encode { .. } => {
                ServiceError::Persistence(err)
            }
        }
    }
}

impl From<RoundError> for ServiceError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::UnknownAnswer { .. } | RoundError::WordNotHeld { .. } => {
                ServiceError::NotFound(err.to_string())
            }
            RoundError::AlreadyRevealed { name } => ServiceError::AlreadyRevealed(name),
            RoundError::AlreadyClaimed { .. } => ServiceError::InvalidState(err.to_string()),
            RoundError::EmptyGuess | RoundError::Overflow { .. } => {
                ServiceError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<StageError> for ServiceError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::NoActiveQuestion => ServiceError::NoActiveQuestion,
            StageError::InvalidTransition { .. } | StageError::WrongStage { .. } => {
                ServiceError::InvalidState(err.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
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
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Persistence(source) | ServiceError::Broadcast(source) => {
                AppError::ServiceUnavailable(error_chain(&source))
            }
            ServiceError::NoActiveQuestion => AppError::Conflict("no active question".into()),
            ServiceError::AlreadyRevealed(name) => {
                AppError::Conflict(format!("`{name}` has already been revealed"))
            }
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

/// Render an error with its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
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
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
