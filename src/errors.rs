use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Generation already in progress: {0}")]
    Conflict(String),

    #[error("Generation service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            AppError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Prefixes the message with `context`, keeping the variant.
    pub fn with_context(self, context: &str) -> Self {
        let wrap = |message: String| format!("{}: {}", context, message);
        match self {
            AppError::NotFound(m) => AppError::NotFound(wrap(m)),
            AppError::AlreadyExists(m) => AppError::AlreadyExists(wrap(m)),
            AppError::ValidationError(m) => AppError::ValidationError(wrap(m)),
            AppError::Conflict(m) => AppError::Conflict(wrap(m)),
            AppError::UpstreamUnavailable(m) => AppError::UpstreamUnavailable(wrap(m)),
            AppError::MalformedResponse(m) => AppError::MalformedResponse(wrap(m)),
            AppError::PersistenceFailure(m) => AppError::PersistenceFailure(wrap(m)),
            AppError::InternalError(m) => AppError::InternalError(wrap(m)),
        }
    }

    /// Both upstream failure kinds mean "no usable text" to the pipelines.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable(_) | AppError::MalformedResponse(_)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_kind: String,
    pub message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error_kind: self.error_code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::PersistenceFailure(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
