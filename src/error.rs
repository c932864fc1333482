//! Error types for the scheduler.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// A task or settings submission that cannot be admitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title required")]
    EmptyTitle,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("weekdays must not be empty")]
    EmptyWeekdays,

    #[error("weekday out of range: {0}")]
    InvalidWeekday(String),

    #[error("monthDays must not be empty")]
    EmptyMonthDays,

    #[error("day of month out of range: {0}")]
    InvalidMonthDay(String),

    #[error("unknown recurring type: {0}")]
    InvalidRecurringType(String),

    #[error("unknown task type: {0}")]
    InvalidTaskType(String),

    #[error("endDate {end} is before startDate {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("invalid month: {0}")]
    InvalidMonth(String),

    #[error("step must be one of 5, 10, 15, 30, 60 (got {0})")]
    InvalidStep(u32),

    #[error("dailyHours must be one of 0, 2, 4, 6, 8 (got {0})")]
    InvalidDailyHours(u32),
}

/// Failure of the key-value persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Failure of a backup import. Existing state is untouched in every case.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors of the local planner's task operations.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = PlannerError> = std::result::Result<T, E>;

/// Error returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<PlannerError> for ApiError {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::Validation(v) => ApiError::BadRequest(v.to_string()),
            PlannerError::NotFound(_) => ApiError::NotFound(e.to_string()),
            PlannerError::Store(s) => ApiError::from(s),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::InvalidFormat(_) => ApiError::BadRequest(e.to_string()),
            ImportError::Store(s) => ApiError::from(s),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "storage failure");
        ApiError::Internal("storage failure".to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

/// `Json` extractor that rejects with [`ApiError`], so undecodable bodies
/// get a 400 with the usual error document.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
