use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::db::store::StoreError;
use crate::services::booking::BookingError;
use crate::services::reports::ReportError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotTaken => AppError::Conflict(err.to_string()),
            other => AppError::Infrastructure(other.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::PastOrPresentDate { .. }
            | BookingError::InvalidStatus(_)
            | BookingError::IllegalTransition { .. } => AppError::Validation(err.to_string()),
            BookingError::SlotUnavailable { .. } | BookingError::StatusChanged { .. } => {
                AppError::Conflict(err.to_string())
            }
            BookingError::NotFound(_) => AppError::NotFound(err.to_string()),
            BookingError::Store(store) => store.into(),
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Infrastructure(err.to_string())
    }
}

/// A body that fails to parse is the caller's mistake, never a 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
