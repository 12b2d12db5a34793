use crate::error::AppError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let mut body = json!({
            "error": self.kind(),
            "message": self.public_message(),
        });
        match &self {
            AppError::SlotConflict { conflicting } => {
                body["conflicting"] = json!(conflicting);
            }
            AppError::PaymentVerificationFailed { details } => {
                body["details"] = json!(details);
            }
            AppError::SettlementPartialFailure {
                period,
                failed_venues,
                ..
            } => {
                body["period"] = json!(period);
                body["failedVenues"] = json!(failed_venues);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

// Extractor failures surface as validation errors with the same JSON body

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::Validation("Request body is too large".into());
        }
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
