//! HTTP mapping for the shared error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use opmeter_core::error::OpMeterError;

/// `OpMeterError` carried across the HTTP boundary.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub OpMeterError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OpMeterError::BadRequest(_) | OpMeterError::UnsupportedVersion => StatusCode::BAD_REQUEST,
            OpMeterError::UnknownOperation(_) => StatusCode::NOT_FOUND,
            OpMeterError::ContextClosed { .. }
            | OpMeterError::CounterOverflow { .. }
            | OpMeterError::Sink(_)
            | OpMeterError::Serialize(_)
            | OpMeterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
