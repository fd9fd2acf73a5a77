use std::fmt::Display;
use std::str::FromStr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use talad_core::EngineError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    ServiceUnavailable(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Map an engine error onto an HTTP class. A dedicated `From` impl would
    /// collide with the blanket anyhow conversion below, so this stays a
    /// named constructor used via `map_err`.
    pub fn from_engine(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => AppError::ValidationError(msg),
            EngineError::NotFound { kind, id } => {
                AppError::NotFoundError(format!("{} {} not found", kind, id))
            }
            EngineError::LotUnavailable(lot) => {
                AppError::ConflictError(format!("Lot {} is not available", lot))
            }
            EngineError::BookingAlreadyCancelled(id) => {
                AppError::ConflictError(format!("Booking {} is already cancelled", id))
            }
            EngineError::PaymentAlreadyFinalized(id) => {
                AppError::ConflictError(format!("Payment for booking {} is already finalized", id))
            }
            EngineError::DuplicateLotNumber(number) => {
                AppError::ConflictError(format!("Lot number {} is already taken", number))
            }
            EngineError::LotHasActiveBooking(id) => {
                AppError::ConflictError(format!("Lot {} has an active booking", id))
            }
            EngineError::Conflict(msg) => AppError::ConflictError(msg),
            EngineError::Transient(msg) => AppError::ServiceUnavailable(msg),
            EngineError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

/// Parse an optional query-string value into a typed filter. A bad value
/// becomes a 400 instead of silently dropping the filter.
pub fn parse_query_filter<T>(raw: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|value| value.parse::<T>())
        .transpose()
        .map_err(|err| AppError::ValidationError(err.to_string()))
}
