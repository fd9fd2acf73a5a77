pub mod reporting;
pub mod repository;
pub mod reservation;
pub mod verification;

use crate::repository::StoreError;
use talad_booking::BookingError;
use talad_catalog::CatalogError;

/// Engine-level failures. Conflict-shaped variants are kept separate from
/// validation and transient storage trouble so the HTTP layer can map each
/// family to the right status code without string matching.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Lot {0} is not available")]
    LotUnavailable(String),

    #[error("Booking {0} is already cancelled")]
    BookingAlreadyCancelled(String),

    #[error("Payment for booking {0} is already finalized")]
    PaymentAlreadyFinalized(String),

    #[error("Lot number {0} is already taken")]
    DuplicateLotNumber(String),

    #[error("Lot {0} has an active booking")]
    LotHasActiveBooking(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("Storage temporarily unavailable: {0}")]
    Transient(String),

    #[error("Internal engine error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => EngineError::Transient(msg),
            StoreError::DuplicateKey(msg) => EngineError::Conflict(msg),
            StoreError::Constraint(msg) => EngineError::Conflict(msg),
            StoreError::Backend(msg) => EngineError::Internal(msg),
        }
    }
}

impl From<BookingError> for EngineError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidTransition { .. } => EngineError::Conflict(err.to_string()),
            other => EngineError::Validation(other.to_string()),
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        EngineError::Validation(err.to_string())
    }
}
