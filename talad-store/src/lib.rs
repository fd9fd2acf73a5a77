pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod lot_repo;
pub mod memory;
pub mod payment_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use lot_repo::PgLotRepository;
pub use memory::MemoryStore;
pub use payment_repo::PgPaymentRepository;

use talad_core::repository::StoreError;

/// Parse a TEXT column that holds one of the domain enums. A value that does
/// not parse means the row predates the engine or was edited by hand; either
/// way it is a backend problem, not a caller error.
pub(crate) fn parse_stored<T>(raw: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|err| StoreError::Backend(format!("corrupt stored value {raw:?}: {err}")))
}

/// Classify a sqlx failure so the engine can tell retryable trouble from
/// conflicts without seeing sqlx types.
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            StoreError::DuplicateKey(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation => {
            StoreError::Constraint(db.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}
