use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use talad_booking::{Booking, BookingStatus, PaymentOutcome, PaymentRecord, PaymentStatus};
use talad_catalog::{Lot, LotStatus, Section};
use talad_shared::{PageRequest, Paged};

/// Storage failures, classified at the store boundary so the engine never
/// has to inspect backend-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub section: Option<Section>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Substring match on the vendor phone.
    pub phone: Option<String>,
    pub lot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub booking_id: Option<Uuid>,
    pub outcome: Option<PaymentOutcome>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LotTallies {
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub maintenance: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BookingTallies {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PaymentTallies {
    pub pending: i64,
    pub submitted: i64,
    pub verified: i64,
    pub failed: i64,
}

/// Lot persistence. `update_lot_status_if` is the only status mutation the
/// engine trusts: it must compare and swap in a single atomic step and
/// report whether the expected state matched. `update_lot` writes the
/// descriptive fields only and never touches status.
#[async_trait]
pub trait LotRepository: Send + Sync {
    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()>;

    async fn get_lot(&self, id: Uuid) -> StoreResult<Option<Lot>>;

    async fn get_lot_by_number(&self, lot_number: &str) -> StoreResult<Option<Lot>>;

    /// Sorted by lot number.
    async fn list_lots(&self, filter: &LotFilter, page: PageRequest) -> StoreResult<Paged<Lot>>;

    /// Returns false when the lot does not exist.
    async fn update_lot(&self, lot: &Lot) -> StoreResult<bool>;

    /// Returns false when the lot does not exist.
    async fn delete_lot(&self, id: Uuid) -> StoreResult<bool>;

    /// Atomically move the lot from `expected` to `next`. Returns false when
    /// the lot was missing or not in `expected`, in which case nothing
    /// changed.
    async fn update_lot_status_if(
        &self,
        id: Uuid,
        expected: LotStatus,
        next: LotStatus,
    ) -> StoreResult<bool>;

    /// Wipe the catalog and install `lots` in its place.
    async fn replace_all_lots(&self, lots: &[Lot]) -> StoreResult<()>;

    async fn lot_tallies(&self) -> StoreResult<LotTallies>;
}

/// Booking persistence. All writes after the initial insert go through
/// `update_booking_guarded` so every state change is a compare-and-set.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<Booking>>;

    /// Persist the mutable state of `booking` (status, payment_status,
    /// slip_url, cancel_reason, updated_at) only if the stored row still
    /// carries `expected_status` (and `expected_payment`, when given).
    /// Returns false when the guard missed; nothing was written in that
    /// case. Vendor, period and total are immutable after insert.
    async fn update_booking_guarded(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_payment: Option<PaymentStatus>,
    ) -> StoreResult<bool>;

    /// Returns false when the booking does not exist.
    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool>;

    /// The Pending or Confirmed booking currently holding the lot, if any.
    async fn active_booking_for_lot(&self, lot_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn booking_tallies(&self) -> StoreResult<BookingTallies>;

    async fn payment_tallies(&self) -> StoreResult<PaymentTallies>;

    /// Sum of `total_satang` over bookings with status Confirmed and
    /// payment_status Verified.
    async fn verified_revenue(&self) -> StoreResult<i64>;

    async fn recent_bookings(&self, limit: u32) -> StoreResult<Vec<Booking>>;

    /// Case-insensitive substring match on vendor name, email or phone.
    async fn search_vendors(&self, query: &str, limit: u32) -> StoreResult<Vec<Booking>>;
}

/// Append-only verification records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()>;

    /// Newest first.
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PaymentRecord>>;

    async fn payments_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<PaymentRecord>>;
}
