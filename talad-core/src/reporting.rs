use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use talad_booking::{Booking, PaymentRecord};
use talad_catalog::Lot;
use talad_shared::{PageRequest, Paged};

use crate::repository::{
    BookingFilter, BookingRepository, BookingTallies, LotFilter, LotRepository, LotTallies,
    PaymentFilter, PaymentRepository, PaymentTallies,
};
use crate::{EngineError, EngineResult};

const RECENT_BOOKINGS: u32 = 5;
const SEARCH_LIMIT: u32 = 10;

/// A booking with its lot resolved. The lot can be gone when an admin
/// deleted it after the booking was cancelled.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithLot {
    #[serde(flatten)]
    pub booking: Booking,
    pub lot: Option<Lot>,
}

/// Detail view of one booking: the lot plus the verification trail.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub lot: Option<Lot>,
    pub payments: Vec<PaymentRecord>,
}

/// Detail view of one lot, with the booking currently holding it.
#[derive(Debug, Clone, Serialize)]
pub struct LotDetail {
    #[serde(flatten)]
    pub lot: Lot,
    pub active_booking: Option<Booking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub currency: String,
    pub lots: LotTallies,
    pub bookings: BookingTallies,
    pub payments: PaymentTallies,
    /// Sum over bookings that are Confirmed with a Verified payment.
    pub revenue_satang: i64,
    pub recent_bookings: Vec<BookingWithLot>,
}

/// Read-only queries over the whole market. Tolerates stale reads; never
/// writes anything.
#[derive(Clone)]
pub struct Reporting {
    lots: Arc<dyn LotRepository>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    currency: String,
}

impl Reporting {
    pub fn new(
        lots: Arc<dyn LotRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        currency: String,
    ) -> Self {
        Self {
            lots,
            bookings,
            payments,
            currency,
        }
    }

    pub async fn list_lots(
        &self,
        filter: &LotFilter,
        page: PageRequest,
    ) -> EngineResult<Paged<Lot>> {
        Ok(self.lots.list_lots(filter, page).await?)
    }

    pub async fn get_lot(&self, lot_id: Uuid) -> EngineResult<LotDetail> {
        let lot = self
            .lots
            .get_lot(lot_id)
            .await?
            .ok_or_else(|| EngineError::not_found("lot", lot_id))?;
        let active_booking = self.bookings.active_booking_for_lot(lot_id).await?;
        Ok(LotDetail {
            lot,
            active_booking,
        })
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> EngineResult<BookingDetail> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;
        let lot = self.lots.get_lot(booking.lot_id).await?;
        let payments = self.payments.payments_for_booking(booking_id).await?;
        Ok(BookingDetail {
            booking,
            lot,
            payments,
        })
    }

    pub async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> EngineResult<Paged<BookingWithLot>> {
        let listed = self.bookings.list_bookings(filter, page).await?;
        let Paged {
            items,
            total,
            page,
            limit,
            total_pages,
        } = listed;
        // One lot lookup per row. Pages are capped small, so this stays
        // cheap without a join cache.
        let mut joined = Vec::with_capacity(items.len());
        for booking in items {
            let lot = self.lots.get_lot(booking.lot_id).await?;
            joined.push(BookingWithLot { booking, lot });
        }
        Ok(Paged {
            items: joined,
            total,
            page,
            limit,
            total_pages,
        })
    }

    pub async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> EngineResult<Paged<PaymentRecord>> {
        Ok(self.payments.list_payments(filter, page).await?)
    }

    /// Admin search box: substring match across vendor name, email and
    /// phone, capped to a short list.
    pub async fn search_vendors(&self, query: &str) -> EngineResult<Vec<Booking>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::Validation(
                "search query is required".to_string(),
            ));
        }
        Ok(self.bookings.search_vendors(query, SEARCH_LIMIT).await?)
    }

    pub async fn dashboard(&self) -> EngineResult<DashboardStats> {
        let lots = self.lots.lot_tallies().await?;
        let bookings = self.bookings.booking_tallies().await?;
        let payments = self.bookings.payment_tallies().await?;
        let revenue_satang = self.bookings.verified_revenue().await?;

        let recent = self.bookings.recent_bookings(RECENT_BOOKINGS).await?;
        let mut recent_bookings = Vec::with_capacity(recent.len());
        for booking in recent {
            let lot = self.lots.get_lot(booking.lot_id).await?;
            recent_bookings.push(BookingWithLot { booking, lot });
        }

        Ok(DashboardStats {
            currency: self.currency.clone(),
            lots,
            bookings,
            payments,
            revenue_satang,
            recent_bookings,
        })
    }
}
