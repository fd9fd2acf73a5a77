use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use talad_booking::{Booking, BookingStatus, PaymentRecord, PaymentStatus};
use talad_catalog::{Lot, LotStatus};
use talad_core::repository::{
    BookingFilter, BookingRepository, BookingTallies, LotFilter, LotRepository, LotTallies,
    PaymentFilter, PaymentRepository, PaymentTallies, StoreError, StoreResult,
};
use talad_shared::{PageRequest, Paged};

#[derive(Default)]
struct Tables {
    lots: HashMap<Uuid, Lot>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<PaymentRecord>,
}

/// In-memory store for demos and tests. A single lock over all tables makes
/// every operation atomic, which is what the compare-and-set contract
/// requires. Mirrors the Postgres schema rules: unique lot numbers, unique
/// transaction ids, and bookings keeping their lot row alive.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Paged<T> {
    let total = items.len() as u64;
    let window = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Paged::new(window, total, page)
}

#[async_trait]
impl LotRepository for MemoryStore {
    async fn insert_lot(&self, lot: &Lot) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.lots.contains_key(&lot.id)
            || tables.lots.values().any(|l| l.lot_number == lot.lot_number)
        {
            return Err(StoreError::DuplicateKey(format!(
                "lot {} already exists",
                lot.lot_number
            )));
        }
        tables.lots.insert(lot.id, lot.clone());
        Ok(())
    }

    async fn get_lot(&self, id: Uuid) -> StoreResult<Option<Lot>> {
        let tables = self.tables.lock().await;
        Ok(tables.lots.get(&id).cloned())
    }

    async fn get_lot_by_number(&self, lot_number: &str) -> StoreResult<Option<Lot>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .lots
            .values()
            .find(|l| l.lot_number == lot_number)
            .cloned())
    }

    async fn list_lots(&self, filter: &LotFilter, page: PageRequest) -> StoreResult<Paged<Lot>> {
        let tables = self.tables.lock().await;
        let mut lots: Vec<Lot> = tables
            .lots
            .values()
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .filter(|l| filter.section.map_or(true, |s| l.section == s))
            .cloned()
            .collect();
        lots.sort_by(|a, b| a.lot_number.cmp(&b.lot_number));
        Ok(paginate(lots, page))
    }

    async fn update_lot(&self, lot: &Lot) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.lots.get_mut(&lot.id) {
            Some(stored) => {
                // Descriptive fields only; status is owned by the CAS below.
                stored.location = lot.location.clone();
                stored.size = lot.size.clone();
                stored.price_satang = lot.price_satang;
                stored.zone_type = lot.zone_type;
                stored.updated_at = lot.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_lot(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.bookings.values().any(|b| b.lot_id == id) {
            return Err(StoreError::Constraint(
                "lot is referenced by bookings".to_string(),
            ));
        }
        Ok(tables.lots.remove(&id).is_some())
    }

    async fn update_lot_status_if(
        &self,
        id: Uuid,
        expected: LotStatus,
        next: LotStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.lots.get_mut(&id) {
            Some(lot) if lot.status == expected => {
                lot.status = next;
                lot.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_all_lots(&self, lots: &[Lot]) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.lots.clear();
        for lot in lots {
            if tables.lots.values().any(|l| l.lot_number == lot.lot_number) {
                return Err(StoreError::DuplicateKey(format!(
                    "lot {} already exists",
                    lot.lot_number
                )));
            }
            tables.lots.insert(lot.id, lot.clone());
        }
        Ok(())
    }

    async fn lot_tallies(&self) -> StoreResult<LotTallies> {
        let tables = self.tables.lock().await;
        let mut tallies = LotTallies {
            total: tables.lots.len() as i64,
            ..LotTallies::default()
        };
        for lot in tables.lots.values() {
            match lot.status {
                LotStatus::Available => tallies.available += 1,
                LotStatus::Reserved => tallies.reserved += 1,
                LotStatus::Maintenance => tallies.maintenance += 1,
            }
        }
        Ok(tallies)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.lots.contains_key(&booking.lot_id) {
            return Err(StoreError::Constraint(format!(
                "booking references unknown lot {}",
                booking.lot_id
            )));
        }
        if tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::DuplicateKey(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables.bookings.get(&id).cloned())
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<Booking>> {
        let tables = self.tables.lock().await;
        let phone = filter.phone.as_deref().map(str::to_lowercase);
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.payment_status.map_or(true, |s| b.payment_status == s))
            .filter(|b| {
                phone
                    .as_deref()
                    .map_or(true, |p| b.vendor.phone.inner().to_lowercase().contains(p))
            })
            .filter(|b| filter.lot_id.map_or(true, |id| b.lot_id == id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(bookings, page))
    }

    async fn update_booking_guarded(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_payment: Option<PaymentStatus>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let stored = match tables.bookings.get_mut(&booking.id) {
            Some(stored) => stored,
            None => return Ok(false),
        };
        if stored.status != expected_status {
            return Ok(false);
        }
        if let Some(expected) = expected_payment {
            if stored.payment_status != expected {
                return Ok(false);
            }
        }
        stored.status = booking.status;
        stored.payment_status = booking.payment_status;
        stored.slip_url = booking.slip_url.clone();
        stored.cancel_reason = booking.cancel_reason.clone();
        stored.updated_at = booking.updated_at;
        Ok(true)
    }

    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.bookings.remove(&id).is_some())
    }

    async fn active_booking_for_lot(&self, lot_id: Uuid) -> StoreResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.lot_id == lot_id && b.status.is_active())
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn booking_tallies(&self) -> StoreResult<BookingTallies> {
        let tables = self.tables.lock().await;
        let mut tallies = BookingTallies {
            total: tables.bookings.len() as i64,
            ..BookingTallies::default()
        };
        for booking in tables.bookings.values() {
            match booking.status {
                BookingStatus::Pending => tallies.pending += 1,
                BookingStatus::Confirmed => tallies.confirmed += 1,
                BookingStatus::Cancelled => tallies.cancelled += 1,
            }
        }
        Ok(tallies)
    }

    async fn payment_tallies(&self) -> StoreResult<PaymentTallies> {
        let tables = self.tables.lock().await;
        let mut tallies = PaymentTallies::default();
        for booking in tables.bookings.values() {
            match booking.payment_status {
                PaymentStatus::Pending => tallies.pending += 1,
                PaymentStatus::Submitted => tallies.submitted += 1,
                PaymentStatus::Verified => tallies.verified += 1,
                PaymentStatus::Failed => tallies.failed += 1,
            }
        }
        Ok(tallies)
    }

    async fn verified_revenue(&self) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Confirmed
                    && b.payment_status == PaymentStatus::Verified
            })
            .map(|b| b.total_satang)
            .sum())
    }

    async fn recent_bookings(&self, limit: u32) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables.bookings.values().cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings.truncate(limit as usize);
        Ok(bookings)
    }

    async fn search_vendors(&self, query: &str, limit: u32) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let needle = query.to_lowercase();
        let mut hits: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| {
                b.vendor.name.to_lowercase().contains(&needle)
                    || b.vendor.email.inner().to_lowercase().contains(&needle)
                    || b.vendor.phone.inner().to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables
            .payments
            .iter()
            .any(|p| p.transaction_id == record.transaction_id)
        {
            return Err(StoreError::DuplicateKey(format!(
                "transaction {} already recorded",
                record.transaction_id
            )));
        }
        tables.payments.push(record.clone());
        Ok(())
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Paged<PaymentRecord>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<PaymentRecord> = tables
            .payments
            .iter()
            .filter(|p| filter.booking_id.map_or(true, |id| p.booking_id == id))
            .filter(|p| filter.outcome.map_or(true, |o| p.outcome == o))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(paginate(records, page))
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<PaymentRecord>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<PaymentRecord> = tables
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }
}
