use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use talad_booking::{Booking, BookingStatus, PaymentStatus, StallPeriod, Vendor};
use talad_catalog::{default_market_plan, Lot, LotPatch, LotStatus};

use crate::repository::{BookingRepository, LotRepository, StoreError};
use crate::{EngineError, EngineResult};

/// What a vendor asks for when opening a booking. Validated in full before
/// any storage traffic happens.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub lot_id: Uuid,
    pub vendor: Vendor,
    pub period: StallPeriod,
    pub notes: Option<String>,
}

/// Owns every mutation of lots and bookings. All status changes go through
/// the store's compare-and-set primitives, so two coordinators (or two
/// replicas of the whole service) can race safely.
#[derive(Clone)]
pub struct ReservationCoordinator {
    lots: Arc<dyn LotRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl ReservationCoordinator {
    pub fn new(lots: Arc<dyn LotRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { lots, bookings }
    }

    /// Open a booking on an available lot.
    ///
    /// The lot is claimed with a conditional Available -> Reserved flip
    /// before the booking row is written. Exactly one of N concurrent
    /// callers wins the flip; the others get `LotUnavailable` without ever
    /// inserting anything.
    pub async fn create_booking(&self, request: BookingRequest) -> EngineResult<Booking> {
        request.vendor.validate()?;
        request.period.validate()?;

        let lot = self
            .lots
            .get_lot(request.lot_id)
            .await?
            .ok_or_else(|| EngineError::not_found("lot", request.lot_id))?;

        let claimed = self
            .lots
            .update_lot_status_if(lot.id, LotStatus::Available, LotStatus::Reserved)
            .await?;
        if !claimed {
            return Err(EngineError::LotUnavailable(lot.lot_number.clone()));
        }

        let total = request.period.total_satang(lot.price_satang);
        let booking = Booking::new(lot.id, request.vendor, request.period, total, request.notes);

        if let Err(err) = self.bookings.insert_booking(&booking).await {
            // Hand the claim back. If someone else already moved the lot the
            // flip misses, which is fine.
            if let Err(release_err) = self
                .lots
                .update_lot_status_if(lot.id, LotStatus::Reserved, LotStatus::Available)
                .await
            {
                warn!(
                    "Failed to release lot {} after insert failure: {}",
                    lot.lot_number, release_err
                );
            }
            return Err(err.into());
        }

        info!("Booking {} created on lot {}", booking.id, lot.lot_number);
        Ok(booking)
    }

    /// Cancel a booking. Idempotent: cancelling an already-cancelled booking
    /// returns it unchanged and releases nothing a second time.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> EngineResult<Booking> {
        let current = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;

        if current.status == BookingStatus::Cancelled {
            return Ok(current);
        }

        let observed_status = current.status;
        let mut cancelled = current;
        cancelled.update_status(BookingStatus::Cancelled);
        cancelled.cancel_reason = reason;
        // A verified payment stays on the record; anything earlier is failed
        // along with the booking.
        if cancelled.payment_status != PaymentStatus::Verified {
            cancelled.update_payment_status(PaymentStatus::Failed);
        }

        // Guard on the booking status only. A slip submitted in parallel
        // must not block the cancellation.
        let won = self
            .bookings
            .update_booking_guarded(&cancelled, observed_status, None)
            .await?;
        if !won {
            let now = self
                .bookings
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| EngineError::not_found("booking", booking_id))?;
            if now.status == BookingStatus::Cancelled {
                return Ok(now);
            }
            if now.payment_status == PaymentStatus::Verified {
                return Err(EngineError::PaymentAlreadyFinalized(booking_id.to_string()));
            }
            return Err(EngineError::Conflict(format!(
                "booking {booking_id} changed during cancellation"
            )));
        }

        self.release_lot_if_free(cancelled.lot_id).await?;

        info!("Booking {} cancelled", booking_id);
        Ok(cancelled)
    }

    /// Hard delete. The booking row goes away, its verification records stay.
    pub async fn delete_booking(&self, booking_id: Uuid) -> EngineResult<()> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;

        if !self.bookings.delete_booking(booking_id).await? {
            return Err(EngineError::not_found("booking", booking_id));
        }

        if booking.status.is_active() {
            self.release_lot_if_free(booking.lot_id).await?;
        }

        info!("Booking {} deleted", booking_id);
        Ok(())
    }

    /// Release the lot only when no active booking claims it anymore. The
    /// conditional Reserved -> Available flip leaves a Maintenance lot
    /// untouched.
    async fn release_lot_if_free(&self, lot_id: Uuid) -> EngineResult<()> {
        if self.bookings.active_booking_for_lot(lot_id).await?.is_some() {
            return Ok(());
        }
        let released = self
            .lots
            .update_lot_status_if(lot_id, LotStatus::Reserved, LotStatus::Available)
            .await?;
        if released {
            info!("Lot {} released", lot_id);
        }
        Ok(())
    }

    pub async fn create_lot(&self, lot: Lot) -> EngineResult<Lot> {
        lot.validate()?;
        if self
            .lots
            .get_lot_by_number(&lot.lot_number)
            .await?
            .is_some()
        {
            return Err(EngineError::DuplicateLotNumber(lot.lot_number.clone()));
        }
        match self.lots.insert_lot(&lot).await {
            Ok(()) => {
                info!("Lot {} created", lot.lot_number);
                Ok(lot)
            }
            // The unique index is the real arbiter when two creates race.
            Err(StoreError::DuplicateKey(_)) => {
                Err(EngineError::DuplicateLotNumber(lot.lot_number.clone()))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Admin edit of a lot. Descriptive fields are written directly; a
    /// status change is only ever a toggle between Available and
    /// Maintenance, taken through the compare-and-set so a booking claimed
    /// in parallel is never overwritten.
    pub async fn update_lot(&self, lot_id: Uuid, patch: LotPatch) -> EngineResult<Lot> {
        if patch.is_empty() {
            return Err(EngineError::Validation("no fields to update".to_string()));
        }

        let mut lot = self
            .lots
            .get_lot(lot_id)
            .await?
            .ok_or_else(|| EngineError::not_found("lot", lot_id))?;

        if let Some(next) = patch.status {
            if next == LotStatus::Reserved {
                return Err(EngineError::Validation(
                    "lot status cannot be set to RESERVED directly".to_string(),
                ));
            }
            if lot.status == LotStatus::Reserved {
                return Err(EngineError::Conflict(format!(
                    "lot {} is held by a booking",
                    lot.lot_number
                )));
            }
            if next != lot.status {
                let flipped = self
                    .lots
                    .update_lot_status_if(lot_id, lot.status, next)
                    .await?;
                if !flipped {
                    return Err(EngineError::Conflict(format!(
                        "lot {} changed state during update",
                        lot.lot_number
                    )));
                }
                lot.update_status(next);
            }
        }

        let mut attrs = patch;
        attrs.status = None;
        if !attrs.is_empty() {
            attrs.apply(&mut lot)?;
            if !self.lots.update_lot(&lot).await? {
                return Err(EngineError::not_found("lot", lot_id));
            }
        }

        info!("Lot {} updated", lot.lot_number);
        Ok(lot)
    }

    /// Delete a lot. Refused while an active booking holds it; historical
    /// bookings keep the row alive through the foreign key, surfaced as a
    /// conflict.
    pub async fn delete_lot(&self, lot_id: Uuid) -> EngineResult<()> {
        let lot = self
            .lots
            .get_lot(lot_id)
            .await?
            .ok_or_else(|| EngineError::not_found("lot", lot_id))?;

        if self.bookings.active_booking_for_lot(lot_id).await?.is_some() {
            return Err(EngineError::LotHasActiveBooking(lot.lot_number.clone()));
        }

        match self.lots.delete_lot(lot_id).await {
            Ok(true) => {
                info!("Lot {} deleted", lot.lot_number);
                Ok(())
            }
            Ok(false) => Err(EngineError::not_found("lot", lot_id)),
            Err(StoreError::Constraint(_)) => Err(EngineError::Conflict(format!(
                "lot {} is referenced by bookings",
                lot.lot_number
            ))),
            Err(other) => Err(other.into()),
        }
    }

    /// Wipe the catalog and install the default market plan. Refused while
    /// any booking rows exist; reseeding under live bookings would orphan
    /// them.
    pub async fn seed_market(&self) -> EngineResult<Vec<Lot>> {
        let tallies = self.bookings.booking_tallies().await?;
        if tallies.total > 0 {
            return Err(EngineError::Conflict(
                "market has bookings; remove them before reseeding".to_string(),
            ));
        }

        let plan = default_market_plan();
        self.lots.replace_all_lots(&plan).await?;
        info!("Market plan seeded with {} lots", plan.len());
        Ok(plan)
    }
}
