use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use talad_booking::{
    Booking, BookingStatus, PaymentMethod, PaymentOutcome, PaymentRecord, PaymentStatus,
};
use talad_catalog::LotStatus;

use crate::repository::{BookingRepository, LotRepository, PaymentRepository};
use crate::{EngineError, EngineResult};

/// An admin's ruling on a submitted slip.
#[derive(Debug, Clone)]
pub struct VerifyDecision {
    pub approve: bool,
    pub method: PaymentMethod,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    /// Recorded in the log only, not persisted.
    pub reviewed_by: Option<String>,
}

/// How a verification call ended. `AlreadyFinalized` is the replay answer:
/// the decision had already been made (or nothing was submitted) and the
/// call changed nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    Approved { booking: Booking },
    Rejected { booking: Booking },
    AlreadyFinalized { booking: Booking },
}

impl VerificationOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            VerificationOutcome::Approved { booking }
            | VerificationOutcome::Rejected { booking }
            | VerificationOutcome::AlreadyFinalized { booking } => booking,
        }
    }
}

/// Handles the payment-proof side of a booking: slip intake and the admin
/// approve/reject decision. Shares the compare-and-set discipline with the
/// coordinator so the two can never corrupt a booking between them.
#[derive(Clone)]
pub struct VerificationDesk {
    lots: Arc<dyn LotRepository>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl VerificationDesk {
    pub fn new(
        lots: Arc<dyn LotRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            lots,
            bookings,
            payments,
        }
    }

    /// Attach a payment slip to a booking and mark it Submitted.
    /// Resubmitting replaces the previous slip; submitting after the payment
    /// was verified is a no-op returning the current state.
    pub async fn submit_proof(&self, booking_id: Uuid, slip_url: String) -> EngineResult<Booking> {
        let slip_url = slip_url.trim().to_string();
        if slip_url.is_empty() {
            return Err(EngineError::Validation("slip URL is required".to_string()));
        }

        let current = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;

        if current.status == BookingStatus::Cancelled {
            return Err(EngineError::BookingAlreadyCancelled(booking_id.to_string()));
        }
        if current.payment_status == PaymentStatus::Verified {
            return Ok(current);
        }

        let mut updated = current.clone();
        updated.attach_slip(slip_url);
        updated.update_payment_status(PaymentStatus::Submitted);

        let won = self
            .bookings
            .update_booking_guarded(&updated, current.status, Some(current.payment_status))
            .await?;
        if !won {
            let now = self
                .bookings
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| EngineError::not_found("booking", booking_id))?;
            if now.status == BookingStatus::Cancelled {
                return Err(EngineError::BookingAlreadyCancelled(booking_id.to_string()));
            }
            if now.payment_status == PaymentStatus::Verified {
                return Err(EngineError::PaymentAlreadyFinalized(booking_id.to_string()));
            }
            return Err(EngineError::Conflict(format!(
                "booking {booking_id} changed while attaching the slip"
            )));
        }

        info!("Payment slip submitted for booking {}", booking_id);
        Ok(updated)
    }

    /// Rule on a submitted slip.
    ///
    /// The state flip is one conditional write keyed on the payment still
    /// being Submitted, so a second admin clicking a moment later lands in
    /// `AlreadyFinalized` instead of double-applying. A decision is only
    /// reachable while the slip is under review; Pending, Verified and
    /// Failed all answer with the current state unchanged.
    pub async fn verify_payment(
        &self,
        booking_id: Uuid,
        decision: VerifyDecision,
    ) -> EngineResult<VerificationOutcome> {
        let current = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;

        if current.status == BookingStatus::Cancelled {
            return Err(EngineError::BookingAlreadyCancelled(booking_id.to_string()));
        }
        if current.payment_status != PaymentStatus::Submitted {
            return Ok(VerificationOutcome::AlreadyFinalized { booking: current });
        }

        if decision.approve {
            self.approve(current, decision).await
        } else {
            self.reject(current, decision).await
        }
    }

    async fn approve(
        &self,
        current: Booking,
        decision: VerifyDecision,
    ) -> EngineResult<VerificationOutcome> {
        let mut approved = current.clone();
        approved.update_payment_status(PaymentStatus::Verified);
        approved.update_status(BookingStatus::Confirmed);

        let won = self
            .bookings
            .update_booking_guarded(&approved, current.status, Some(PaymentStatus::Submitted))
            .await?;
        if !won {
            return self.reread_after_miss(current.id).await;
        }

        // Pin the lot for the confirmed vendor. It is normally Reserved
        // already from the claim at creation time; this flip only repairs a
        // lot that drifted back to Available.
        let repaired = self
            .lots
            .update_lot_status_if(current.lot_id, LotStatus::Available, LotStatus::Reserved)
            .await?;
        if repaired {
            info!("Lot {} re-pinned during approval", current.lot_id);
        }

        let record = PaymentRecord::new(
            current.id,
            current.total_satang,
            decision.method,
            PaymentOutcome::Approved,
            decision.bank_name,
            decision.account_name,
        );
        self.payments.append_payment(&record).await?;

        info!(
            "Payment approved for booking {} ({}) by {}",
            current.id,
            record.transaction_id,
            decision.reviewed_by.as_deref().unwrap_or("unknown"),
        );
        Ok(VerificationOutcome::Approved { booking: approved })
    }

    async fn reject(
        &self,
        current: Booking,
        decision: VerifyDecision,
    ) -> EngineResult<VerificationOutcome> {
        let mut rejected = current.clone();
        rejected.update_payment_status(PaymentStatus::Failed);
        // The booking stays Pending and the lot stays claimed; the vendor
        // gets to submit a corrected slip.

        let won = self
            .bookings
            .update_booking_guarded(&rejected, current.status, Some(PaymentStatus::Submitted))
            .await?;
        if !won {
            return self.reread_after_miss(current.id).await;
        }

        let record = PaymentRecord::new(
            current.id,
            current.total_satang,
            decision.method,
            PaymentOutcome::Rejected,
            decision.bank_name,
            decision.account_name,
        );
        self.payments.append_payment(&record).await?;

        info!(
            "Payment rejected for booking {} by {}",
            current.id,
            decision.reviewed_by.as_deref().unwrap_or("unknown"),
        );
        Ok(VerificationOutcome::Rejected { booking: rejected })
    }

    /// The guarded write missed: somebody else decided first (or cancelled).
    /// Report what actually happened.
    async fn reread_after_miss(&self, booking_id: Uuid) -> EngineResult<VerificationOutcome> {
        let now = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("booking", booking_id))?;
        if now.status == BookingStatus::Cancelled {
            return Err(EngineError::BookingAlreadyCancelled(booking_id.to_string()));
        }
        Ok(VerificationOutcome::AlreadyFinalized { booking: now })
    }
}
