use std::sync::Arc;

use talad_core::reporting::Reporting;
use talad_core::repository::{BookingRepository, LotRepository, PaymentRepository};
use talad_core::reservation::ReservationCoordinator;
use talad_core::verification::VerificationDesk;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub admin_username: String,
    pub admin_password: String,
}

/// Shared handler state. The three engine services are cheap to clone; they
/// hold `Arc`s over the same repositories underneath.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: ReservationCoordinator,
    pub desk: VerificationDesk,
    pub reporting: Reporting,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        lots: Arc<dyn LotRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        auth: AuthConfig,
        currency: String,
    ) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(lots.clone(), bookings.clone()),
            desk: VerificationDesk::new(lots.clone(), bookings.clone(), payments.clone()),
            reporting: Reporting::new(lots, bookings, payments, currency),
            auth,
        }
    }
}
