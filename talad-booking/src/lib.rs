pub mod models;
pub mod payment;
pub mod period;

pub use models::{Booking, BookingError, BookingStatus, PaymentStatus, Vendor};
pub use payment::{generate_transaction_id, PaymentMethod, PaymentOutcome, PaymentRecord};
pub use period::StallPeriod;
