use crate::period::StallPeriod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use talad_shared::Redacted;
use uuid::Uuid;

/// Booking lifecycle. Cancelled is terminal; nothing ever leaves it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Active bookings (Pending or Confirmed) hold their lot and count
    /// against the one-active-booking-per-lot rule.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::Unrecognized(other.to_string())),
        }
    }
}

/// Payment progress carried on the booking. Canonical vocabulary: Pending
/// (nothing submitted yet), Submitted (slip attached, awaiting review),
/// Verified (admin approved, terminal), Failed (admin rejected or booking
/// cancelled before verification; a vendor may resubmit after a rejection).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Submitted,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Submitted)
                | (PaymentStatus::Submitted, PaymentStatus::Submitted)
                | (PaymentStatus::Failed, PaymentStatus::Submitted)
                | (PaymentStatus::Submitted, PaymentStatus::Verified)
                | (PaymentStatus::Submitted, PaymentStatus::Failed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Submitted => "SUBMITTED",
            PaymentStatus::Verified => "VERIFIED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUBMITTED" => Ok(PaymentStatus::Submitted),
            "VERIFIED" => Ok(PaymentStatus::Verified),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(BookingError::Unrecognized(other.to_string())),
        }
    }
}

/// Vendor identity carried on a booking. Phone and email are wrapped so
/// Debug/log output never leaks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub name: String,
    pub phone: Redacted<String>,
    pub email: Redacted<String>,
    pub business_type: String,
    pub business_description: Option<String>,
}

impl Vendor {
    pub fn new(
        name: String,
        phone: String,
        email: String,
        business_type: String,
        business_description: Option<String>,
    ) -> Self {
        Self {
            name: name.trim().to_string(),
            phone: Redacted::new(phone.trim().to_string()),
            email: Redacted::new(email.trim().to_lowercase()),
            business_type: business_type.trim().to_string(),
            business_description,
        }
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        if self.name.is_empty() {
            return Err(BookingError::InvalidVendor("name is required".to_string()));
        }
        if self.business_type.is_empty() {
            return Err(BookingError::InvalidVendor(
                "business type is required".to_string(),
            ));
        }

        let digits: String = self
            .phone
            .inner()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(9..=10).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BookingError::InvalidVendor(
                "phone must be 9-10 digits".to_string(),
            ));
        }

        let email = self.email.inner();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(BookingError::InvalidVendor(
                    "email address is malformed".to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// A vendor's claim on one lot for a rental period. References the lot, does
/// not own it; the reservation engine keeps the two in step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub vendor: Vendor,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub total_satang: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub slip_url: Option<String>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        lot_id: Uuid,
        vendor: Vendor,
        period: StallPeriod,
        total_satang: i64,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            lot_id,
            vendor,
            start_date: period.start_date,
            end_date: period.end_date,
            total_satang,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            slip_url: None,
            notes,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn period(&self) -> StallPeriod {
        StallPeriod::new(self.start_date, self.end_date)
    }

    pub fn update_status(&mut self, new_status: BookingStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    pub fn update_payment_status(&mut self, new_status: PaymentStatus) {
        self.payment_status = new_status;
        self.updated_at = Utc::now();
    }

    pub fn attach_slip(&mut self, slip_url: String) {
        self.slip_url = Some(slip_url);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid vendor details: {0}")]
    InvalidVendor(String),

    #[error("Invalid rental period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Unrecognized booking value: {0}")]
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vendor() -> Vendor {
        Vendor::new(
            "Somchai Noodles".to_string(),
            "081-234-5678".to_string(),
            "Somchai@Example.com".to_string(),
            "food".to_string(),
            None,
        )
    }

    #[test]
    fn test_vendor_email_lowercased() {
        let vendor = sample_vendor();
        assert_eq!(vendor.email.inner(), "somchai@example.com");
        assert!(vendor.validate().is_ok());
    }

    #[test]
    fn test_vendor_phone_rules() {
        let mut vendor = sample_vendor();
        vendor.phone = Redacted::new("02-123-4567".to_string());
        assert!(vendor.validate().is_ok(), "9-digit landline accepted");

        vendor.phone = Redacted::new("12345".to_string());
        assert!(vendor.validate().is_err());

        vendor.phone = Redacted::new("08123456xy".to_string());
        assert!(vendor.validate().is_err());
    }

    #[test]
    fn test_vendor_required_fields() {
        let mut vendor = sample_vendor();
        vendor.name = "  ".trim().to_string();
        assert!(vendor.validate().is_err());

        let mut vendor = sample_vendor();
        vendor.email = Redacted::new("not-an-email".to_string());
        assert!(vendor.validate().is_err());

        let mut vendor = sample_vendor();
        vendor.email = Redacted::new("user@nodot".to_string());
        assert!(vendor.validate().is_err());
    }

    #[test]
    fn test_booking_starts_pending() {
        let booking = Booking::new(
            Uuid::new_v4(),
            sample_vendor(),
            StallPeriod::new(Utc::now(), None),
            10_000,
            None,
        );
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(booking.slip_url.is_none());
    }

    #[test]
    fn test_booking_status_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn test_payment_status_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Submitted), "slip replacement");
        assert!(Submitted.can_transition_to(Verified));
        assert!(Submitted.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Submitted), "resubmission");
        assert!(Pending.can_transition_to(Failed), "cancel before submission");
        assert!(!Verified.can_transition_to(Failed));
        assert!(!Verified.can_transition_to(Submitted));
        assert!(!Pending.can_transition_to(Verified), "cannot skip review");
    }
}
