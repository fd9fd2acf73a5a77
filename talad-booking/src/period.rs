use crate::models::BookingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing rounds rental duration up to whole 30-day months.
pub const DAYS_PER_BILLING_MONTH: i64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// Rental period of a stall. `end_date = None` means month-to-month with no
/// agreed end, charged as a single month up front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StallPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl StallPeriod {
    pub fn new(start_date: DateTime<Utc>, end_date: Option<DateTime<Utc>>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// A closed period must end strictly after it starts.
    pub fn validate(&self) -> Result<(), BookingError> {
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(BookingError::InvalidPeriod(
                    "end date must be after start date".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Number of billing months charged: days round up, partial days count
    /// in full, and every booking is charged at least one month.
    pub fn months_charged(&self) -> i64 {
        match self.end_date {
            None => 1,
            Some(end) => {
                let seconds = (end - self.start_date).num_seconds();
                let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
                let months = (days + DAYS_PER_BILLING_MONTH - 1) / DAYS_PER_BILLING_MONTH;
                months.max(1)
            }
        }
    }

    /// Booking total for a lot with the given monthly rate.
    pub fn total_satang(&self, monthly_rate_satang: i64) -> i64 {
        monthly_rate_satang * self.months_charged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn period(days: i64) -> StallPeriod {
        let start = Utc::now();
        StallPeriod::new(start, Some(start + Duration::days(days)))
    }

    #[test]
    fn test_open_ended_charges_one_month() {
        let open = StallPeriod::new(Utc::now(), None);
        assert!(open.validate().is_ok());
        assert_eq!(open.months_charged(), 1);
    }

    #[test]
    fn test_months_round_up() {
        assert_eq!(period(1).months_charged(), 1);
        assert_eq!(period(30).months_charged(), 1);
        assert_eq!(period(31).months_charged(), 2);
        assert_eq!(period(60).months_charged(), 2);
        assert_eq!(period(61).months_charged(), 3);
    }

    #[test]
    fn test_partial_days_count_in_full() {
        let start = Utc::now();
        let thirty_days_and_an_hour =
            StallPeriod::new(start, Some(start + Duration::days(30) + Duration::hours(1)));
        assert_eq!(thirty_days_and_an_hour.months_charged(), 2);
    }

    #[test]
    fn test_inverted_period_rejected() {
        let start = Utc::now();
        let inverted = StallPeriod::new(start, Some(start - Duration::days(1)));
        assert!(inverted.validate().is_err());

        let zero_length = StallPeriod::new(start, Some(start));
        assert!(zero_length.validate().is_err());
    }

    #[test]
    fn test_total_is_rate_times_months() {
        use talad_shared::money::baht;
        assert_eq!(period(45).total_satang(baht(100)), baht(200));
        assert_eq!(period(30).total_satang(baht(150)), baht(150));
    }
}
