use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::BookingError;

const TXN_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankTransfer,
    QrCode,
    Cash,
    CreditCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::QrCode => "QR_CODE",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::CreditCard => "CREDIT_CARD",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "QR_CODE" => Ok(PaymentMethod::QrCode),
            "CASH" => Ok(PaymentMethod::Cash),
            "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
            other => Err(BookingError::Unrecognized(other.to_string())),
        }
    }
}

/// How an admin review ended. Records are only written at decision time, so
/// there is no in-flight state here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Approved,
    Rejected,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Approved => "APPROVED",
            PaymentOutcome::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for PaymentOutcome {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(PaymentOutcome::Approved),
            "REJECTED" => Ok(PaymentOutcome::Rejected),
            other => Err(BookingError::Unrecognized(other.to_string())),
        }
    }
}

/// Append-only audit entry for one verification decision. Deliberately kept
/// after its booking is deleted, so the money trail survives cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_satang: i64,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub outcome: PaymentOutcome,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        booking_id: Uuid,
        amount_satang: i64,
        method: PaymentMethod,
        outcome: PaymentOutcome,
        bank_name: Option<String>,
        account_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount_satang,
            method,
            transaction_id: generate_transaction_id(),
            outcome,
            bank_name,
            account_name,
            recorded_at: Utc::now(),
        }
    }
}

/// `TXN-<unix millis>-<9 random base36 chars>`. The millisecond prefix keeps
/// ids roughly sortable; the random tail makes same-millisecond collisions
/// a non-issue.
pub fn generate_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TXN_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("TXN-{}-{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_format() {
        let id = generate_transaction_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TXN");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), TXN_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_transaction_ids_do_not_repeat() {
        let a = generate_transaction_id();
        let b = generate_transaction_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_carries_generated_id() {
        let record = PaymentRecord::new(
            Uuid::new_v4(),
            15_000,
            PaymentMethod::BankTransfer,
            PaymentOutcome::Approved,
            Some("Krungthai".to_string()),
            Some("Somchai J.".to_string()),
        );
        assert!(record.transaction_id.starts_with("TXN-"));
        assert_eq!(record.outcome, PaymentOutcome::Approved);
    }

    #[test]
    fn test_method_round_trip() {
        for method in [
            PaymentMethod::BankTransfer,
            PaymentMethod::QrCode,
            PaymentMethod::Cash,
            PaymentMethod::CreditCard,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().ok(), Some(method));
        }
        assert!("WIRE".parse::<PaymentMethod>().is_err());
    }
}
