use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Market rows. Every lot belongs to exactly one row and its lot number is
/// prefixed with the row letter ("A07" sits in row A).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    RowA,
    RowB,
    RowC,
    RowD,
}

impl Section {
    pub fn all() -> [Section; 4] {
        [Section::RowA, Section::RowB, Section::RowC, Section::RowD]
    }

    /// Letter used as the lot-number prefix.
    pub fn letter(&self) -> char {
        match self {
            Section::RowA => 'A',
            Section::RowB => 'B',
            Section::RowC => 'C',
            Section::RowD => 'D',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::RowA => "ROW_A",
            Section::RowB => "ROW_B",
            Section::RowC => "ROW_C",
            Section::RowD => "ROW_D",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROW_A" => Ok(Section::RowA),
            "ROW_B" => Ok(Section::RowB),
            "ROW_C" => Ok(Section::RowC),
            "ROW_D" => Ok(Section::RowD),
            other => Err(CatalogError::Unrecognized(other.to_string())),
        }
    }
}

/// Availability state of a lot. This field is the single source of truth for
/// whether a new booking may target the lot; only the reservation engine
/// moves it in or out of `Reserved`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Available,
    Reserved,
    Maintenance,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Available => "AVAILABLE",
            LotStatus::Reserved => "RESERVED",
            LotStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::str::FromStr for LotStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(LotStatus::Available),
            "RESERVED" => Ok(LotStatus::Reserved),
            "MAINTENANCE" => Ok(LotStatus::Maintenance),
            other => Err(CatalogError::Unrecognized(other.to_string())),
        }
    }
}

/// Standard lots trade on the main market day, extended lots on the overflow
/// day. Affects presentation only, never availability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Standard,
    Extended,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Standard => "STANDARD",
            ZoneType::Extended => "EXTENDED",
        }
    }
}

impl std::str::FromStr for ZoneType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(ZoneType::Standard),
            "EXTENDED" => Ok(ZoneType::Extended),
            other => Err(CatalogError::Unrecognized(other.to_string())),
        }
    }
}

/// A physical, individually priced market stall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub lot_number: String,
    pub section: Section,
    pub zone_type: ZoneType,
    pub location: String,
    pub size: String,
    /// Flat monthly rate in satang.
    pub price_satang: i64,
    pub status: LotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    pub fn new(
        lot_number: String,
        section: Section,
        zone_type: ZoneType,
        location: String,
        size: String,
        price_satang: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            lot_number,
            section,
            zone_type,
            location,
            size,
            price_satang,
            status: LotStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the lot is well-formed: number matches `<row letter><2 digits>`
    /// with a non-zero ordinal, and the price is positive.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let number = self.lot_number.as_str();
        let mut chars = number.chars();
        let prefix_ok = chars.next() == Some(self.section.letter());
        let digits: Vec<char> = chars.collect();
        let digits_ok = digits.len() == 2 && digits.iter().all(|c| c.is_ascii_digit());

        if !prefix_ok || !digits_ok || number.ends_with("00") {
            return Err(CatalogError::InvalidLotNumber(number.to_string()));
        }

        if self.price_satang <= 0 {
            return Err(CatalogError::InvalidPrice(self.price_satang));
        }

        Ok(())
    }

    pub fn update_status(&mut self, new_status: LotStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

/// Partial update an administrator may apply to a lot. A `status` here can
/// only ever mean Available or Maintenance; the engine rejects anything that
/// would move a lot in or out of Reserved through this path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotPatch {
    pub location: Option<String>,
    pub size: Option<String>,
    pub price_satang: Option<i64>,
    pub zone_type: Option<ZoneType>,
    pub status: Option<LotStatus>,
}

impl LotPatch {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.size.is_none()
            && self.price_satang.is_none()
            && self.zone_type.is_none()
            && self.status.is_none()
    }

    /// Apply the patch to a lot in place, touching `updated_at`.
    pub fn apply(&self, lot: &mut Lot) -> Result<(), CatalogError> {
        if let Some(price) = self.price_satang {
            if price <= 0 {
                return Err(CatalogError::InvalidPrice(price));
            }
            lot.price_satang = price;
        }
        if let Some(location) = &self.location {
            lot.location = location.clone();
        }
        if let Some(size) = &self.size {
            lot.size = size.clone();
        }
        if let Some(zone_type) = self.zone_type {
            lot.zone_type = zone_type;
        }
        if let Some(status) = self.status {
            lot.status = status;
        }
        lot.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid lot number: {0}")]
    InvalidLotNumber(String),

    #[error("Lot price must be positive, got {0}")]
    InvalidPrice(i64),

    #[error("Unrecognized catalog value: {0}")]
    Unrecognized(String),
}
