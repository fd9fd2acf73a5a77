use crate::lot::{Lot, Section, ZoneType};
use talad_shared::money::baht;

/// Lots per row in the default market layout.
pub const LOTS_PER_SECTION: u32 = 25;
/// Ordinals 1..=15 are Standard zone, 16..=25 Extended.
pub const STANDARD_ZONE_LIMIT: u32 = 15;
pub const DEFAULT_LOT_SIZE: &str = "2x2 m";

/// Flat monthly rate per row: the outer rows (A, D) are cheaper than the
/// middle rows (B, C).
pub fn section_price_satang(section: Section) -> i64 {
    match section {
        Section::RowA | Section::RowD => baht(100),
        Section::RowB | Section::RowC => baht(150),
    }
}

pub fn section_location(section: Section) -> &'static str {
    match section {
        Section::RowA => "Row A (left edge)",
        Section::RowB => "Row B (centre left)",
        Section::RowC => "Row C (centre right)",
        Section::RowD => "Row D (right edge)",
    }
}

/// Generate the default market plan: 4 rows x 25 lots, numbered A01..D25,
/// all Available. Seeding never fabricates Reserved lots; a lot is only ever
/// Reserved by a booking that actually holds it.
pub fn default_market_plan() -> Vec<Lot> {
    let mut lots = Vec::with_capacity((Section::all().len() as u32 * LOTS_PER_SECTION) as usize);

    for section in Section::all() {
        for ordinal in 1..=LOTS_PER_SECTION {
            let zone_type = if ordinal <= STANDARD_ZONE_LIMIT {
                ZoneType::Standard
            } else {
                ZoneType::Extended
            };
            lots.push(Lot::new(
                format!("{}{:02}", section.letter(), ordinal),
                section,
                zone_type,
                section_location(section).to_string(),
                DEFAULT_LOT_SIZE.to_string(),
                section_price_satang(section),
            ));
        }
    }

    lots
}
