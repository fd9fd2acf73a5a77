pub mod lot;
pub mod seed;

pub use lot::{CatalogError, Lot, LotPatch, LotStatus, Section, ZoneType};
pub use seed::default_market_plan;
