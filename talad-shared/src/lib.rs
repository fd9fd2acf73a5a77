pub mod money;
pub mod page;
pub mod pii;

pub use page::{PageRequest, Paged};
pub use pii::Redacted;
