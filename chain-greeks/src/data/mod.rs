pub mod row;
pub mod types;

pub use row::{OptionRow, MIN_COLUMNS};
pub use types::{Greeks, OptionType};
