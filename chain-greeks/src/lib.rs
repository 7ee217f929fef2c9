pub mod batch;
pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod pricing;

// Re-export commonly used types
pub use batch::{BatchScanner, FileJob, FileTransformer, RunSummary};
pub use calendar::{date_diff_days, days_from_civil, CivilDate};
pub use config::BatchConfig;
pub use data::{Greeks, OptionRow, OptionType};
pub use error::{BatchError, BatchResult};
pub use pricing::{BlackScholesPricer, PricingClient};
