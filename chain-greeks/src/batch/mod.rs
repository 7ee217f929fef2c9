//! Directory-tree batch pipeline.

pub mod scanner;
pub mod transform;

pub use scanner::{BatchScanner, FileJob, RunSummary, SkipReason, OUTPUT_SUFFIX};
pub use transform::{AugmentedRow, FileStats, FileTransformer, GREEKS_COLUMNS};
