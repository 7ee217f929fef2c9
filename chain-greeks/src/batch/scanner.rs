//! Two-level directory walk over a chain-data tree.
//!
//! The root holds one subdirectory per data set; each subdirectory holds
//! per-underlying CSV files. Every eligible `X.csv` becomes `X-greeks.csv`
//! beside it. A file whose output already exists is skipped, so re-running
//! over a processed tree does no work.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::pricing::PricingClient;

use super::transform::FileTransformer;

/// Suffix of generated files, replacing the input's extension.
pub const OUTPUT_SUFFIX: &str = "-greeks.csv";

const CSV_MARKER: &str = ".csv";
const PARENT_MARKER: &str = "..";

/// Root is depth 0, data sets depth 1, files depth 2.
const MAX_DEPTH: usize = 2;

/// One input file and the output it will produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub rows_written: usize,
}

/// Why a directory entry was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable,
    NotDirectory,
    ParentReference,
    NotRegularFile,
    NotCsv,
    AlreadyProcessed,
    OutputExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Unreadable => "cannot stat",
            Self::NotDirectory => "not a directory",
            Self::ParentReference => "name contains ..",
            Self::NotRegularFile => "not a regular file",
            Self::NotCsv => "not a .csv file",
            Self::AlreadyProcessed => "generated output",
            Self::OutputExists => "output already exists",
        };
        f.write_str(reason)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Subdirectory names containing `..` are never entered.
///
/// This also rejects legitimate names such as `AB..CD`. Only the entry's own
/// name is checked, never the root it was listed from: a root given as
/// `base/../x` is walked like `x`.
pub fn is_traversable_name(name: &str) -> bool {
    !name.contains(PARENT_MARKER)
}

/// A name mentions `.csv` and is not itself a generated output.
pub fn is_candidate_csv(name: &str) -> bool {
    name.contains(CSV_MARKER) && !name.contains(OUTPUT_SUFFIX)
}

/// Output name: everything before the last `.` plus [`OUTPUT_SUFFIX`].
pub fn output_file_name(name: &str) -> String {
    let stem = name.rfind('.').map_or(name, |idx| &name[..idx]);
    format!("{}{}", stem, OUTPUT_SUFFIX)
}

pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_file_name(output_file_name(&file_name(input)))
}

/// Decide whether a root entry is a data-set directory to enter.
pub fn check_subdirectory(path: &Path) -> Result<(), SkipReason> {
    let metadata = fs::metadata(path).map_err(|_| SkipReason::Unreadable)?;
    if !metadata.is_dir() {
        return Err(SkipReason::NotDirectory);
    }
    if !is_traversable_name(&file_name(path)) {
        return Err(SkipReason::ParentReference);
    }
    Ok(())
}

/// Build the job for a data-set entry, or say why there is none.
pub fn plan_file(path: &Path) -> Result<FileJob, SkipReason> {
    let metadata = fs::metadata(path).map_err(|_| SkipReason::Unreadable)?;
    if !metadata.is_file() {
        return Err(SkipReason::NotRegularFile);
    }

    let name = file_name(path);
    if !name.contains(CSV_MARKER) {
        return Err(SkipReason::NotCsv);
    }
    if !is_candidate_csv(&name) {
        return Err(SkipReason::AlreadyProcessed);
    }

    let output = output_path_for(path);
    if output.exists() {
        return Err(SkipReason::OutputExists);
    }

    Ok(FileJob {
        input: path.to_path_buf(),
        output,
    })
}

/// Entries of `dir`, sorted by path. The handle is closed before returning.
fn list_dir(dir: &Path) -> BatchResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| BatchError::directory(dir, e))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Drives one [`FileTransformer`] pass per eligible file under a root.
pub struct BatchScanner<'a, P: PricingClient + ?Sized> {
    transformer: FileTransformer<'a, P>,
}

impl<'a, P: PricingClient + ?Sized> BatchScanner<'a, P> {
    pub fn new(pricer: &'a P, config: &'a BatchConfig) -> Self {
        Self {
            transformer: FileTransformer::new(pricer, config),
        }
    }

    /// Process every eligible file under `root`.
    ///
    /// Stops at the first error: an unopenable directory, an unopenable file,
    /// or a bad row. Outputs finished before the error stay on disk.
    pub fn run(&self, root: impl AsRef<Path>) -> BatchResult<RunSummary> {
        let root = root.as_ref();
        let mut summary = RunSummary::default();
        let mut pending = VecDeque::from([(root.to_path_buf(), 0usize)]);

        info!("Scanning {}", root.display());

        while let Some((dir, depth)) = pending.pop_front() {
            let entries = list_dir(&dir)?;
            if depth > 0 {
                summary.directories += 1;
            }

            for path in entries {
                if depth + 1 < MAX_DEPTH {
                    match check_subdirectory(&path) {
                        Ok(()) => pending.push_back((path, depth + 1)),
                        Err(reason) => debug!("Skipping {}: {}", path.display(), reason),
                    }
                    continue;
                }

                match plan_file(&path) {
                    Ok(job) => {
                        info!(
                            "Input filename: {}  Output filename: {}",
                            job.input.display(),
                            job.output.display()
                        );
                        let stats = self.transformer.transform(&job)?;
                        summary.files_processed += 1;
                        summary.rows_written += stats.rows;
                    }
                    Err(reason) => {
                        debug!("Skipping {}: {}", path.display(), reason);
                        summary.files_skipped += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}
