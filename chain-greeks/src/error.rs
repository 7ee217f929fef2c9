//! Error types for the batch pipeline.
//!
//! Every error is terminal for the whole run. `exit_code` maps each kind to
//! the process exit status the command-line tool reports.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit status when an input or output file cannot be opened.
pub const EXIT_IO: i32 = -2;

/// Exit status when a row cannot be parsed.
pub const EXIT_PARSE: i32 = -3;

/// Exit status for configuration problems detected before the run starts.
pub const EXIT_CONFIG: i32 = 1;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Error({}) opening {}: {source}", .source.raw_os_error().unwrap_or(0), .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unexpected option type on line {line}: [{value}]")]
    UnknownOptionType { line: u64, value: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BatchResult<T> = Result<T, BatchError>;

impl BatchError {
    pub fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// Directory failures report the OS `errno` (1 when the OS gave none).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Directory { source, .. } => source.raw_os_error().unwrap_or(1),
            Self::Io { .. } => EXIT_IO,
            Self::UnknownOptionType { .. } | Self::Parse(_) => EXIT_PARSE,
            Self::Csv(err) if err.is_io_error() => EXIT_IO,
            Self::Csv(_) => EXIT_PARSE,
            Self::Config(_) => EXIT_CONFIG,
        }
    }
}
