//! Watcher error types.

use std::path::{Path, PathBuf};

/// Errors raised while extracting values from a single line.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    /// A built-in pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Text shaped like a timestamp that is not a valid date-time.
    #[error("Malformed timestamp '{value}': {source}")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: TimestampError,
    },
}

/// Why a timestamp-shaped value was rejected.
#[derive(thiserror::Error, Debug)]
pub enum TimestampError {
    #[error(transparent)]
    Format(#[from] chrono::ParseError),

    /// Second 60; runner clocks never emit leap seconds.
    #[error("second out of range")]
    LeapSecond,
}

/// Errors that can occur during discovery and parsing of worker logs.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Directory traversal failed; the whole discovery call is abandoned.
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be opened.
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be read to the end.
    #[error("Failed to read log file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line in the log file could not be parsed.
    #[error("Failed to parse {path} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: PatternError,
    },
}

impl WatcherError {
    /// Path of the file or directory the error is attributed to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Walk { path, .. }
            | Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::Parse { path, .. } => path.as_path(),
        }
    }
}
