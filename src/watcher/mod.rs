//! Watcher module for CI runner worker logs.
//!
//! Discovers new worker log files and parses them into job records.

mod discovery;
mod error;
mod parser;
mod pattern;

pub use discovery::{FileDiscovery, MemorySeenFiles, SeenFiles, DEFAULT_FILE_PREFIX};
pub use error::{PatternError, TimestampError, WatcherError};
pub use parser::{Fold, FoldStrategy, JobAccumulator, LogParser};
pub use pattern::{Extracted, LineMatcher, MatcherKind, PatternExtractor};
