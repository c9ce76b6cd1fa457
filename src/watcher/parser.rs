//! Worker log parser.
//!
//! Folds every line of a log file through a [`PatternExtractor`] and builds
//! one [`Job`] per file.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::error::{PatternError, WatcherError};
use super::pattern::{Extracted, PatternExtractor};
use crate::models::Job;

/// How repeated matches for the same field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Keep the first value offered; ignore the rest.
    FirstWins,
    /// Replace the value on every offer.
    LastWins,
}

/// A single field accumulated under a [`FoldStrategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold<T> {
    strategy: FoldStrategy,
    value: Option<T>,
}

impl<T> Fold<T> {
    /// Create an empty fold with the given strategy.
    #[must_use]
    pub fn new(strategy: FoldStrategy) -> Self {
        Self {
            strategy,
            value: None,
        }
    }

    /// Create an empty first-match-wins fold.
    #[must_use]
    pub fn first_wins() -> Self {
        Self::new(FoldStrategy::FirstWins)
    }

    /// Create an empty last-match-wins fold.
    #[must_use]
    pub fn last_wins() -> Self {
        Self::new(FoldStrategy::LastWins)
    }

    /// Offer a value according to the strategy.
    pub fn offer(&mut self, value: T) {
        match self.strategy {
            FoldStrategy::FirstWins => {
                if self.value.is_none() {
                    self.value = Some(value);
                }
            }
            FoldStrategy::LastWins => self.value = Some(value),
        }
    }

    /// Get the strategy.
    #[must_use]
    pub fn strategy(&self) -> FoldStrategy {
        self.strategy
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the fold, returning the current value.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

/// Per-file accumulator of extracted values.
#[derive(Debug, Clone)]
pub struct JobAccumulator {
    repository: Fold<(String, String)>,
    workflow: Fold<String>,
    start_time: Fold<DateTime<Utc>>,
    end_time: Fold<DateTime<Utc>>,
}

impl Default for JobAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl JobAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            repository: Fold::first_wins(),
            workflow: Fold::first_wins(),
            start_time: Fold::first_wins(),
            end_time: Fold::last_wins(),
        }
    }

    /// Fold one extracted value into the matching field(s).
    pub fn absorb(&mut self, value: Extracted) {
        match value {
            Extracted::Repository {
                organization,
                repository,
            } => self.repository.offer((organization, repository)),
            Extracted::Workflow(workflow) => self.workflow.offer(workflow),
            Extracted::Timestamp(timestamp) => {
                self.start_time.offer(timestamp);
                self.end_time.offer(timestamp);
            }
        }
    }

    /// Build the job record for `instance_id`.
    #[must_use]
    pub fn finish(self, instance_id: &str) -> Job {
        let (organization, repository) = self.repository.into_inner().unwrap_or_default();
        Job {
            instance_id: instance_id.to_string(),
            organization,
            repository,
            workflow: self.workflow.into_inner().unwrap_or_default(),
            start_time: self.start_time.into_inner(),
            end_time: self.end_time.into_inner(),
        }
    }
}

/// Parses runner worker logs into [`Job`] records.
#[derive(Debug, Clone)]
pub struct LogParser {
    extractor: PatternExtractor,
}

impl LogParser {
    /// Create a parser using the given extractor.
    #[must_use]
    pub fn new(extractor: PatternExtractor) -> Self {
        Self { extractor }
    }

    /// Create a parser with the default worker log patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn with_default_patterns() -> Result<Self, PatternError> {
        Ok(Self::new(PatternExtractor::new()?))
    }

    /// Parse the log file at `path`.
    ///
    /// Fields never matched are left empty; that is not an error. The file
    /// is closed on return whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - A read fails before end of file (including invalid UTF-8)
    /// - A timestamp-shaped value is not a valid date-time
    pub async fn parse_file(&self, path: &Path, instance_id: &str) -> Result<Job, WatcherError> {
        let file = File::open(path).await.map_err(|source| WatcherError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse_lines(BufReader::new(file), path, instance_id).await
    }

    /// Fold every line of `reader`; errors are attributed to `path`.
    async fn parse_lines<R>(
        &self,
        reader: R,
        path: &Path,
        instance_id: &str,
    ) -> Result<Job, WatcherError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut accumulator = JobAccumulator::new();
        let mut line_number = 0;

        while let Some(line) = lines.next_line().await.map_err(|source| WatcherError::Read {
            path: path.to_path_buf(),
            source,
        })? {
            line_number += 1;

            let values = self
                .extractor
                .extract(&line)
                .map_err(|source| WatcherError::Parse {
                    path: path.to_path_buf(),
                    line: line_number,
                    source,
                })?;

            for value in values {
                accumulator.absorb(value);
            }
        }

        tracing::debug!(
            path = %path.display(),
            lines = line_number,
            "Parsed worker log"
        );

        Ok(accumulator.finish(instance_id))
    }
}
