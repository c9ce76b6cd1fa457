//! Line-level pattern extraction for runner worker logs.
//!
//! A [`PatternExtractor`] holds an ordered list of independent
//! [`LineMatcher`]s. Every matcher is tried on every line, so one line can
//! yield a repository, a workflow and a timestamp at the same time.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use regex::Regex;

use super::error::{PatternError, TimestampError};

/// Repository URL as written by the runner into the job message
/// (`"v": "https://api.github.com/repos/<org>/<repo>`).
const REPOSITORY_PATTERN: &str = r#""v":\s*"https?://[^"]*?/repos/([^/"\s]+)/([^/"\s]+)"#;

/// Workflow reference; the name runs until the next quote.
const WORKFLOW_PATTERN: &str = r#"workflows/([^"]+)"#;

/// Leading timestamp of a worker log line (`[2024-01-01 10:00:00Z ...`).
/// ASCII digits only; `\d` would also match other Unicode digit scripts.
const TIMESTAMP_PATTERN: &str = r"\[([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}Z)";

/// Strict format applied to the captured timestamp.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Kind of value a matcher extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Repository,
    Workflow,
    Timestamp,
}

impl std::fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repository => write!(f, "repository"),
            Self::Workflow => write!(f, "workflow"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A value extracted from one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// Repository reference split into owner and name.
    Repository {
        organization: String,
        repository: String,
    },
    /// Workflow name or path.
    Workflow(String),
    /// Log timestamp (UTC, second precision).
    Timestamp(DateTime<Utc>),
}

/// A single compiled pattern bound to the kind of value it produces.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    kind: MatcherKind,
    pattern: Regex,
}

impl LineMatcher {
    /// Compile a matcher.
    ///
    /// The pattern must contain two capture groups for
    /// [`MatcherKind::Repository`] and one for the other kinds.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::InvalidPattern` if the regex is invalid.
    pub fn new(kind: MatcherKind, pattern: &str) -> Result<Self, PatternError> {
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
        })
    }

    /// Get the matcher kind.
    #[must_use]
    pub fn kind(&self) -> MatcherKind {
        self.kind
    }

    /// Get the pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Try to extract a value from `line`.
    ///
    /// Returns `Ok(None)` when the line does not match.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::MalformedTimestamp` when a timestamp-shaped
    /// match is not a valid date-time.
    pub fn extract(&self, line: &str) -> Result<Option<Extracted>, PatternError> {
        let Some(captures) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let group = |index: usize| captures.get(index).map(|m| m.as_str().to_string());

        let extracted = match self.kind {
            MatcherKind::Repository => match (group(1), group(2)) {
                (Some(organization), Some(repository)) => Some(Extracted::Repository {
                    organization,
                    repository,
                }),
                _ => None,
            },
            MatcherKind::Workflow => group(1).map(Extracted::Workflow),
            MatcherKind::Timestamp => match group(1) {
                Some(value) => Some(Extracted::Timestamp(parse_timestamp(&value)?)),
                None => None,
            },
        };

        Ok(extracted)
    }
}

/// Parse a captured `YYYY-MM-DD HH:MM:SSZ` value as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PatternError> {
    let malformed = |source: TimestampError| PatternError::MalformedTimestamp {
        value: value.to_string(),
        source,
    };

    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| malformed(e.into()))?;
    // chrono stores second 60 as an overflowing nanosecond field
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(malformed(TimestampError::LeapSecond));
    }
    Ok(naive.and_utc())
}

/// Ordered set of matchers applied to every line.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    matchers: Vec<LineMatcher>,
}

impl PatternExtractor {
    /// Create an extractor with the runner worker log patterns
    /// (repository, workflow, timestamp).
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, PatternError> {
        Ok(Self {
            matchers: vec![
                LineMatcher::new(MatcherKind::Repository, REPOSITORY_PATTERN)?,
                LineMatcher::new(MatcherKind::Workflow, WORKFLOW_PATTERN)?,
                LineMatcher::new(MatcherKind::Timestamp, TIMESTAMP_PATTERN)?,
            ],
        })
    }

    /// Create an extractor from explicit matchers, applied in order.
    #[must_use]
    pub fn with_matchers(matchers: Vec<LineMatcher>) -> Self {
        Self { matchers }
    }

    /// Get the matchers in application order.
    #[must_use]
    pub fn matchers(&self) -> &[LineMatcher] {
        &self.matchers
    }

    /// Apply every matcher to `line`.
    ///
    /// Values are returned in matcher order; lines with no match yield an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns the first matcher error (a malformed timestamp).
    pub fn extract(&self, line: &str) -> Result<Vec<Extracted>, PatternError> {
        let mut values = Vec::new();
        for matcher in &self.matchers {
            if let Some(value) = matcher.extract(line)? {
                values.push(value);
            }
        }
        Ok(values)
    }
}
