//! CI job record extracted from a runner worker log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One CI workflow run discovered on this host.
///
/// Fields that were never matched in the log stay empty (`""` or `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub instance_id: String,
    pub organization: String,
    pub repository: String,
    pub workflow: String,
    /// First timestamp in the log.
    pub start_time: Option<DateTime<Utc>>,
    /// Last timestamp in the log.
    pub end_time: Option<DateTime<Utc>>,
}

impl Job {
    /// `organization/repository`, or `None` when no repository was found.
    #[must_use]
    pub fn full_repository(&self) -> Option<String> {
        if self.organization.is_empty() && self.repository.is_empty() {
            None
        } else {
            Some(format!("{}/{}", self.organization, self.repository))
        }
    }

    /// Time between the first and last log timestamps.
    ///
    /// Negative when the log was written out of chronological order.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        Some(self.end_time? - self.start_time?)
    }
}
