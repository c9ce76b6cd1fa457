//! Host memory sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Memory usage of the host at one point in time, in MiB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLog {
    pub instance_id: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub timestamp: DateTime<Utc>,
}
