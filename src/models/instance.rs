//! Host identity snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the machine the agent runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Cloud instance identifier (e.g. `i-0abc123`).
    pub instance_id: String,
    /// Instance class.
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Availability zone the instance is placed in.
    pub availability_zone: String,
    /// Private network address.
    pub private_ip_address: String,
    /// When the agent last observed this instance.
    pub last_seen_at: DateTime<Utc>,
}

impl Instance {
    /// Instance placeholder used when metadata could not be collected.
    ///
    /// All identity fields are empty; only `last_seen_at` is set.
    #[must_use]
    pub fn unidentified() -> Self {
        Self {
            instance_id: String::new(),
            instance_type: String::new(),
            availability_zone: String::new(),
            private_ip_address: String::new(),
            last_seen_at: Utc::now(),
        }
    }

    /// Whether the identity fields were populated from metadata.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.instance_id.is_empty()
    }

    /// Refresh the last-seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen_at = Utc::now();
    }
}
