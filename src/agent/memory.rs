//! Host memory sampling.

use chrono::Utc;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::models::MemoryLog;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Samples host memory usage for [`MemoryLog`] records.
#[derive(Debug)]
pub struct MemorySampler {
    system: System,
}

impl MemorySampler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
            ),
        }
    }

    /// Take a fresh sample, in MiB.
    pub fn sample(&mut self, instance_id: &str) -> MemoryLog {
        self.system.refresh_memory();

        MemoryLog {
            instance_id: instance_id.to_string(),
            total: self.system.total_memory() / BYTES_PER_MIB,
            used: self.system.used_memory() / BYTES_PER_MIB,
            free: self.system.free_memory() / BYTES_PER_MIB,
            timestamp: Utc::now(),
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}
