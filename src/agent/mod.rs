//! Runner agent: startup, scheduling and the monitor loop.

mod error;
mod memory;
mod monitor;
mod runner;
mod scheduler;

pub use error::AgentError;
pub use memory::MemorySampler;
pub use monitor::{Monitor, TickReport};
pub use runner::{scan_jobs, Agent};
pub use scheduler::{IntervalTrigger, ManualTrigger, Trigger};
