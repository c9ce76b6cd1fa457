//! Records exchanged with the controller.

mod instance;
mod job;
mod memory_log;

pub use instance::Instance;
pub use job::Job;
pub use memory_log::MemoryLog;
