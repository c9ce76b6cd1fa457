//! Reporting to the controller.

mod client;

use async_trait::async_trait;

use crate::models::{Instance, Job, MemoryLog};

pub use client::{ControllerClient, ControllerError, Endpoint};

/// Destination for records produced by the agent.
///
/// Delivery is at-least-once; implementations should tolerate duplicates.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Report the host identity.
    async fn report_instance(&self, instance: &Instance) -> Result<(), ControllerError>;

    /// Report one parsed job.
    async fn report_job(&self, job: &Job) -> Result<(), ControllerError>;

    /// Report one memory sample.
    async fn report_memory_log(&self, log: &MemoryLog) -> Result<(), ControllerError>;
}
