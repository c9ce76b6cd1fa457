//! Agent startup and lifecycle.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{AgentConfig, MetadataPolicy};
use crate::controller::{ControllerClient, ReportSink};
use crate::metadata::{collect_instance, ImdsClient, MetadataProvider};
use crate::models::{Instance, Job};
use crate::watcher::{FileDiscovery, LogParser};

use super::error::AgentError;
use super::memory::MemorySampler;
use super::monitor::{Monitor, TickReport};
use super::scheduler::IntervalTrigger;

/// The runner agent: identifies the host, then monitors worker logs.
pub struct Agent {
    config: AgentConfig,
    sink: Arc<dyn ReportSink>,
    metadata: Arc<dyn MetadataProvider>,
}

impl Agent {
    /// Create an agent with explicit collaborators.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        sink: Arc<dyn ReportSink>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            config,
            sink,
            metadata,
        }
    }

    /// Validate `config` and build the HTTP collaborators from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an HTTP client
    /// cannot be built.
    pub fn from_config(config: AgentConfig) -> Result<Self, AgentError> {
        config.validate()?;

        let sink = ControllerClient::from_config(&config.controller)?;
        let metadata = ImdsClient::from_config(&config.metadata)?;

        Ok(Self::new(config, Arc::new(sink), Arc::new(metadata)))
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Collect the host identity, applying the configured failure policy.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Metadata` if collection fails under
    /// [`MetadataPolicy::Strict`].
    pub async fn resolve_instance(&self) -> Result<Instance, AgentError> {
        match collect_instance(self.metadata.as_ref()).await {
            Ok(instance) => Ok(instance),
            Err(e) => match self.config.metadata.policy {
                MetadataPolicy::Strict => Err(e.into()),
                MetadataPolicy::Tolerant => {
                    tracing::warn!(
                        error = %e,
                        "Instance metadata unavailable, continuing unidentified"
                    );
                    Ok(Instance::unidentified())
                }
            },
        }
    }

    /// Identify the host, announce it to the controller and build the
    /// monitor.
    ///
    /// An unidentified instance is not announced. A failed announcement is
    /// logged and does not stop startup.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata is required and unavailable, or the log
    /// patterns fail to compile.
    pub async fn start(&self) -> Result<Monitor, AgentError> {
        let instance = self.resolve_instance().await?;

        if instance.is_identified() {
            match self.sink.report_instance(&instance).await {
                Ok(()) => tracing::info!(instance_id = %instance.instance_id, "Reported instance"),
                Err(e) => tracing::warn!(
                    instance_id = %instance.instance_id,
                    error = %e,
                    "Failed to report instance"
                ),
            }
        }

        self.build_monitor(instance)
    }

    /// Build a monitor for `instance` from the monitor settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the log patterns fail to compile.
    pub fn build_monitor(&self, instance: Instance) -> Result<Monitor, AgentError> {
        let settings = &self.config.monitor;

        let mut monitor = Monitor::new(
            FileDiscovery::new(settings.file_prefix.clone()),
            LogParser::with_default_patterns()?,
            Arc::clone(&self.sink),
            instance,
            settings.root.clone(),
        )
        .with_heartbeat(settings.instance_heartbeat);

        if settings.report_memory {
            monitor = monitor.with_memory_sampler(MemorySampler::new());
        }
        Ok(monitor)
    }

    /// Start and run the monitor loop until `cancel` fires.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Returns an error only if startup fails.
    pub async fn deploy(&self, cancel: &CancellationToken) -> Result<u64, AgentError> {
        let mut monitor = self.start().await?;
        let mut trigger = IntervalTrigger::new(self.config.monitor.interval());

        tracing::info!(
            root = %monitor.root().display(),
            interval_secs = self.config.monitor.interval_secs,
            prefix = %self.config.monitor.file_prefix,
            "Monitoring worker logs"
        );

        Ok(monitor.run(&mut trigger, cancel).await)
    }

    /// Start and run a single tick immediately.
    ///
    /// # Errors
    ///
    /// Returns an error only if startup fails.
    pub async fn run_once(&self) -> Result<TickReport, AgentError> {
        let mut monitor = self.start().await?;
        Ok(monitor.tick().await)
    }
}

/// Discover and parse every worker log under `root` without reporting.
///
/// Unparseable files are logged and skipped.
///
/// # Errors
///
/// Returns an error if the walk fails or the log patterns fail to compile.
pub async fn scan_jobs(root: &Path, prefix: &str) -> Result<Vec<Job>, AgentError> {
    let mut discovery = FileDiscovery::new(prefix);
    let parser = LogParser::with_default_patterns()?;

    let mut jobs = Vec::new();
    for path in discovery.discover_async(root).await? {
        match parser.parse_file(&path, "").await {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping worker log"),
        }
    }
    Ok(jobs)
}
