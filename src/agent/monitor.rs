//! The monitor loop: discovery, parsing and reporting on every tick.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::controller::ReportSink;
use crate::models::Instance;
use crate::watcher::{FileDiscovery, LogParser, MemorySeenFiles, SeenFiles};

use super::memory::MemorySampler;
use super::scheduler::Trigger;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// New worker logs found by discovery.
    pub discovered: usize,
    /// Logs parsed into jobs.
    pub parsed: usize,
    /// Records accepted by the sink (jobs, heartbeats and memory logs).
    pub reported: usize,
    pub parse_failures: usize,
    pub report_failures: usize,
    /// Discovery failed and the tick was abandoned.
    pub discovery_failed: bool,
}

impl TickReport {
    /// Whether nothing went wrong during the tick.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.discovery_failed && self.parse_failures == 0 && self.report_failures == 0
    }

    fn log(&self) {
        if self.discovered > 0 || !self.is_clean() {
            tracing::info!(
                discovered = self.discovered,
                parsed = self.parsed,
                reported = self.reported,
                parse_failures = self.parse_failures,
                report_failures = self.report_failures,
                discovery_failed = self.discovery_failed,
                "Tick complete"
            );
        } else {
            tracing::debug!(reported = self.reported, "Tick complete, no new worker logs");
        }
    }
}

/// Drives discovery, parsing and reporting for one root directory.
pub struct Monitor<S: SeenFiles = MemorySeenFiles> {
    discovery: FileDiscovery<S>,
    parser: LogParser,
    sink: Arc<dyn ReportSink>,
    instance: Instance,
    root: PathBuf,
    heartbeat: bool,
    memory: Option<MemorySampler>,
}

impl<S: SeenFiles> Monitor<S> {
    #[must_use]
    pub fn new(
        discovery: FileDiscovery<S>,
        parser: LogParser,
        sink: Arc<dyn ReportSink>,
        instance: Instance,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            discovery,
            parser,
            sink,
            instance,
            root: root.into(),
            heartbeat: false,
            memory: None,
        }
    }

    /// Re-report the instance with a fresh timestamp on every tick.
    #[must_use]
    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat = enabled;
        self
    }

    /// Report a memory sample on every tick.
    #[must_use]
    pub fn with_memory_sampler(mut self, sampler: MemorySampler) -> Self {
        self.memory = Some(sampler);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    #[must_use]
    pub fn discovery(&self) -> &FileDiscovery<S> {
        &self.discovery
    }

    /// Run one tick to completion.
    ///
    /// Failures are logged and counted, never propagated: a discovery
    /// failure abandons the tick, a parse or report failure only skips the
    /// affected record.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let files = match self.discovery.discover_async(&self.root).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    root = %self.root.display(),
                    error = %e,
                    "Discovery failed, skipping tick"
                );
                report.discovery_failed = true;
                return report;
            }
        };
        report.discovered = files.len();

        for path in files {
            let job = match self
                .parser
                .parse_file(&path, &self.instance.instance_id)
                .await
            {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping worker log");
                    report.parse_failures += 1;
                    continue;
                }
            };
            report.parsed += 1;

            match self.sink.report_job(&job).await {
                Ok(()) => {
                    tracing::info!(
                        path = %path.display(),
                        repository = %job.full_repository().unwrap_or_default(),
                        workflow = %job.workflow,
                        duration_secs = ?job.duration().map(|d| d.num_seconds()),
                        "Reported job"
                    );
                    report.reported += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to report job");
                    report.report_failures += 1;
                }
            }
        }

        self.report_host(&mut report).await;
        report
    }

    /// Heartbeat and memory sample, when enabled.
    async fn report_host(&mut self, report: &mut TickReport) {
        if !self.heartbeat && self.memory.is_none() {
            return;
        }
        if !self.instance.is_identified() {
            tracing::debug!("Instance unidentified, skipping host reports");
            return;
        }

        if self.heartbeat {
            self.instance.touch();
            match self.sink.report_instance(&self.instance).await {
                Ok(()) => report.reported += 1,
                Err(e) => {
                    tracing::warn!(
                        instance_id = %self.instance.instance_id,
                        error = %e,
                        "Failed to report instance heartbeat"
                    );
                    report.report_failures += 1;
                }
            }
        }

        if let Some(sampler) = self.memory.as_mut() {
            let log = sampler.sample(&self.instance.instance_id);
            match self.sink.report_memory_log(&log).await {
                Ok(()) => report.reported += 1,
                Err(e) => {
                    tracing::warn!(
                        instance_id = %self.instance.instance_id,
                        error = %e,
                        "Failed to report memory log"
                    );
                    report.report_failures += 1;
                }
            }
        }
    }

    /// Run ticks until the trigger stops or `cancel` fires.
    ///
    /// Cancellation is observed between ticks; a running tick always
    /// completes. Returns the number of ticks run.
    pub async fn run<T>(&mut self, trigger: &mut T, cancel: &CancellationToken) -> u64
    where
        T: Trigger + ?Sized,
    {
        let mut ticks = 0;

        loop {
            let fired = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!(ticks, "Monitor cancelled");
                    break;
                }
                fired = trigger.fire() => fired,
            };

            if !fired {
                tracing::debug!(ticks, "Trigger exhausted");
                break;
            }

            let report = self.tick().await;
            report.log();
            ticks += 1;
        }

        ticks
    }
}
