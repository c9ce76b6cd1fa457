//! Tick sources for the monitor loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Decides when the monitor loop runs its next tick.
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next firing.
    ///
    /// Returns `false` once the trigger will never fire again.
    async fn fire(&mut self) -> bool;
}

/// Fires at a fixed cadence, starting one period after creation.
///
/// Firings missed while a tick overran are skipped, never queued.
#[derive(Debug)]
pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    /// Create a trigger firing every `period`.
    ///
    /// `period` must be non-zero.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn fire(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires once per message sent on its channel; stops when all senders drop.
#[derive(Debug)]
pub struct ManualTrigger {
    rx: mpsc::Receiver<()>,
}

impl ManualTrigger {
    /// Create a trigger and the sender that drives it.
    #[must_use]
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel(16);
        (Self { rx }, tx)
    }
}

#[async_trait]
impl Trigger for ManualTrigger {
    async fn fire(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}
