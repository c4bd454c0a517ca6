//! Fixed-period recurring work bound to the lifetime of a connection.
//!
//! A [`RecurringTask`] holds no callback. The owner awaits [`RecurringTask::tick`]
//! inside its event loop and does the work itself, so a stopped task can never
//! fire against a dead connection.

use log::debug;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub struct RecurringTask {
    name: &'static str,
    period: Duration,
    interval: Option<Interval>,
}

impl RecurringTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            interval: None,
        }
    }

    /// Arms the task; the first tick lands one full period from now.
    /// Restarting a running task re-phases it.
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
        debug!("{} cadence started ({:?})", self.name, self.period);
    }

    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            debug!("{} cadence stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Resolves at the next period boundary. Pends forever while stopped.
    /// Cancel safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
