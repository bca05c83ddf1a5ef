use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Keep-alive timer for one connection lifetime.
///
/// Holds at most one interval. Starting replaces whatever was running, and the
/// first tick fires one full period after the start, never immediately.
#[derive(Debug)]
pub(crate) struct HeartbeatScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl HeartbeatScheduler {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub(crate) fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub(crate) fn stop(&mut self) {
        self.interval = None;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on the next tick; never resolves while stopped.
    pub(crate) async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending::<()>().await,
        }
    }
}
