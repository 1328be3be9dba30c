//! # engine::periodic
//!
//! A fixed-period timer owned by exactly one component.
//!
//! * The first tick fires immediately, then every `period`.
//! * Missed ticks are skipped, never bunched up.
//! * Cancelling (or dropping) the handle aborts the timer task; because the
//!   job runs inside that task, no callback can fire after teardown.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

#[derive(Debug)]
pub struct PeriodicTask {
    name:   &'static str,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` on the current runtime, once per `period`.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(task = name, ?period, "⏱️ periodic task scheduled");

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                job().await;
            }
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the timer now.  Idempotent.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!(task = self.name, "⏹️ periodic task cancelled");
        }
        self.handle.abort();
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
