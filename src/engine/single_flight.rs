//! # engine::single_flight
//!
//! **At-most-one-in-flight** guard shared by every periodic task.
//!
//! ```text
//!  tick ──▶ begin() ──┬─ idle  → run job → (rerun queued? run again) → idle
//!                     └─ busy  → Skip:  return Skipped
//!                                Queue: set rerun flag, wait for that pass, return Queued
//! ```
//!
//! A tick that lands while a request is outstanding never issues a second
//! request.  `Queue` callers (explicit refreshes) instead ask the current
//! owner for exactly one more pass and wait until it has finished, so a
//! write is always followed by a completed read that started after it.
//! If the owner is aborted before running that pass, a waiter takes over.

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;

/// What a caller wants when the guard is already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Drop this request.
    Skip,
    /// Have the current owner run once more, and wait for it.
    Queue,
}

/// Result of one `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// This caller ran the job (possibly several passes).
    Completed,
    /// Busy; nothing was issued.
    Skipped,
    /// Busy; the owner ran a pass that started after this call, and it has
    /// finished.
    Queued,
}

#[derive(Debug, Default)]
struct FlightState {
    busy:     bool,
    rerun:    bool,
    /// Passes begun so far.
    started:  u64,
    /// Last pass that ran to completion.
    finished: u64,
}

enum Entry<'a> {
    Owner(FlightPermit<'a>),
    Skipped,
    /// Wait for this pass number.
    Queued(u64),
}

#[derive(Debug)]
pub struct SingleFlight {
    state:   Mutex<FlightState>,
    /// Bumped whenever a pass finishes or the guard is released.
    changed: watch::Sender<u64>,
}

impl SingleFlight {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self { state: Mutex::new(FlightState::default()), changed }
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Run `job` unless another caller already holds the guard.
    pub async fn run<F, Fut>(&self, overlap: Overlap, mut job: F) -> Flight
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut changes = self.changed.subscribe();
        loop {
            let target = match self.begin(overlap) {
                Entry::Owner(mut permit) => {
                    loop {
                        job().await;
                        if !permit.continue_or_release() {
                            break;
                        }
                    }
                    return Flight::Completed;
                }
                Entry::Skipped => return Flight::Skipped,
                Entry::Queued(target) => target,
            };

            if self.wait_for_pass(target, &mut changes).await {
                return Flight::Queued;
            }
        }
    }

    fn begin(&self, overlap: Overlap) -> Entry<'_> {
        let mut state = self.state.lock();
        if state.busy {
            return match overlap {
                Overlap::Skip => Entry::Skipped,
                Overlap::Queue => {
                    state.rerun = true;
                    Entry::Queued(state.started + 1)
                }
            };
        }
        state.busy     = true;
        state.started += 1;
        Entry::Owner(FlightPermit { owner: self, pass: state.started, released: false })
    }

    /// `true` once pass `target` has finished; `false` if the guard went idle
    /// without running it (owner aborted).
    async fn wait_for_pass(&self, target: u64, changes: &mut watch::Receiver<u64>) -> bool {
        loop {
            {
                let state = self.state.lock();
                if state.finished >= target {
                    return true;
                }
                if !state.busy {
                    return false;
                }
            }
            if changes.changed().await.is_err() {
                return false;
            }
        }
    }

    fn signal(&self) {
        self.changed.send_modify(|n| *n = n.wrapping_add(1));
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by whoever is running the job.  Dropping it mid-flight (the task was
/// aborted) frees the guard so the next tick is not blocked forever.
struct FlightPermit<'a> {
    owner:    &'a SingleFlight,
    pass:     u64,
    released: bool,
}

impl FlightPermit<'_> {
    /// Records the finished pass, then either starts the queued rerun or
    /// releases the guard.  Both happen under one lock so a `Queue` caller
    /// can never slip in between and be lost.
    fn continue_or_release(&mut self) -> bool {
        let rerun = {
            let mut state = self.owner.state.lock();
            state.finished = self.pass;
            if state.rerun {
                state.rerun    = false;
                state.started += 1;
                self.pass      = state.started;
                true
            } else {
                state.busy    = false;
                self.released = true;
                false
            }
        };
        self.owner.signal();
        rerun
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        if !self.released {
            {
                let mut state = self.owner.state.lock();
                state.busy  = false;
                state.rerun = false;
            }
            self.owner.signal();
        }
    }
}
