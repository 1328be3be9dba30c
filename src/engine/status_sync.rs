//! # engine::status_sync
//!
//! **Status Sync** — keeps a local [`AutomationStatus`] replica fresh.
//!
//! * One immediate fetch on spawn, then one per period.
//! * A tick that fires while a fetch is outstanding is skipped.
//! * A failed fetch keeps the previous replica and is reported as non-fatal.
//!
//! Readers get the replica synchronously through a `watch` channel; nobody
//! ever waits on the network to read it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::TradingApi;
use crate::engine::periodic::PeriodicTask;
use crate::engine::single_flight::{Flight, Overlap, SingleFlight};
use crate::events::NotificationSink;
use crate::models::AutomationStatus;

pub struct StatusSync {
    api:     Arc<dyn TradingApi>,
    sink:    NotificationSink,
    replica: watch::Sender<Option<AutomationStatus>>,
    flight:  SingleFlight,
}

impl StatusSync {
    pub fn new(api: Arc<dyn TradingApi>, sink: NotificationSink) -> Arc<Self> {
        let (replica, _) = watch::channel(None);
        Arc::new(Self { api, sink, replica, flight: SingleFlight::new() })
    }

    /// Latest replica; `None` until the first successful fetch.
    pub fn current(&self) -> Option<AutomationStatus> {
        self.replica.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AutomationStatus>> {
        self.replica.subscribe()
    }

    /// One guarded fetch.  Returns `Skipped` if a fetch is already outstanding.
    pub async fn poll_once(&self) -> Flight {
        let flight = self.flight.run(Overlap::Skip, || self.fetch()).await;
        if flight == Flight::Skipped {
            debug!("status fetch still outstanding — tick skipped");
        }
        flight
    }

    async fn fetch(&self) {
        match self.api.automation_status().await {
            Ok(status) if !status.is_valid() => {
                warn!(?status, "engine reported scan_interval = 0 — replica kept");
            }
            Ok(status) => {
                let changed = self.replica.send_if_modified(|current| {
                    if current.as_ref() == Some(&status) {
                        return false;
                    }
                    *current = Some(status.clone());
                    true
                });
                if changed {
                    info!(
                        is_running  = status.is_running,
                        trade_count = status.trade_count,
                        "🔄 automation status updated"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "status fetch failed — keeping previous replica");
                self.sink.report_error("status", &e);
            }
        }
    }

    /// Start polling.  Dropping the returned handle stops it.
    pub fn spawn(self: &Arc<Self>, period: Duration) -> PeriodicTask {
        let this = Arc::clone(self);
        PeriodicTask::spawn("status-sync", period, move || {
            let this = Arc::clone(&this);
            async move {
                this.poll_once().await;
            }
        })
    }
}
