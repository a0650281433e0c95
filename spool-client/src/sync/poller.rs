//! Polling fallback - keeps the cache converging when push is down
//!
//! Ticks on two cadences (fast for printers and stats, slow for the queue
//! and presets) and enqueues a refresh for any collection whose staleness
//! window has lapsed. While the push channel is healthy its merges keep
//! everything fresh and the ticks are no-ops.

use crate::config::PollConfig;
use crate::store::{Collection, FleetStore};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct Poller {
    store: Arc<FleetStore>,
    config: PollConfig,
}

impl Poller {
    pub(crate) fn new(store: Arc<FleetStore>, config: PollConfig) -> Self {
        Self { store, config }
    }

    /// Tick until shutdown. Returns immediately when polling is disabled.
    pub async fn run(self, shutdown: CancellationToken) {
        if !self.config.enabled {
            tracing::info!("Polling fallback disabled");
            return;
        }

        // first tick after one full period; startup fetching is bootstrap's job
        let mut printers = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.printers_interval,
            self.config.printers_interval,
        );
        let mut jobs = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.jobs_interval,
            self.config.jobs_interval,
        );
        printers.set_missed_tick_behavior(MissedTickBehavior::Delay);
        jobs.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = printers.tick() => {
                    self.request_if_stale(Collection::Printers);
                    self.request_if_stale(Collection::Stats);
                }
                _ = jobs.tick() => {
                    self.request_if_stale(Collection::Jobs);
                    self.request_if_stale(Collection::Presets);
                }
            }
        }
        tracing::debug!("Poller stopped");
    }

    fn request_if_stale(&self, collection: Collection) {
        if self.store.is_stale(collection) {
            tracing::debug!(%collection, "Poll tick found stale collection");
            self.store.request_refresh(collection);
        }
    }
}
