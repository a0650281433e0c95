//! HTTP refresher - drains refresh requests and refetches collections
//!
//! Whatever enqueued the request (stale read, queue hint, mutation settle,
//! poll tick), the fetch itself happens here, off the caller's path. Queue
//! fetches check the in-flight registry twice: before dialing, and again
//! when the response arrives, since a mutation may have started while the
//! request was on the wire. Either check failing defers the refresh instead
//! of overwriting the optimistic queue.

use crate::http::FarmApi;
use crate::store::{Collection, FleetStore};
use crate::sync::merge;
use crate::sync::registry::InFlightRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct Refresher<A> {
    store: Arc<FleetStore>,
    api: Arc<A>,
    registry: Arc<InFlightRegistry>,
}

impl<A: FarmApi> Refresher<A> {
    pub(crate) fn new(store: Arc<FleetStore>, api: Arc<A>, registry: Arc<InFlightRegistry>) -> Self {
        Self {
            store,
            api,
            registry,
        }
    }

    /// Serve refresh requests until shutdown.
    pub async fn run(self, mut requests: mpsc::Receiver<Collection>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                request = requests.recv() => match request {
                    Some(collection) => self.refresh(collection).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Refresher stopped");
    }

    /// Refetch one collection and merge it into the cache.
    pub async fn refresh(&self, collection: Collection) {
        match collection {
            Collection::Jobs => self.refresh_jobs().await,
            Collection::Printers => self.refresh_printers().await,
            Collection::Stats => self.refresh_stats().await,
            Collection::Presets => self.refresh_presets().await,
        }
    }

    async fn refresh_jobs(&self) {
        if self.registry.has_job_mutation() {
            tracing::debug!("Queue refresh deferred, job mutation in flight");
            self.registry.defer_queue_refresh();
            return;
        }

        match self.api.list_jobs().await {
            Ok(jobs) => {
                if self.registry.has_job_mutation() {
                    tracing::debug!("Dropping fetched queue, mutation started mid-fetch");
                    self.registry.defer_queue_refresh();
                    return;
                }
                tracing::debug!(jobs = jobs.len(), "Queue refreshed");
                self.store.replace_jobs(jobs);
            }
            Err(e) => tracing::warn!(error = %e, "Queue refresh failed"),
        }
    }

    async fn refresh_printers(&self) {
        match self.api.list_printers().await {
            Ok(printers) => {
                tracing::debug!(printers = printers.len(), "Printers refreshed");
                merge::merge_printer_snapshot(&self.store, &self.registry, printers);
            }
            Err(e) => tracing::warn!(error = %e, "Printer refresh failed"),
        }
    }

    async fn refresh_stats(&self) {
        match self.api.fetch_stats().await {
            Ok(stats) => self.store.set_stats(stats),
            Err(e) => tracing::warn!(error = %e, "Stats refresh failed"),
        }
    }

    async fn refresh_presets(&self) {
        match self.api.list_presets().await {
            Ok(presets) => self.store.replace_presets(presets),
            Err(e) => tracing::warn!(error = %e, "Preset refresh failed"),
        }
    }
}
