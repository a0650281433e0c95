//! Push reconciler - single merge point between push events and the cache
//!
//! Every decoded push event lands here. Snapshots and deltas are merged
//! through the shared gate logic in `merge`; queue hints turn into HTTP
//! refresh requests, deferred while one of our own job mutations is still
//! in flight so the optimistic queue does not flicker through a stale
//! server state.

use crate::message::PushEvent;
use crate::store::{Collection, FleetStore};
use crate::sync::merge;
use crate::sync::registry::InFlightRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct PushReconciler {
    store: Arc<FleetStore>,
    registry: Arc<InFlightRegistry>,
}

impl PushReconciler {
    pub(crate) fn new(store: Arc<FleetStore>, registry: Arc<InFlightRegistry>) -> Self {
        Self { store, registry }
    }

    /// Merge one push event into the cache.
    pub fn handle(&self, event: PushEvent) {
        match event {
            PushEvent::Snapshot(snapshot) => {
                tracing::debug!(printers = snapshot.printers.len(), "Merging fleet snapshot");
                merge::merge_printer_snapshot(&self.store, &self.registry, snapshot.printers);
                self.store.set_stats(snapshot.stats);
            }
            PushEvent::Delta(delta) => {
                merge::apply_printer_delta(&self.store, &self.registry, delta);
            }
            PushEvent::QueueChanged(hint) => {
                if self.registry.has_job_mutation() {
                    tracing::debug!(
                        version = hint.version,
                        "Queue change deferred, job mutation in flight"
                    );
                    self.registry.defer_queue_refresh();
                } else {
                    tracing::debug!(version = hint.version, "Queue changed, refreshing");
                    self.store.request_refresh(Collection::Jobs);
                }
            }
            PushEvent::ChannelDown => {
                tracing::warn!("Push channel down, marking cache stale");
                self.store.mark_all_stale();
            }
            PushEvent::ChannelUp => {
                tracing::info!("Push channel up, requesting full refresh");
                for collection in Collection::ALL {
                    self.store.request_refresh(collection);
                }
            }
        }
    }

    /// Drain the push event stream until the session shuts down.
    pub async fn run(self, mut events: broadcast::Receiver<PushEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // missed events may include snapshots; refetch everything
                    tracing::warn!(skipped, "Push events lagged, requesting full refresh");
                    for collection in Collection::ALL {
                        self.store.request_refresh(collection);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Push event stream closed");
                    break;
                }
            }
        }
    }
}
