//! Cache synchronization engine
//!
//! ```text
//!            user calls                         farm controller
//!                │                                ▲          │
//!                ▼                           HTTP │          │ push frames
//!      MutationCoordinator ──────────────────────►│          ▼
//!        optimistic write,                        │     PushSession
//!        settle / roll back                       │          │ events
//!                │                                │          ▼
//!                ▼                                │    PushReconciler
//!           FleetStore ◄── Refresher ◄─ mpsc ◄────┼─── merges, hints
//!                ▲              │                 │
//!                │              └─────────────────┘
//!                └── Poller (staleness ticks) ──► mpsc
//! ```
//!
//! `SyncEngine` owns the wiring: it builds the store, spawns the refresher
//! and poller, and hands out the coordinator and reconciler that the
//! dashboard and push session plug into. All parts share one
//! [`InFlightRegistry`] so optimistic state and server refreshes never
//! trample each other.

pub mod coordinator;
pub(crate) mod merge;
pub mod poller;
pub mod reconciler;
pub mod refresher;
pub mod registry;
pub mod reorder;

pub use coordinator::MutationCoordinator;
pub use reconciler::PushReconciler;
pub use registry::{InFlightRegistry, MutationKey, SettleAction, Snapshot};

use crate::config::ClientConfig;
use crate::http::FarmApi;
use crate::message::PushSession;
use crate::store::{Collection, FleetStore};
use poller::Poller;
use refresher::Refresher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Background sync for one farm connection
pub struct SyncEngine<A> {
    store: Arc<FleetStore>,
    registry: Arc<InFlightRegistry>,
    coordinator: MutationCoordinator<A>,
    api: Arc<A>,
    shutdown: CancellationToken,
}

impl<A: FarmApi + 'static> SyncEngine<A> {
    /// Build the store and spawn the refresher and poller tasks.
    pub fn start(api: Arc<A>, config: &ClientConfig) -> Self {
        let (store, refresh_rx) = FleetStore::new(&config.staleness);
        let registry = Arc::new(InFlightRegistry::new());
        let coordinator = MutationCoordinator::new(store.clone(), api.clone(), registry.clone());
        let shutdown = CancellationToken::new();

        let refresher = Refresher::new(store.clone(), api.clone(), registry.clone());
        tokio::spawn(refresher.run(refresh_rx, shutdown.clone()));

        let poller = Poller::new(store.clone(), config.poll.clone());
        tokio::spawn(poller.run(shutdown.clone()));

        Self {
            store,
            registry,
            coordinator,
            api,
            shutdown,
        }
    }

    /// Fetch every collection once, concurrently. Call after `start` to
    /// warm the cache before first render.
    pub async fn bootstrap(&self) {
        let refresher = Refresher::new(
            self.store.clone(),
            self.api.clone(),
            self.registry.clone(),
        );
        let fetches = Collection::ALL.iter().map(|&c| refresher.refresh(c));
        futures::future::join_all(fetches).await;
        tracing::info!(
            jobs = self.store.jobs().len(),
            printers = self.store.printers().len(),
            "Cache bootstrapped"
        );
    }

    /// Build a reconciler bound to this engine's store and registry.
    pub fn reconciler(&self) -> PushReconciler {
        PushReconciler::new(self.store.clone(), self.registry.clone())
    }

    /// Spawn a reconciler draining the session's event stream.
    pub fn attach_push(&self, session: &PushSession) {
        tokio::spawn(self.reconciler().run(session.subscribe()));
    }

    /// The entity cache.
    pub fn store(&self) -> &Arc<FleetStore> {
        &self.store
    }

    /// The mutation surface.
    pub fn mutations(&self) -> &MutationCoordinator<A> {
        &self.coordinator
    }

    /// Stop the refresher and poller tasks.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
