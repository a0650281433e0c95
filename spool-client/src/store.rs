//! FleetStore - typed in-memory cache of farm entities
//!
//! Single source of displayed truth for the dashboard. Three writers feed
//! it: the mutation coordinator (optimistic patches and rollbacks), the
//! push reconciler (merged push events) and the refresher (full fetches).
//!
//! Reads never block on the network. A collection past its stale horizon
//! is still served from cache; reading it enqueues a best-effort refresh
//! request on the internal queue drained by the refresher.

use crate::config::StalenessConfig;
use parking_lot::RwLock;
use shared::models::{
    EjectionPreset, FleetStats, JobPatch, PrintJob, Printer, PrinterDelta, PrinterState,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Refresh requests beyond this are dropped; one queued request is enough.
const REFRESH_QUEUE_CAPACITY: usize = 16;

/// Cached collection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Jobs,
    Printers,
    Stats,
    Presets,
}

impl Collection {
    /// Every cached collection, in refresh order.
    pub const ALL: [Collection; 4] = [
        Collection::Jobs,
        Collection::Printers,
        Collection::Stats,
        Collection::Presets,
    ];
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Jobs => write!(f, "jobs"),
            Collection::Printers => write!(f, "printers"),
            Collection::Stats => write!(f, "stats"),
            Collection::Presets => write!(f, "presets"),
        }
    }
}

/// Last trusted refresh time for one collection
#[derive(Debug)]
struct Freshness {
    refreshed_at: Option<Instant>,
    stale_after: Duration,
}

impl Freshness {
    fn new(stale_after: Duration) -> Self {
        Self {
            refreshed_at: None,
            stale_after,
        }
    }

    fn mark(&mut self) {
        self.refreshed_at = Some(Instant::now());
    }

    fn invalidate(&mut self) {
        self.refreshed_at = None;
    }

    fn is_stale(&self) -> bool {
        match self.refreshed_at {
            None => true,
            Some(at) => at.elapsed() >= self.stale_after,
        }
    }
}

/// In-memory cache of jobs, printers, stats and presets
pub struct FleetStore {
    jobs: RwLock<Vec<PrintJob>>,
    printers: RwLock<HashMap<String, Printer>>,
    stats: RwLock<Option<FleetStats>>,
    presets: RwLock<Vec<EjectionPreset>>,
    freshness: RwLock<HashMap<Collection, Freshness>>,
    refresh_tx: mpsc::Sender<Collection>,
}

impl fmt::Debug for FleetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetStore")
            .field("jobs", &self.jobs.read().len())
            .field("printers", &self.printers.read().len())
            .field("presets", &self.presets.read().len())
            .finish()
    }
}

impl FleetStore {
    /// Create a store plus the receiving end of its refresh queue.
    pub fn new(staleness: &StalenessConfig) -> (Arc<Self>, mpsc::Receiver<Collection>) {
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_QUEUE_CAPACITY);
        let freshness = HashMap::from([
            (Collection::Jobs, Freshness::new(staleness.jobs)),
            (Collection::Printers, Freshness::new(staleness.printers)),
            (Collection::Stats, Freshness::new(staleness.stats)),
            (Collection::Presets, Freshness::new(staleness.presets)),
        ]);

        let store = Arc::new(Self {
            jobs: RwLock::new(Vec::new()),
            printers: RwLock::new(HashMap::new()),
            stats: RwLock::new(None),
            presets: RwLock::new(Vec::new()),
            freshness: RwLock::new(freshness),
            refresh_tx,
        });
        (store, refresh_rx)
    }

    // ========== Reads ==========

    /// One job by id.
    pub fn job(&self, id: i64) -> Option<PrintJob> {
        self.touch(Collection::Jobs);
        self.jobs.read().iter().find(|j| j.id == id).cloned()
    }

    /// The whole queue, priority-ordered.
    pub fn jobs(&self) -> Vec<PrintJob> {
        self.touch(Collection::Jobs);
        self.jobs.read().clone()
    }

    /// One printer by name.
    pub fn printer(&self, name: &str) -> Option<Printer> {
        self.touch(Collection::Printers);
        self.printers.read().get(name).cloned()
    }

    /// Every printer, name-ordered.
    pub fn printers(&self) -> Vec<Printer> {
        self.touch(Collection::Printers);
        let mut printers: Vec<Printer> = self.printers.read().values().cloned().collect();
        printers.sort_by(|a, b| a.name.cmp(&b.name));
        printers
    }

    /// Aggregate counters, `None` before the first load.
    pub fn stats(&self) -> Option<FleetStats> {
        self.touch(Collection::Stats);
        *self.stats.read()
    }

    /// Saved ejection presets.
    pub fn presets(&self) -> Vec<EjectionPreset> {
        self.touch(Collection::Presets);
        self.presets.read().clone()
    }

    // ========== Trusted replacements (mark the collection fresh) ==========

    /// Replace the queue with a server-fetched list.
    pub fn replace_jobs(&self, mut jobs: Vec<PrintJob>) {
        jobs.sort_by_key(|j| j.priority);
        {
            let mut cache = self.jobs.write();
            *cache = jobs;
        }
        self.mark_fresh(Collection::Jobs);
    }

    /// Replace every printer with a server-fetched list.
    pub fn replace_printers(&self, printers: Vec<Printer>) {
        {
            let mut cache = self.printers.write();
            cache.clear();
            for printer in printers {
                cache.insert(printer.name.clone(), printer);
            }
        }
        self.mark_fresh(Collection::Printers);
    }

    /// Store fresh aggregate counters.
    pub fn set_stats(&self, stats: FleetStats) {
        {
            let mut cache = self.stats.write();
            *cache = Some(stats);
        }
        self.mark_fresh(Collection::Stats);
    }

    /// Replace the preset list.
    pub fn replace_presets(&self, presets: Vec<EjectionPreset>) {
        {
            let mut cache = self.presets.write();
            *cache = presets;
        }
        self.mark_fresh(Collection::Presets);
    }

    // ========== Local writes (freshness untouched) ==========

    /// Write the queue without marking it fresh. Used for optimistic
    /// splices and rollbacks, which are not server truth.
    pub fn put_jobs(&self, mut jobs: Vec<PrintJob>) {
        jobs.sort_by_key(|j| j.priority);
        let mut cache = self.jobs.write();
        *cache = jobs;
    }

    /// Patch one job in place, returning the updated copy.
    pub fn patch_job(&self, id: i64, patch: &JobPatch) -> Option<PrintJob> {
        let mut cache = self.jobs.write();
        let job = cache.iter_mut().find(|j| j.id == id)?;
        job.apply(patch);
        Some(job.clone())
    }

    /// Patch one printer in place, returning the updated copy.
    /// Unknown printers are a no-op; the caller decides whether to log.
    pub fn patch_printer(&self, delta: &PrinterDelta) -> Option<Printer> {
        let mut cache = self.printers.write();
        let printer = cache.get_mut(&delta.name)?;
        printer.apply(delta);
        Some(printer.clone())
    }

    /// Force a printer state, overriding the cooldown target.
    pub fn set_printer_state(
        &self,
        name: &str,
        state: PrinterState,
        cooldown_target: Option<f32>,
    ) -> bool {
        let mut cache = self.printers.write();
        match cache.get_mut(name) {
            Some(printer) => {
                printer.state = state;
                printer.cooldown_target = cooldown_target;
                true
            }
            None => false,
        }
    }

    /// Assign a printer's dispatch group. `None` clears it.
    pub fn set_printer_group(&self, name: &str, group: Option<String>) -> bool {
        let mut cache = self.printers.write();
        match cache.get_mut(name) {
            Some(printer) => {
                printer.group = group;
                true
            }
            None => false,
        }
    }

    // ========== Freshness ==========

    /// Whether a collection is past its stale horizon.
    pub fn is_stale(&self, collection: Collection) -> bool {
        self.freshness
            .read()
            .get(&collection)
            .map(|f| f.is_stale())
            .unwrap_or(true)
    }

    /// Invalidate every collection (push channel lost, clock untrusted).
    pub fn mark_all_stale(&self) {
        for freshness in self.freshness.write().values_mut() {
            freshness.invalidate();
        }
    }

    /// Enqueue a best-effort refresh request.
    pub fn request_refresh(&self, collection: Collection) {
        match self.refresh_tx.try_send(collection) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(collection = %collection, "Refresh queue full, request dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(collection = %collection, "Refresh queue closed, request dropped");
            }
        }
    }

    fn mark_fresh(&self, collection: Collection) {
        if let Some(freshness) = self.freshness.write().get_mut(&collection) {
            freshness.mark();
        }
    }

    fn touch(&self, collection: Collection) {
        if self.is_stale(collection) {
            self.request_refresh(collection);
        }
    }
}
