//! In-flight mutation bookkeeping
//!
//! Every optimistic mutation registers here before its network call goes
//! out, keyed by (kind, entity). A rapid burst on the same key keeps the
//! FIRST pre-mutation snapshot and the LATEST dispatch sequence: only the
//! latest call's settlement may write to the cache. Earlier calls settle
//! as no-ops, so a failing latest call rolls the entity back to its state
//! before the whole burst.
//!
//! The registry also owns the deferred-queue-refresh flag set by the
//! reconciler when a queue change arrives mid-mutation.

use parking_lot::Mutex;
use shared::models::{EjectionConfig, PrintJob};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Mutation identity: kind plus the entity it targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Reorder(i64),
    Quantity(i64),
    Ejection(i64),
    PrinterGroup(String),
    PrinterCommand(String),
}

impl MutationKey {
    /// Whether the mutation touches the job queue. Queue refreshes are
    /// deferred while any of these is outstanding.
    pub fn is_job_mutation(&self) -> bool {
        matches!(
            self,
            MutationKey::Reorder(_) | MutationKey::Quantity(_) | MutationKey::Ejection(_)
        )
    }
}

/// Cache state captured before the first optimistic patch of a burst
#[derive(Debug, Clone)]
pub enum Snapshot {
    /// The whole ordered queue; a reorder renumbers every job in between.
    Queue(Vec<PrintJob>),
    Quantity { job_id: i64, quantity: u32 },
    Ejection { job_id: i64, config: EjectionConfig },
    PrinterGroup { name: String, group: Option<String> },
    /// Printer commands apply no optimistic patch.
    None,
}

#[derive(Debug)]
struct InFlightRecord {
    snapshot: Snapshot,
    latest_seq: u64,
}

/// What the coordinator must do after a call settles
#[derive(Debug)]
pub enum SettleAction {
    /// A newer call on the same key superseded this one. No cache writes.
    Superseded,
    /// The latest call succeeded; the optimistic state is now truth.
    Confirmed,
    /// The latest call failed; restore this snapshot.
    RollBack(Snapshot),
}

/// Registry of unsettled mutations
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    records: Mutex<HashMap<MutationKey, InFlightRecord>>,
    seq: AtomicU64,
    queue_refresh_deferred: AtomicBool,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatch and return its sequence number.
    ///
    /// `snapshot` runs only when this key has no outstanding record, so a
    /// burst keeps the snapshot taken before its first patch.
    pub fn begin<F>(&self, key: MutationKey, snapshot: F) -> u64
    where
        F: FnOnce() -> Snapshot,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut records = self.records.lock();
        match records.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().latest_seq = seq;
            }
            Entry::Vacant(entry) => {
                entry.insert(InFlightRecord {
                    snapshot: snapshot(),
                    latest_seq: seq,
                });
            }
        }
        seq
    }

    /// Settle a dispatched call and learn what to do with the cache.
    ///
    /// Settling a key with no record (the latest call already settled and
    /// removed it) is also `Superseded`.
    pub fn settle(&self, key: &MutationKey, seq: u64, success: bool) -> SettleAction {
        let mut records = self.records.lock();
        match records.get(key) {
            Some(record) if record.latest_seq == seq => {}
            _ => return SettleAction::Superseded,
        }
        match records.remove(key) {
            Some(_) if success => SettleAction::Confirmed,
            Some(record) => SettleAction::RollBack(record.snapshot),
            // unreachable while the lock is held
            None => SettleAction::Superseded,
        }
    }

    /// Whether any job-queue mutation is outstanding.
    pub fn has_job_mutation(&self) -> bool {
        self.records.lock().keys().any(|k| k.is_job_mutation())
    }

    /// Whether a config edit for this printer is outstanding.
    pub fn printer_config_in_flight(&self, name: &str) -> bool {
        self.records
            .lock()
            .keys()
            .any(|k| matches!(k, MutationKey::PrinterGroup(n) if n == name))
    }

    /// Remember that a queue refresh was held back.
    pub fn defer_queue_refresh(&self) {
        self.queue_refresh_deferred.store(true, Ordering::Relaxed);
    }

    /// Take the deferred flag, clearing it.
    pub fn take_deferred_queue_refresh(&self) -> bool {
        self.queue_refresh_deferred.swap(false, Ordering::Relaxed)
    }

    /// Number of unsettled mutations.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::Quantity {
            job_id: 7,
            quantity: 5,
        }
    }

    #[test]
    fn test_single_call_success_confirms() {
        let registry = InFlightRegistry::new();
        let seq = registry.begin(MutationKey::Quantity(7), snapshot);
        assert!(matches!(
            registry.settle(&MutationKey::Quantity(7), seq, true),
            SettleAction::Confirmed
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_single_call_failure_rolls_back() {
        let registry = InFlightRegistry::new();
        let seq = registry.begin(MutationKey::Quantity(7), snapshot);
        match registry.settle(&MutationKey::Quantity(7), seq, false) {
            SettleAction::RollBack(Snapshot::Quantity { quantity, .. }) => {
                assert_eq!(quantity, 5)
            }
            other => panic!("expected rollback, got {:?}", other),
        }
    }

    #[test]
    fn test_burst_keeps_first_snapshot() {
        let registry = InFlightRegistry::new();
        let key = MutationKey::Quantity(7);
        let s1 = registry.begin(key.clone(), || Snapshot::Quantity {
            job_id: 7,
            quantity: 5,
        });
        // second begin must not replace the snapshot
        let s2 = registry.begin(key.clone(), || Snapshot::Quantity {
            job_id: 7,
            quantity: 6,
        });
        let s3 = registry.begin(key.clone(), || Snapshot::Quantity {
            job_id: 7,
            quantity: 7,
        });

        assert!(matches!(
            registry.settle(&key, s1, true),
            SettleAction::Superseded
        ));
        assert!(matches!(
            registry.settle(&key, s2, true),
            SettleAction::Superseded
        ));
        match registry.settle(&key, s3, false) {
            SettleAction::RollBack(Snapshot::Quantity { quantity, .. }) => {
                assert_eq!(quantity, 5, "burst must roll back to its origin")
            }
            other => panic!("expected rollback, got {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_latest_can_settle_before_earlier_calls() {
        let registry = InFlightRegistry::new();
        let key = MutationKey::Quantity(7);
        let s1 = registry.begin(key.clone(), snapshot);
        let s2 = registry.begin(key.clone(), snapshot);

        // latest wins and removes the record
        assert!(matches!(
            registry.settle(&key, s2, true),
            SettleAction::Confirmed
        ));
        // the slow earlier call now settles against no record
        assert!(matches!(
            registry.settle(&key, s1, false),
            SettleAction::Superseded
        ));
    }

    #[test]
    fn test_keys_do_not_cross_entities() {
        let registry = InFlightRegistry::new();
        let a = registry.begin(MutationKey::Quantity(1), snapshot);
        let _b = registry.begin(MutationKey::Quantity(2), snapshot);

        assert!(matches!(
            registry.settle(&MutationKey::Quantity(1), a, true),
            SettleAction::Confirmed
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_job_mutation_detection() {
        let registry = InFlightRegistry::new();
        assert!(!registry.has_job_mutation());

        registry.begin(MutationKey::PrinterGroup("alpha".to_string()), || {
            Snapshot::PrinterGroup {
                name: "alpha".to_string(),
                group: None,
            }
        });
        assert!(!registry.has_job_mutation());
        assert!(registry.printer_config_in_flight("alpha"));
        assert!(!registry.printer_config_in_flight("beta"));

        registry.begin(MutationKey::Reorder(3), || Snapshot::Queue(Vec::new()));
        assert!(registry.has_job_mutation());
    }

    #[test]
    fn test_deferred_flag_take_clears() {
        let registry = InFlightRegistry::new();
        assert!(!registry.take_deferred_queue_refresh());
        registry.defer_queue_refresh();
        registry.defer_queue_refresh();
        assert!(registry.take_deferred_queue_refresh());
        assert!(!registry.take_deferred_queue_refresh());
    }
}
