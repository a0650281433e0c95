//! MutationCoordinator - optimistic mutations with rollback
//!
//! Every user-issued mutation follows one recipe:
//!
//! ```text
//! mutate(...)
//!    ├─ 1. validate input against the cache
//!    ├─ 2. register in-flight record (first snapshot of a burst wins)
//!    ├─ 3. apply the optimistic patch to the store
//!    ├─ 4. await the network call
//!    └─ 5. settle:
//!         ├─ superseded          → no cache writes
//!         ├─ latest + success    → confirm (optionally refresh)
//!         └─ latest + failure    → restore the first snapshot
//! ```
//!
//! Settling the last outstanding job mutation releases a queue refresh
//! the reconciler deferred in the meantime.

use crate::error::{ClientError, ClientResult};
use crate::http::FarmApi;
use crate::store::{Collection, FleetStore};
use crate::sync::registry::{InFlightRegistry, MutationKey, SettleAction, Snapshot};
use crate::sync::reorder;
use shared::client::PrinterCommand;
use shared::models::{EjectionConfig, JobPatch};
use std::sync::Arc;

/// Entry point for every mutation the dashboard can issue
pub struct MutationCoordinator<A> {
    store: Arc<FleetStore>,
    api: Arc<A>,
    registry: Arc<InFlightRegistry>,
}

impl<A> Clone for MutationCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            api: self.api.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<A: FarmApi> MutationCoordinator<A> {
    pub fn new(store: Arc<FleetStore>, api: Arc<A>, registry: Arc<InFlightRegistry>) -> Self {
        Self {
            store,
            api,
            registry,
        }
    }

    /// Drag a job to a new queue index.
    ///
    /// The whole queue is re-spliced optimistically; on failure the full
    /// pre-drag order comes back, not just the dragged job.
    pub async fn reorder_job(&self, id: i64, new_index: usize) -> ClientResult<()> {
        let current = self.store.jobs();
        let reordered = reorder::splice(&current, id, new_index)?;

        let key = MutationKey::Reorder(id);
        let seq = self
            .registry
            .begin(key.clone(), move || Snapshot::Queue(current));
        self.store.put_jobs(reordered);
        tracing::debug!(job_id = id, new_index, seq, "Optimistic reorder applied");

        let result = self.api.reorder_job(id, new_index).await;
        self.settle(key, seq, result, None)
    }

    /// Change the requested copy count of a job.
    pub async fn set_quantity(&self, id: i64, quantity: u32) -> ClientResult<()> {
        let job = self
            .store
            .job(id)
            .ok_or_else(|| ClientError::NotFound(format!("Job {}", id)))?;
        if quantity == 0 {
            return Err(ClientError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if quantity < job.sent {
            return Err(ClientError::Validation(format!(
                "Quantity {} below already-printed count {}",
                quantity, job.sent
            )));
        }

        let key = MutationKey::Quantity(id);
        let prior = job.quantity;
        let seq = self.registry.begin(key.clone(), || Snapshot::Quantity {
            job_id: id,
            quantity: prior,
        });
        self.store.patch_job(id, &JobPatch::quantity(quantity));
        tracing::debug!(job_id = id, quantity, seq, "Optimistic quantity applied");

        let result = self.api.set_quantity(id, quantity).await;
        self.settle(key, seq, result, None)
    }

    /// Replace the ejection settings of a job.
    ///
    /// The controller normalizes preset references, so a confirmed update
    /// still schedules a queue refresh.
    pub async fn set_ejection(&self, id: i64, config: EjectionConfig) -> ClientResult<()> {
        let job = self
            .store
            .job(id)
            .ok_or_else(|| ClientError::NotFound(format!("Job {}", id)))?;
        if let Some(temp) = config.cooldown_temp {
            if !temp.is_finite() || temp < 0.0 {
                return Err(ClientError::Validation(format!(
                    "Cooldown temperature {} out of range",
                    temp
                )));
            }
        }

        let key = MutationKey::Ejection(id);
        let prior = job.ejection;
        let seq = self.registry.begin(key.clone(), || Snapshot::Ejection {
            job_id: id,
            config: prior,
        });
        self.store.patch_job(id, &JobPatch::ejection(config.clone()));
        tracing::debug!(job_id = id, enabled = config.enabled, seq, "Optimistic ejection applied");

        let result = self.api.set_ejection(id, &config).await;
        self.settle(key, seq, result, Some(Collection::Jobs))
    }

    /// Move a printer to another dispatch group.
    pub async fn set_printer_group(&self, name: &str, group: &str) -> ClientResult<()> {
        let trimmed = group.trim();
        if trimmed.is_empty() {
            return Err(ClientError::Validation(
                "Group name cannot be empty".to_string(),
            ));
        }
        let printer = self
            .store
            .printer(name)
            .ok_or_else(|| ClientError::NotFound(format!("Printer {}", name)))?;

        let key = MutationKey::PrinterGroup(name.to_string());
        let prior = printer.group;
        let snapshot_name = name.to_string();
        let seq = self.registry.begin(key.clone(), move || {
            Snapshot::PrinterGroup {
                name: snapshot_name,
                group: prior,
            }
        });
        self.store.set_printer_group(name, Some(trimmed.to_string()));
        tracing::debug!(printer = %name, group = %trimmed, seq, "Optimistic group applied");

        let result = self.api.set_printer_group(name, trimmed).await;
        self.settle(key, seq, result, None)
    }

    /// Issue a control verb to a printer.
    ///
    /// Commands apply no optimistic patch; the resulting state arrives by
    /// push, backed up by a targeted refresh on success.
    pub async fn printer_command(&self, name: &str, command: PrinterCommand) -> ClientResult<()> {
        if self.store.printer(name).is_none() {
            return Err(ClientError::NotFound(format!("Printer {}", name)));
        }

        let key = MutationKey::PrinterCommand(name.to_string());
        let seq = self.registry.begin(key.clone(), || Snapshot::None);
        tracing::debug!(printer = %name, command = %command, seq, "Printer command dispatched");

        let result = self.api.printer_command(name, command).await;
        self.settle(key, seq, result, Some(Collection::Printers))
    }

    /// Settle one dispatched call against the registry and the cache.
    fn settle(
        &self,
        key: MutationKey,
        seq: u64,
        result: ClientResult<()>,
        refresh_on_success: Option<Collection>,
    ) -> ClientResult<()> {
        match self.registry.settle(&key, seq, result.is_ok()) {
            SettleAction::Superseded => {
                tracing::debug!(?key, seq, "Superseded settle, cache untouched");
            }
            SettleAction::Confirmed => {
                tracing::debug!(?key, seq, "Mutation confirmed");
                if let Some(collection) = refresh_on_success {
                    self.store.request_refresh(collection);
                }
            }
            SettleAction::RollBack(snapshot) => {
                if let Err(e) = &result {
                    tracing::warn!(?key, seq, error = %e, "Mutation failed, rolling back");
                }
                self.restore(snapshot);
            }
        }
        self.release_deferred(&key);
        result
    }

    /// Write a snapshot back into the store.
    fn restore(&self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Queue(jobs) => {
                self.store.put_jobs(jobs);
            }
            Snapshot::Quantity { job_id, quantity } => {
                self.store.patch_job(job_id, &JobPatch::quantity(quantity));
            }
            Snapshot::Ejection { job_id, config } => {
                self.store.patch_job(job_id, &JobPatch::ejection(config));
            }
            Snapshot::PrinterGroup { name, group } => {
                self.store.set_printer_group(&name, group);
            }
            Snapshot::None => {}
        }
    }

    /// After the last job record settles, let the held-back refresh run.
    fn release_deferred(&self, key: &MutationKey) {
        if key.is_job_mutation()
            && !self.registry.has_job_mutation()
            && self.registry.take_deferred_queue_refresh()
        {
            tracing::debug!("Releasing deferred queue refresh");
            self.store.request_refresh(Collection::Jobs);
        }
    }
}
