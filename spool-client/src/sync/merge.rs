//! Merge rules for server-reported printer state
//!
//! Shared by the push reconciler (snapshots, deltas) and the refresher
//! (polled printer lists). Two rules protect local intent:
//!
//! - config fields of a printer with an unacknowledged config edit are
//!   carried over from the cache (snapshots) or stripped (deltas), so a
//!   stale server view cannot undo what the user just changed
//! - the ejection cooldown gate runs after every merge, so the dashboard
//!   shows COOLING/EJECTING the moment the data supports it

use crate::store::FleetStore;
use crate::sync::registry::InFlightRegistry;
use shared::models::{EjectionConfig, Printer, PrinterDelta, PrinterState};

/// Next state demanded by the ejection gate, if any.
///
/// FINISHED with ejection enabled moves to COOLING while the bed is above
/// the configured threshold, or straight to EJECTING when no threshold
/// applies. COOLING moves to EJECTING once the bed reaches the target.
/// The second tuple field is the cooldown target to store.
pub(crate) fn ejection_transition(
    printer: &Printer,
    ejection: Option<&EjectionConfig>,
) -> Option<(PrinterState, Option<f32>)> {
    let ejection = ejection?;
    if !ejection.enabled {
        return None;
    }

    match printer.state {
        PrinterState::Finished => match (ejection.cooldown_temp, printer.bed_temp) {
            // no threshold configured, eject right away
            (None, _) => Some((PrinterState::Ejecting, None)),
            (Some(target), Some(bed)) if bed > target => {
                Some((PrinterState::Cooling, Some(target)))
            }
            (Some(_), Some(_)) => Some((PrinterState::Ejecting, None)),
            // no bed reading yet, hold FINISHED until one arrives
            (Some(_), None) => None,
        },
        PrinterState::Cooling => {
            let target = printer.cooldown_target.or(ejection.cooldown_temp)?;
            let bed = printer.bed_temp?;
            (bed <= target).then_some((PrinterState::Ejecting, None))
        }
        _ => None,
    }
}

/// Merge a trusted full printer list into the cache.
pub(crate) fn merge_printer_snapshot(
    store: &FleetStore,
    registry: &InFlightRegistry,
    mut printers: Vec<Printer>,
) {
    let jobs = store.jobs();

    for printer in &mut printers {
        if registry.printer_config_in_flight(&printer.name) {
            if let Some(cached) = store.printer(&printer.name) {
                tracing::debug!(
                    printer = %printer.name,
                    "Keeping local group, config edit in flight"
                );
                printer.group = cached.group;
            }
        }

        let ejection = printer
            .current_job_id
            .and_then(|id| jobs.iter().find(|j| j.id == id))
            .map(|j| &j.ejection);
        if let Some((state, target)) = ejection_transition(printer, ejection) {
            tracing::debug!(
                printer = %printer.name,
                from = ?printer.state,
                to = ?state,
                "Ejection gate transition"
            );
            printer.state = state;
            printer.cooldown_target = target;
        }
    }

    store.replace_printers(printers);
}

/// Apply a single-printer delta to the cache.
pub(crate) fn apply_printer_delta(
    store: &FleetStore,
    registry: &InFlightRegistry,
    delta: PrinterDelta,
) {
    let delta = if delta.touches_config() && registry.printer_config_in_flight(&delta.name) {
        tracing::debug!(
            printer = %delta.name,
            "Stripping config fields from delta, edit in flight"
        );
        delta.without_config()
    } else {
        delta
    };

    let Some(updated) = store.patch_printer(&delta) else {
        tracing::debug!(printer = %delta.name, "Delta for unknown printer ignored");
        return;
    };

    let ejection = updated.current_job_id.and_then(|id| store.job(id));
    if let Some((state, target)) =
        ejection_transition(&updated, ejection.as_ref().map(|j| &j.ejection))
    {
        tracing::debug!(
            printer = %updated.name,
            from = ?updated.state,
            to = ?state,
            "Ejection gate transition"
        );
        store.set_printer_state(&updated.name, state, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StalenessConfig;
    use crate::sync::registry::{MutationKey, Snapshot};
    use shared::models::{EjectionConfig, JobStatus, PrintJob, PrinterKind};
    use std::sync::Arc;

    fn printer(name: &str, state: PrinterState) -> Printer {
        Printer {
            name: name.to_string(),
            address: "10.0.0.9".to_string(),
            kind: PrinterKind::Prusa,
            group: Some("A".to_string()),
            state,
            progress: None,
            current_file: None,
            current_job_id: None,
            seconds_remaining: None,
            nozzle_temp: None,
            bed_temp: None,
            cooldown_target: None,
            finished_at: None,
            error_message: None,
        }
    }

    fn ejection(enabled: bool, cooldown_temp: Option<f32>) -> EjectionConfig {
        EjectionConfig {
            enabled,
            preset_id: None,
            end_gcode: None,
            cooldown_temp,
        }
    }

    fn job_with_ejection(id: i64, config: EjectionConfig) -> PrintJob {
        PrintJob {
            id,
            name: None,
            filename: "part.gcode".to_string(),
            quantity: 1,
            sent: 0,
            priority: 0,
            groups: Vec::new(),
            status: JobStatus::Active,
            filament_g: None,
            ejection: config,
        }
    }

    fn setup() -> (Arc<FleetStore>, InFlightRegistry) {
        let (store, _rx) = FleetStore::new(&StalenessConfig::default());
        (store, InFlightRegistry::new())
    }

    #[test]
    fn test_gate_finished_above_threshold_cools() {
        let mut p = printer("alpha", PrinterState::Finished);
        p.bed_temp = Some(60.0);
        let config = ejection(true, Some(40.0));
        assert_eq!(
            ejection_transition(&p, Some(&config)),
            Some((PrinterState::Cooling, Some(40.0)))
        );
    }

    #[test]
    fn test_gate_finished_below_threshold_ejects() {
        let mut p = printer("alpha", PrinterState::Finished);
        p.bed_temp = Some(35.0);
        let config = ejection(true, Some(40.0));
        assert_eq!(
            ejection_transition(&p, Some(&config)),
            Some((PrinterState::Ejecting, None))
        );
    }

    #[test]
    fn test_gate_finished_without_threshold_ejects() {
        let p = printer("alpha", PrinterState::Finished);
        let config = ejection(true, None);
        assert_eq!(
            ejection_transition(&p, Some(&config)),
            Some((PrinterState::Ejecting, None))
        );
    }

    #[test]
    fn test_gate_waits_for_bed_reading() {
        let p = printer("alpha", PrinterState::Finished);
        let config = ejection(true, Some(40.0));
        assert_eq!(ejection_transition(&p, Some(&config)), None);
    }

    #[test]
    fn test_gate_disabled_stays_finished() {
        let mut p = printer("alpha", PrinterState::Finished);
        p.bed_temp = Some(60.0);
        let config = ejection(false, Some(40.0));
        assert_eq!(ejection_transition(&p, Some(&config)), None);
        assert_eq!(ejection_transition(&p, None), None);
    }

    #[test]
    fn test_gate_cooling_reaches_target() {
        let mut p = printer("alpha", PrinterState::Cooling);
        p.cooldown_target = Some(40.0);
        p.bed_temp = Some(41.0);
        let config = ejection(true, Some(40.0));
        assert_eq!(ejection_transition(&p, Some(&config)), None);

        p.bed_temp = Some(40.0);
        assert_eq!(
            ejection_transition(&p, Some(&config)),
            Some((PrinterState::Ejecting, None))
        );
    }

    #[test]
    fn test_gate_ignores_other_states() {
        let mut p = printer("alpha", PrinterState::Printing);
        p.bed_temp = Some(60.0);
        let config = ejection(true, Some(40.0));
        assert_eq!(ejection_transition(&p, Some(&config)), None);
    }

    #[test]
    fn test_snapshot_preserves_group_during_edit() {
        let (store, registry) = setup();
        store.replace_printers(vec![printer("alpha", PrinterState::Idle)]);

        // user just moved alpha to group B, call still in flight
        registry.begin(MutationKey::PrinterGroup("alpha".to_string()), || {
            Snapshot::PrinterGroup {
                name: "alpha".to_string(),
                group: Some("A".to_string()),
            }
        });
        store.set_printer_group("alpha", Some("B".to_string()));

        // stale server snapshot still says group A
        merge_printer_snapshot(&store, &registry, vec![printer("alpha", PrinterState::Idle)]);
        assert_eq!(
            store.printer("alpha").unwrap().group.as_deref(),
            Some("B"),
            "snapshot must not clobber the in-flight edit"
        );
    }

    #[test]
    fn test_snapshot_applies_gate_with_job_config() {
        let (store, registry) = setup();
        store.replace_jobs(vec![job_with_ejection(9, ejection(true, Some(40.0)))]);

        let mut finished = printer("alpha", PrinterState::Finished);
        finished.bed_temp = Some(60.0);
        finished.current_job_id = Some(9);
        merge_printer_snapshot(&store, &registry, vec![finished]);

        let merged = store.printer("alpha").unwrap();
        assert_eq!(merged.state, PrinterState::Cooling);
        assert_eq!(merged.cooldown_target, Some(40.0));
    }

    #[test]
    fn test_delta_strips_group_during_edit() {
        let (store, registry) = setup();
        store.replace_printers(vec![printer("alpha", PrinterState::Idle)]);
        registry.begin(MutationKey::PrinterGroup("alpha".to_string()), || {
            Snapshot::PrinterGroup {
                name: "alpha".to_string(),
                group: Some("A".to_string()),
            }
        });
        store.set_printer_group("alpha", Some("B".to_string()));

        apply_printer_delta(
            &store,
            &registry,
            PrinterDelta {
                name: "alpha".to_string(),
                group: Some("A".to_string()),
                bed_temp: Some(50.0),
                ..Default::default()
            },
        );

        let merged = store.printer("alpha").unwrap();
        assert_eq!(merged.group.as_deref(), Some("B"));
        assert_eq!(merged.bed_temp, Some(50.0), "telemetry still merges");
    }

    #[test]
    fn test_delta_advances_cooling_to_ejecting() {
        let (store, registry) = setup();
        store.replace_jobs(vec![job_with_ejection(9, ejection(true, Some(40.0)))]);
        let mut cooling = printer("alpha", PrinterState::Cooling);
        cooling.cooldown_target = Some(40.0);
        cooling.bed_temp = Some(45.0);
        cooling.current_job_id = Some(9);
        store.replace_printers(vec![cooling]);

        apply_printer_delta(
            &store,
            &registry,
            PrinterDelta {
                name: "alpha".to_string(),
                bed_temp: Some(38.0),
                ..Default::default()
            },
        );

        let merged = store.printer("alpha").unwrap();
        assert_eq!(merged.state, PrinterState::Ejecting);
        assert_eq!(merged.cooldown_target, None);
    }

    #[test]
    fn test_delta_for_unknown_printer_is_ignored() {
        let (store, registry) = setup();
        apply_printer_delta(
            &store,
            &registry,
            PrinterDelta {
                name: "ghost".to_string(),
                bed_temp: Some(38.0),
                ..Default::default()
            },
        );
        assert!(store.printer("ghost").is_none());
    }

    #[test]
    fn test_delta_merge_is_idempotent() {
        let (store, registry) = setup();
        store.replace_printers(vec![printer("alpha", PrinterState::Printing)]);

        let delta = PrinterDelta {
            name: "alpha".to_string(),
            state: Some(PrinterState::Printing),
            progress: Some(55.0),
            bed_temp: Some(61.5),
            ..Default::default()
        };
        apply_printer_delta(&store, &registry, delta.clone());
        let once = store.printer("alpha").unwrap();

        apply_printer_delta(&store, &registry, delta);
        assert_eq!(store.printer("alpha").unwrap(), once);
    }
}
