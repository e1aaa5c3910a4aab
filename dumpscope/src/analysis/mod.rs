//! The heuristic reasoner: `Snapshot → ordered findings`.
//!
//! A pure transform. Rule groups run in a fixed order and each appends zero
//! or more findings; the output order IS the group order, so two runs over
//! the same snapshot produce identical sequences. No I/O, no environment
//! reads; everything the rules consume, including the host CPU count, lives
//! on the snapshot.

pub mod findings;
mod rules;

pub use findings::{Finding, Severity};

use crate::domain::{CancelToken, TriageError};
use crate::snapshot::model::Snapshot;

/// The rule groups, in emission order.
const RULE_GROUPS: &[fn(&Snapshot, &mut Vec<Finding>)] = &[
    rules::threads::crash_signals,
    rules::memory::memory_signals,
    rules::memory::gc_nuance_signals,
    rules::blocking::blocking_signals,
    rules::threads::cpu_signals,
    rules::inventory::string_signals,
    rules::threads::finalizer_signals,
    rules::threads::threadpool_signals,
    rules::threads::wait_classification_signals,
    rules::threads::non_monitor_blocking_signals,
    rules::memory::heap_leak_signals,
    rules::inventory::module_anomaly_signals,
    rules::inventory::coverage_signals,
    rules::memory::native_footprint_signals,
    rules::inventory::data_availability_signals,
    rules::blocking::deadlock_signals,
];

/// Run every rule group over the snapshot.
///
/// Returns at least one finding: an all-clear Info lands when nothing else
/// fired.
#[must_use]
pub fn analyze(snapshot: &Snapshot) -> Vec<Finding> {
    match analyze_with_cancel(snapshot, &CancelToken::new()) {
        Ok(findings) => findings,
        // A fresh token can't trip.
        Err(_) => Vec::new(),
    }
}

/// [`analyze`], polling `cancel` between rule groups.
pub fn analyze_with_cancel(
    snapshot: &Snapshot,
    cancel: &CancelToken,
) -> Result<Vec<Finding>, TriageError> {
    let mut findings = Vec::new();
    for rule in RULE_GROUPS {
        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }
        rule(snapshot, &mut findings);
    }

    if findings.is_empty() {
        findings.push(Finding::new(
            Severity::Info,
            "No critical signals detected",
            "No crash, memory, blocking, finalizer, or thread-pool rule \
             crossed its threshold.",
            "Nothing in this dump demands action; if the process still \
             misbehaves, capture a dump closer to the incident.",
        ));
    }
    Ok(findings)
}
