//! Inventory rules: string population, module anomalies, coverage, and
//! data-availability roll-up.

use super::{contains_any_ci, MIB};
use crate::analysis::findings::{format_bytes, Finding, Severity};
use crate::snapshot::model::Snapshot;

/// Duplicate-string and stack-concentration signals.
pub(crate) fn string_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    const DUPLICATION_THRESHOLD: f64 = 0.75;
    const MIN_OCCURRENCES: u64 = 20;

    let total = snapshot.total_string_occurrences;
    if total == 0 {
        return;
    }

    let duplication = 1.0 - snapshot.unique_string_count as f64 / total as f64;
    if duplication >= DUPLICATION_THRESHOLD && total >= MIN_OCCURRENCES {
        findings.push(Finding::new(
            Severity::Warning,
            "High duplicate string frequency",
            format!(
                "{} unique values cover {} occurrences ({:.0}% duplication)",
                snapshot.unique_string_count,
                total,
                duplication * 100.0
            ),
            "The same strings are materialized over and over; intern or cache \
             them instead of re-allocating per request.",
        ));
    }

    let stack = snapshot.stack_string_occurrences;
    let heap = snapshot.heap_string_occurrences;
    if stack > 2 * heap && stack >= MIN_OCCURRENCES {
        findings.push(Finding::new(
            Severity::Info,
            "Strings concentrated on stacks",
            format!("{stack} stack-rooted occurrences vs {heap} heap occurrences"),
            "String traffic is dominated by in-flight call state, not stored \
             data; usually benign, but worth a look if allocation rate is \
             high.",
        ));
    }
}

/// Oversized and instrumentation modules.
pub(crate) fn module_anomaly_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    const LARGE_MODULE_BYTES: u64 = 200 * MIB;
    const LARGE_MODULES_SHOWN: usize = 5;
    const INSTRUMENTATION_MARKERS: &[&str] = &["profiler", "instrumentation", "agent"];

    let large: Vec<String> = snapshot
        .modules
        .iter()
        .filter(|m| m.size >= LARGE_MODULE_BYTES)
        .take(LARGE_MODULES_SHOWN)
        .map(|m| format!("{} ({})", m.name, format_bytes(m.size)))
        .collect();
    if !large.is_empty() {
        findings.push(Finding::new(
            Severity::Warning,
            "Unusually large modules loaded",
            large.join("\n"),
            "Modules this large inflate private bytes and startup time; check \
             whether they belong in this process at all.",
        ));
    }

    let instrumentation: Vec<&str> = snapshot
        .modules
        .iter()
        .filter(|m| contains_any_ci(&m.name, INSTRUMENTATION_MARKERS))
        .map(|m| m.name.as_str())
        .collect();
    if !instrumentation.is_empty() {
        findings.push(Finding::new(
            Severity::Info,
            "Profiler/instrumentation modules detected",
            instrumentation.join("\n"),
            "An instrumentation agent is resident; rule out its overhead or \
             interference before blaming the application.",
        ));
    }
}

/// How much of the heap and module population the snapshot actually shows.
pub(crate) fn coverage_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    if snapshot.heap_histogram_coverage < 0.5 && !snapshot.heap_histogram.is_empty() {
        findings.push(Finding::new(
            Severity::Info,
            "Heap type coverage limited",
            format!(
                "The histogram covers {:.0}% of heap bytes",
                snapshot.heap_histogram_coverage * 100.0
            ),
            "Re-run with a larger heap histogram to see the types the current \
             top-N leaves out.",
        ));
    }
    if snapshot.module_coverage_shown < 0.9 && !snapshot.modules.is_empty() {
        findings.push(Finding::new(
            Severity::Info,
            "Module list truncated",
            format!(
                "The displayed modules cover {:.0}% of module bytes",
                snapshot.module_coverage_shown * 100.0
            ),
            "Consult the JSON report for the full module list.",
        ));
    }
}

/// Roll every data-quality warning into one finding so truncation is never
/// mistaken for absence of evidence.
pub(crate) fn data_availability_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    if snapshot.warnings.is_empty() {
        return;
    }
    let lines: Vec<&str> = snapshot.warnings.iter().map(|w| w.message.as_str()).collect();
    findings.push(Finding::new(
        Severity::Warning,
        "Data availability warning",
        lines.join("\n"),
        "Parts of the dump were truncated or unreadable; treat absent signals \
         as unknown rather than absent.",
    ));
}
