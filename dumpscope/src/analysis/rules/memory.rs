//! Memory rules: managed heap pressure, GC shape, dominant types, native
//! footprint.

use super::{GIB, MIB};
use crate::analysis::findings::{format_bytes, Finding, Severity};
use crate::snapshot::model::Snapshot;

/// Managed heap above this is critical pressure on its own.
const HEAP_CRITICAL_BYTES: u64 = 2 * GIB;
/// LOH above this suggests unbounded large-allocation growth.
const LOH_WARNING_BYTES: u64 = 512 * MIB;

/// Total heap size thresholds.
pub(crate) fn memory_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let gc = &snapshot.gc;
    if gc.total_heap_bytes > HEAP_CRITICAL_BYTES {
        findings.push(Finding::new(
            Severity::Critical,
            "High managed memory pressure",
            format!(
                "Managed heap holds {} (gen0 {}, gen1 {}, gen2 {}, LOH {})",
                format_bytes(gc.total_heap_bytes),
                format_bytes(gc.gen0_bytes),
                format_bytes(gc.gen1_bytes),
                format_bytes(gc.gen2_bytes),
                format_bytes(gc.large_object_heap_bytes)
            ),
            "Take a second dump a few minutes later and compare heap growth; \
             inspect the heap histogram for the dominant types and trace what \
             roots them.",
        ));
    } else if gc.large_object_heap_bytes > LOH_WARNING_BYTES {
        findings.push(Finding::new(
            Severity::Warning,
            "Large Object Heap growth",
            format!(
                "Large Object Heap holds {} of a {} total heap",
                format_bytes(gc.large_object_heap_bytes),
                format_bytes(gc.total_heap_bytes)
            ),
            "Look for large arrays and buffers (>85 KB) allocated per request; \
             pool or chunk them so they stay out of the LOH.",
        ));
    }
}

/// Generation-ratio and GC-mode rules.
pub(crate) fn gc_nuance_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let gc = &snapshot.gc;
    let total = gc.total_heap_bytes;
    let ratio = |part: u64| if total == 0 { 0.0 } else { part as f64 / total as f64 };
    let gen2_share = ratio(gc.gen2_bytes);
    let gen0_share = ratio(gc.gen0_bytes);
    let pinned_share = ratio(gc.pinned_bytes);

    if gen2_share >= 0.8 && gen0_share < 0.1 {
        findings.push(Finding::new(
            Severity::Warning,
            "Gen2 dominant",
            format!(
                "Gen2 holds {:.0}% of the heap while gen0 holds {:.0}%",
                gen2_share * 100.0,
                gen0_share * 100.0
            ),
            "Objects are surviving to gen2 and staying there; check for caches \
             without eviction and long-lived references to per-request data.",
        ));
    }
    if pinned_share >= 0.10 {
        findings.push(Finding::new(
            Severity::Warning,
            "High pinned object pressure",
            format!("Pinned segments hold {:.0}% of the heap", pinned_share * 100.0),
            "Pinned buffers fragment the heap; use pooled pinned buffers \
             (ArrayPool, POH) instead of pinning ad hoc.",
        ));
    }
    if !gc.is_server_gc && snapshot.host_cpu_count >= 4 {
        findings.push(Finding::new(
            Severity::Info,
            "Workstation GC on multi-core host",
            format!(
                "Workstation GC is in use on a {}-CPU host",
                snapshot.host_cpu_count
            ),
            "Server GC usually improves throughput for multi-core server \
             workloads; enable it in the runtime configuration.",
        ));
    }
}

/// One type owning most of the heap.
pub(crate) fn heap_leak_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let total = snapshot.gc.total_heap_bytes;
    let Some(top) = snapshot.heap_histogram.first() else {
        return;
    };
    if total > 0 && top.total_size as f64 / total as f64 > 0.5 {
        findings.push(Finding::new(
            Severity::Warning,
            "Dominant heap type detected",
            format!(
                "{} holds {} across {} instances ({:.0}% of the heap)",
                top.type_name,
                format_bytes(top.total_size),
                top.instance_count,
                top.total_size as f64 / total as f64 * 100.0
            ),
            "A single type owning most of the heap usually means a leak or an \
             unbounded cache; find what keeps these instances reachable.",
        ));
    }
}

/// Large native image footprint next to a small managed heap.
pub(crate) fn native_footprint_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    const MODULE_BYTES_THRESHOLD: u64 = 1_000_000_000;
    if snapshot.total_module_bytes > MODULE_BYTES_THRESHOLD
        && snapshot.gc.total_heap_bytes < 512 * MIB
    {
        findings.push(Finding::new(
            Severity::Info,
            "Native footprint elevated",
            format!(
                "Loaded modules total {} while the managed heap holds only {}",
                format_bytes(snapshot.total_module_bytes),
                format_bytes(snapshot.gc.total_heap_bytes)
            ),
            "Process memory is going to native images, not managed objects; \
             profile native allocations or trim loaded modules.",
        ));
    }
}
