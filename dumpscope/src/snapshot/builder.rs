//! The snapshot builder: a deterministic, bounded extraction pipeline.
//!
//! One pass over the dump, in a fixed phase order:
//!
//! 1. Validate the path and open the dump; pick the first managed runtime.
//! 2. Seed data-quality warnings (unwalkable heap).
//! 3. Select threads and capture their stacks.
//! 4. Account GC segments into generation totals.
//! 5. Summarize sync blocks.
//! 6. Extract strings from stack roots.
//! 7. Derive deadlock candidates from held/contended monitors.
//! 8. Walk the heap: type histogram plus heap strings.
//! 9. Enumerate modules.
//! 10. Compute coverage fractions.
//! 11. Sort warnings.
//!
//! Every limit is enforced here and every enforcement is observable as a
//! warning on the snapshot. Per-item inspector failures (one stack, one
//! string, one property) degrade to skips or warnings; the builder returns
//! a usable snapshot from any dump it can open. Only a missing path, a
//! missing file, a runtime-less dump, cancellation, or a broken session
//! abort the build.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::domain::{CancelToken, ObjectAddress, ThreadId, TriageError};
use crate::inspector::{DumpReader, SegmentKind, SyncBlockRecord};
use crate::snapshot::heap::{histogram_coverage, walk_heap, HeapWalkOutput};
use crate::snapshot::model::{
    BlockingSummary, DeadlockCandidate, GcSnapshot, ModuleInfo, Snapshot, ThreadSnapshot,
};
use crate::snapshot::strings::{
    extract_stack_strings, StringTally, STRING_CAPTURE_HARD_CAP, STRING_LENGTH_HARD_CAP,
};
use crate::snapshot::threads::{select_threads, truncation_warning, ThreadProbe};
use crate::snapshot::warnings::{sort_warnings, DataWarning, WarningCategory};

/// Modules shown by reporters; enumeration past this cap is recorded but
/// flagged, and coverage tells how much of the byte total the cap hides.
const MODULE_DISPLAY_CAP: usize = 20;

/// Distinct heap types past this count flag the histogram as clamped.
const HISTOGRAM_CLAMP_NOTE_THRESHOLD: usize = 10;

/// Thread ids listed in a `StackReadPartial` warning.
const MAX_FAILED_STACKS_SHOWN: usize = 10;

// =============================================================================
// BUILD OPTIONS
// =============================================================================

/// Resource bounds for one extraction. All fields are independent.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Upper bound on stack-root string aggregates; 0 disables capture.
    pub max_strings_to_capture: usize,
    /// Characters kept per string before head+tail truncation. Hard-capped
    /// internally to [`STRING_LENGTH_HARD_CAP`].
    pub max_string_length: usize,
    /// Upper bound on additional heap-string aggregates; 0 disables.
    pub heap_string_limit: usize,
    /// Top-N heap types to surface; 0 disables the heap walk's histogram.
    pub heap_histogram_count: usize,
    /// Per-thread stack frame cap.
    pub max_stack_frames: usize,
    /// Display cap for threads carrying stacks. Capture always keeps at
    /// least ten threads so the snapshot retains context.
    pub top_stack_threads: usize,
    /// CPU count of the analysis host, recorded onto the snapshot for the
    /// CPU-sensitive rules. See [`detect_host_cpus`].
    pub host_cpu_count: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_strings_to_capture: 100,
            max_string_length: STRING_LENGTH_HARD_CAP,
            heap_string_limit: 100,
            heap_histogram_count: 20,
            max_stack_frames: 30,
            top_stack_threads: 5,
            host_cpu_count: 1,
        }
    }
}

/// CPU count of this machine, for [`BuildOptions::host_cpu_count`].
#[must_use]
pub fn detect_host_cpus() -> usize {
    std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1)
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Build a snapshot from the dump at `dump_path`.
pub fn build(
    reader: &dyn DumpReader,
    dump_path: &str,
    options: &BuildOptions,
) -> Result<Snapshot, TriageError> {
    build_with_cancel(reader, dump_path, options, &CancelToken::new())
}

/// [`build`], polling `cancel` between phases. A tripped token aborts with
/// [`TriageError::Cancelled`]; a partial snapshot is never returned.
pub fn build_with_cancel(
    reader: &dyn DumpReader,
    dump_path: &str,
    options: &BuildOptions,
    cancel: &CancelToken,
) -> Result<Snapshot, TriageError> {
    // ── Validate and open ───────────────────────────────────────────────
    if dump_path.trim().is_empty() {
        return Err(TriageError::MissingPath);
    }
    let path = Path::new(dump_path);
    if !path.exists() {
        return Err(TriageError::FileNotFound(path.to_path_buf()));
    }

    let session = reader.open(path)?;
    let banners = session.runtimes();
    let Some(banner) = banners.first() else {
        return Err(TriageError::NoManagedRuntime);
    };
    let runtime_description = banner.describe();
    log::info!("Analyzing {} ({runtime_description})", path.display());
    let runtime = session.create_runtime(0)?;
    checkpoint(cancel)?;

    let mut warnings: Vec<DataWarning> = Vec::new();

    // ── Seed warnings ───────────────────────────────────────────────────
    let heap = runtime.heap();
    let heap_walkable = heap.as_ref().is_some_and(|h| h.can_walk());
    if !heap_walkable {
        warnings.push(DataWarning::new(
            WarningCategory::HeapUnavailable,
            "GC heap is not walkable; heap statistics and heap strings are unavailable",
        ));
    }
    checkpoint(cancel)?;

    // ── Thread selection and stack capture ──────────────────────────────
    let views = runtime.threads();
    let alive: Vec<ThreadProbe> = views
        .iter()
        .enumerate()
        .filter(|(_, view)| view.is_alive())
        .map(|(view_index, view)| ThreadProbe {
            view_index,
            managed_id: view.managed_id(),
            address: view.address(),
            state: view.state_text(),
            lock_count: view.lock_count(),
            exception: view.current_exception().map(|e| e.describe()),
            is_finalizer: view.is_finalizer(),
            is_gc: view.is_gc(),
        })
        .collect();
    let total_thread_count = alive.len();
    if alive.is_empty() {
        warnings.push(DataWarning::new(
            WarningCategory::ThreadSelection,
            "Runtime reported no alive managed threads",
        ));
    }

    let selection = select_threads(alive.clone(), options.top_stack_threads);
    if !selection.dropped.is_empty() {
        warnings.push(truncation_warning(selection.kept.len(), &selection.dropped));
    }

    let mut threads = Vec::with_capacity(selection.kept.len());
    let mut failed_stacks: Vec<u32> = Vec::new();
    for probe in &selection.kept {
        let view = &views[probe.view_index];
        let mut frames = match view.stack_frames() {
            Ok(frames) => frames,
            Err(err) => {
                log::debug!("Stack unwind failed for thread {}: {err}", probe.managed_id);
                failed_stacks.push(probe.managed_id);
                Vec::new()
            }
        };
        frames.truncate(options.max_stack_frames);
        let captured_frame_count = frames.len();
        threads.push(ThreadSnapshot {
            managed_id: ThreadId(probe.managed_id),
            state: probe.state.clone(),
            lock_count: probe.lock_count,
            current_exception: probe.exception.clone(),
            is_finalizer: probe.is_finalizer,
            is_gc: probe.is_gc,
            frames,
            captured_frame_count,
            requested_frame_count: options.max_stack_frames,
            cpu_time_ms: view.cpu_time_ms().ok().flatten(),
        });
    }
    if !failed_stacks.is_empty() {
        let shown: Vec<String> = failed_stacks
            .iter()
            .take(MAX_FAILED_STACKS_SHOWN)
            .map(u32::to_string)
            .collect();
        warnings.push(DataWarning::new(
            WarningCategory::StackReadPartial,
            format!(
                "Stack frames unavailable for {} thread(s) (ids: {})",
                failed_stacks.len(),
                shown.join(", ")
            ),
        ));
    }
    checkpoint(cancel)?;

    // ── GC segment accounting ───────────────────────────────────────────
    let mut gc = GcSnapshot::default();
    if let Some(heap) = heap.as_ref() {
        gc.is_server_gc = heap.is_server();
        let segments = heap.segments();
        gc.segment_count = segments.len();
        for segment in &segments {
            gc.total_heap_bytes += segment.length;
            match segment.kind {
                SegmentKind::Gen0 => gc.gen0_bytes += segment.length,
                SegmentKind::Gen1 => gc.gen1_bytes += segment.length,
                SegmentKind::Gen2 => gc.gen2_bytes += segment.length,
                SegmentKind::Large => gc.large_object_heap_bytes += segment.length,
                SegmentKind::Pinned => gc.pinned_bytes += segment.length,
            }
        }
    }
    checkpoint(cancel)?;

    // ── Blocking summary ────────────────────────────────────────────────
    let sync_blocks: Vec<SyncBlockRecord> =
        heap.as_ref().map(|h| h.sync_blocks()).unwrap_or_default();
    let blocking = BlockingSummary {
        sync_block_count: sync_blocks.len(),
        waiting_thread_count: sync_blocks
            .iter()
            .map(|b| u64::from(b.waiting_thread_count))
            .sum(),
    };
    checkpoint(cancel)?;

    // ── Stack-root string extraction ────────────────────────────────────
    let effective_max_length = options.max_string_length.min(STRING_LENGTH_HARD_CAP);
    let stack_capture_limit = options.max_strings_to_capture.min(STRING_CAPTURE_HARD_CAP);
    if options.max_strings_to_capture > STRING_CAPTURE_HARD_CAP
        || options.max_string_length > STRING_LENGTH_HARD_CAP
    {
        warnings.push(DataWarning::new(
            WarningCategory::StringClamp,
            format!(
                "String capture clamped to {stack_capture_limit} values of \
                 {effective_max_length} characters"
            ),
        ));
    }

    let mut tally = StringTally::new(effective_max_length);
    let mut stack_owners: HashMap<u64, BTreeSet<ThreadId>> = HashMap::new();
    if stack_capture_limit > 0 {
        if let Some(heap) = heap.as_ref() {
            let deduped = extract_stack_strings(
                &views,
                heap.as_ref(),
                stack_capture_limit,
                &mut tally,
                &mut stack_owners,
            );
            if deduped > 0 {
                warnings.push(DataWarning::new(
                    WarningCategory::StringDedupe,
                    format!("Merged {deduped} duplicate stack string occurrence(s)"),
                ));
            }
        }
    }
    checkpoint(cancel)?;

    // ── Deadlock candidates ─────────────────────────────────────────────
    let thread_by_address: HashMap<u64, u32> =
        alive.iter().filter(|p| p.address != 0).map(|p| (p.address, p.managed_id)).collect();
    let deadlocks: Vec<DeadlockCandidate> = sync_blocks
        .iter()
        .filter(|b| b.waiting_thread_count > 0 || b.is_monitor_held)
        .map(|b| DeadlockCandidate {
            owner_thread_id: b
                .holding_thread_address
                .and_then(|addr| thread_by_address.get(&addr))
                .map(|&id| ThreadId(id)),
            waiting_threads: b.waiting_thread_count,
            object_address: ObjectAddress(b.object_address),
        })
        .collect();
    checkpoint(cancel)?;

    // ── Heap walk: histogram and heap strings ───────────────────────────
    let available = STRING_CAPTURE_HARD_CAP.saturating_sub(tally.len());
    let heap_string_budget = options.heap_string_limit.min(available);
    let mut heap_out =
        HeapWalkOutput { histogram: Vec::new(), total_types: 0, total_objects: 0, deduped: 0 };
    if let Some(heap_ref) = heap.as_ref().filter(|h| h.can_walk()) {
        if options.heap_string_limit > heap_string_budget {
            warnings.push(DataWarning::new(
                WarningCategory::HeapStringClamp,
                format!(
                    "Heap string capture clamped to {heap_string_budget} of \
                     {} requested values",
                    options.heap_string_limit
                ),
            ));
        }
        if options.heap_histogram_count > 0 || heap_string_budget > 0 {
            heap_out = walk_heap(
                heap_ref.as_ref(),
                options.heap_histogram_count,
                heap_string_budget,
                &mut tally,
                &stack_owners,
            );
            if heap_out.deduped > 0 {
                warnings.push(DataWarning::new(
                    WarningCategory::StringDedupe,
                    format!(
                        "Merged {} duplicate heap string occurrence(s)",
                        heap_out.deduped
                    ),
                ));
            }
            if heap_out.total_types > HISTOGRAM_CLAMP_NOTE_THRESHOLD {
                let coverage = histogram_coverage(&heap_out.histogram, gc.total_heap_bytes);
                warnings.push(DataWarning::new(
                    WarningCategory::HeapHistogramClamp,
                    format!(
                        "Heap histogram shows {} of {} types ({:.0}% of heap bytes)",
                        heap_out.histogram.len(),
                        heap_out.total_types,
                        coverage * 100.0
                    ),
                ));
            }
        }
    }
    checkpoint(cancel)?;

    // ── Modules ─────────────────────────────────────────────────────────
    let modules: Vec<ModuleInfo> = runtime
        .modules()
        .into_iter()
        .map(|m| ModuleInfo { name: m.name, size: m.size })
        .collect();
    let total_module_bytes: u64 = modules.iter().map(|m| m.size).sum();
    if modules.len() > MODULE_DISPLAY_CAP {
        warnings.push(DataWarning::new(
            WarningCategory::ModuleClamp,
            format!("Displaying top {MODULE_DISPLAY_CAP} of {} modules", modules.len()),
        ));
    }
    checkpoint(cancel)?;

    // ── Coverage ────────────────────────────────────────────────────────
    let module_coverage_shown = if total_module_bytes == 0 {
        0.0
    } else {
        let mut sizes: Vec<u64> = modules.iter().map(|m| m.size).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        let shown: u64 = sizes.iter().take(MODULE_DISPLAY_CAP).sum();
        (shown as f64 / total_module_bytes as f64).clamp(0.0, 1.0)
    };
    let heap_histogram_coverage = histogram_coverage(&heap_out.histogram, gc.total_heap_bytes);

    // ── Warning sort ────────────────────────────────────────────────────
    sort_warnings(&mut warnings);

    let stack_string_occurrences = tally.stack_occurrences();
    let heap_string_occurrences = tally.heap_occurrences();
    let strings = tally.into_entries();
    let total_module_count = modules.len();

    Ok(Snapshot {
        dump_path: dump_path.to_string(),
        runtime_description,
        total_thread_count,
        threads,
        gc,
        blocking,
        unique_string_count: strings.len(),
        total_string_occurrences: stack_string_occurrences + heap_string_occurrences,
        stack_string_occurrences,
        heap_string_occurrences,
        strings,
        deadlocks,
        heap_histogram: heap_out.histogram,
        total_heap_type_count: heap_out.total_types,
        total_heap_object_count: heap_out.total_objects,
        heap_histogram_coverage,
        modules,
        total_module_count,
        total_module_bytes,
        module_coverage_shown,
        warnings,
        host_cpu_count: options.host_cpu_count,
    })
}

fn checkpoint(cancel: &CancelToken) -> Result<(), TriageError> {
    if cancel.is_cancelled() {
        Err(TriageError::Cancelled)
    } else {
        Ok(())
    }
}
