//! The immutable snapshot entity set.
//!
//! Everything here is constructed by the builder, owned by [`Snapshot`], and
//! read-only afterwards; the reasoner and the reporters never mutate it.
//! All of it serializes, so the `--json` report is just the model verbatim.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::domain::{ObjectAddress, ThreadId};

/// One captured thread with its stack.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSnapshot {
    pub managed_id: ThreadId,
    /// Free-form runtime state text, e.g. "Running" or "WaitSleepJoin".
    pub state: String,
    pub lock_count: u32,
    /// "Type: message" of the in-flight exception, if any.
    pub current_exception: Option<String>,
    pub is_finalizer: bool,
    pub is_gc: bool,
    /// Stack frames, innermost first, as display text.
    pub frames: Vec<String>,
    /// How many frames were actually captured (≤ requested).
    pub captured_frame_count: usize,
    /// The per-thread frame cap that was in force.
    pub requested_frame_count: usize,
    pub cpu_time_ms: Option<f64>,
}

/// Where a notable string was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StringSource {
    Stack,
    Heap,
    StackAndHeap,
}

impl StringSource {
    /// Fold in another sighting of the same value.
    #[must_use]
    pub fn merge(self, other: StringSource) -> StringSource {
        if self == other {
            self
        } else {
            StringSource::StackAndHeap
        }
    }
}

/// A deduplicated in-memory string worth showing to a human.
///
/// Unique by (possibly truncated) text value. Truncation keeps head and tail
/// so both ends stay diagnostically useful.
#[derive(Debug, Clone, Serialize)]
pub struct NotableString {
    /// Threads whose stacks root this value; empty for heap-only strings.
    pub thread_ids: BTreeSet<ThreadId>,
    pub text: String,
    /// Length of the original value before truncation, in characters.
    pub total_length: usize,
    pub was_truncated: bool,
    pub source: StringSource,
    /// How many times the value was observed (≥ 1).
    pub occurrences: u32,
}

/// GC heap accounting, summed over segments.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GcSnapshot {
    pub total_heap_bytes: u64,
    pub large_object_heap_bytes: u64,
    pub segment_count: usize,
    pub is_server_gc: bool,
    pub gen0_bytes: u64,
    pub gen1_bytes: u64,
    pub gen2_bytes: u64,
    pub pinned_bytes: u64,
}

/// Monitor contention totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BlockingSummary {
    pub sync_block_count: usize,
    /// Sum of waiting threads across all sync blocks.
    pub waiting_thread_count: u64,
}

/// A monitor that threads are waiting on (or that is held).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeadlockCandidate {
    /// Resolved owner, or `None` when the holding thread is unknown.
    pub owner_thread_id: Option<ThreadId>,
    pub waiting_threads: u32,
    pub object_address: ObjectAddress,
}

/// One row of the heap type histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HeapTypeStat {
    pub type_name: String,
    pub total_size: u64,
    pub instance_count: u64,
}

/// One loaded module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub size: u64,
}

/// Everything the builder extracted from one dump.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub dump_path: String,
    /// "Flavor version" of the runtime that was analyzed.
    pub runtime_description: String,
    /// Alive threads in the runtime, before the capture cap.
    pub total_thread_count: usize,
    /// Captured threads, highest-interest first (see the selection comparator).
    pub threads: Vec<ThreadSnapshot>,
    pub gc: GcSnapshot,
    pub blocking: BlockingSummary,
    /// Notable strings in first-seen order.
    pub strings: Vec<NotableString>,
    pub deadlocks: Vec<DeadlockCandidate>,
    /// Heap types, descending by total size, truncated to the requested top-N.
    pub heap_histogram: Vec<HeapTypeStat>,
    /// Full module enumeration in insertion order.
    pub modules: Vec<ModuleInfo>,
    /// Distinct heap types observed (the histogram may be shorter).
    pub total_heap_type_count: usize,
    pub total_module_count: usize,
    pub total_module_bytes: u64,
    /// Fraction of module bytes covered by the top-20 display set, in [0, 1].
    pub module_coverage_shown: f64,
    pub unique_string_count: usize,
    pub total_string_occurrences: u64,
    pub stack_string_occurrences: u64,
    pub heap_string_occurrences: u64,
    pub total_heap_object_count: u64,
    /// Fraction of heap bytes attributed to the histogram rows, in [0, 1].
    pub heap_histogram_coverage: f64,
    /// Data-quality warnings, sorted by category priority then message.
    pub warnings: Vec<super::warnings::DataWarning>,
    /// CPU count of the analysis host, captured so the reasoner stays pure.
    pub host_cpu_count: usize,
}
