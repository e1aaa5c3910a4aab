//! Runtime-inspector capability surface.
//!
//! The dump-reader library proper lives out of tree; the triage core only
//! ever talks to these traits. Everything the builder consumes (threads,
//! stack roots, heap objects, GC segments, sync blocks, modules) crosses
//! this boundary, so a backend (or a test) can stand in for the real reader
//! without the core noticing.
//!
//! Design rules:
//!
//! - Traits are object-safe; the core holds `Box<dyn …>` and never issues
//!   concurrent calls into a session.
//! - A session owns whatever OS resources the opened dump needs and releases
//!   them on drop, on every exit path.
//! - Fallible per-item reads return `Result`; the builder decides whether a
//!   failure becomes a skip or a data-quality warning. Backends should not
//!   pre-filter.
//!
//! The in-tree [`replay`] backend serves the same role as a trace replay
//! file in a live profiler: a portable capture that exercises the whole
//! pipeline without the native reader.

pub mod replay;

use anyhow::Result;
use std::path::Path;

// =============================================================================
// PLAIN-DATA RECORDS
// =============================================================================

/// Identity of one managed runtime found in the dump.
#[derive(Debug, Clone)]
pub struct RuntimeBanner {
    /// Runtime flavor, e.g. "CoreCLR" or "Desktop".
    pub flavor: String,
    /// Runtime version string as recorded in the dump.
    pub version: String,
}

impl RuntimeBanner {
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} {}", self.flavor, self.version)
    }
}

/// The exception a thread was carrying when the dump was taken.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
}

impl ExceptionInfo {
    /// Render as "Type: message", the form debuggers print.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}: {}", self.type_name, self.message)
        }
    }
}

/// GC segment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Gen0,
    Gen1,
    Gen2,
    Large,
    Pinned,
}

/// One GC segment: its kind and committed length in bytes.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRecord {
    pub kind: SegmentKind,
    pub length: u64,
}

/// A runtime sync block: an object used as a monitor.
#[derive(Debug, Clone, Copy)]
pub struct SyncBlockRecord {
    /// Threads currently waiting to enter the monitor.
    pub waiting_thread_count: u32,
    /// Whether the monitor is held right now.
    pub is_monitor_held: bool,
    /// Address of the holding thread's runtime structure, if known.
    pub holding_thread_address: Option<u64>,
    /// Address of the object serving as the monitor.
    pub object_address: u64,
}

/// A loaded module: name and image size in bytes.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub name: String,
    pub size: u64,
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Entry point: opens a dump file into a session.
pub trait DumpReader {
    /// Open the dump at `path`.
    ///
    /// Path validation (empty path, missing file) happens in the builder
    /// before this is called; `open` only fails on unreadable or malformed
    /// dumps.
    fn open(&self, path: &Path) -> Result<Box<dyn DumpSession + '_>>;
}

/// An opened dump. Dropping the session releases the dump's OS resources.
pub trait DumpSession {
    /// Managed runtimes present in the dump, in discovery order.
    fn runtimes(&self) -> Vec<RuntimeBanner>;

    /// Materialize the runtime at `index` (an index into [`runtimes`](Self::runtimes)).
    fn create_runtime(&self, index: usize) -> Result<Box<dyn RuntimeView + '_>>;
}

/// A materialized managed runtime.
pub trait RuntimeView {
    /// All threads the runtime tracks, dead and alive.
    fn threads(&self) -> Vec<Box<dyn ThreadView + '_>>;

    /// The GC heap, or `None` when the dump carries no heap data at all.
    fn heap(&self) -> Option<Box<dyn HeapView + '_>>;

    /// Loaded modules in enumeration order.
    fn modules(&self) -> Vec<ModuleRecord>;
}

/// One managed thread.
pub trait ThreadView {
    fn managed_id(&self) -> u32;

    /// Address of the thread's runtime structure (used to resolve sync-block owners).
    fn address(&self) -> u64;

    fn is_alive(&self) -> bool;

    /// Free-form state text, e.g. "Running" or "WaitSleepJoin".
    fn state_text(&self) -> String;

    /// Monitors this thread currently holds.
    fn lock_count(&self) -> u32;

    fn current_exception(&self) -> Option<ExceptionInfo>;

    fn is_finalizer(&self) -> bool;

    fn is_gc(&self) -> bool;

    /// Accumulated CPU time in milliseconds, when the dump recorded it.
    ///
    /// Readers have historically exposed this under several property names;
    /// the trait collapses them into one optional accessor. A read failure
    /// is an `Err`, which the builder records as absent.
    fn cpu_time_ms(&self) -> Result<Option<f64>>;

    /// Object addresses rooted on this thread's stack.
    fn stack_roots(&self) -> Result<Vec<u64>>;

    /// Stack frames, innermost first, as display text.
    fn stack_frames(&self) -> Result<Vec<String>>;
}

/// The GC heap of one runtime.
pub trait HeapView {
    /// Whether the heap is complete enough to enumerate objects.
    fn can_walk(&self) -> bool;

    /// Server GC vs workstation GC.
    fn is_server(&self) -> bool;

    fn segments(&self) -> Vec<SegmentRecord>;

    /// Every object on the heap, in segment order.
    fn objects(&self) -> Box<dyn Iterator<Item = Box<dyn ObjectView + '_>> + '_>;

    /// Resolve a single object by address, e.g. a stack root.
    fn object_at(&self, address: u64) -> Option<Box<dyn ObjectView + '_>>;

    fn sync_blocks(&self) -> Vec<SyncBlockRecord>;
}

/// One heap object.
pub trait ObjectView {
    /// Address of the object on the heap.
    fn address(&self) -> u64;

    /// False for corrupt or unreadable object headers.
    fn is_valid(&self) -> bool;

    fn type_name(&self) -> Option<String>;

    fn is_string(&self) -> bool;

    fn size(&self) -> u64;

    /// Read the object as a string, up to `max_chars` characters.
    ///
    /// Only meaningful when [`is_string`](Self::is_string) is true. Reads can
    /// fail on torn dumps; the builder skips the object in that case.
    fn read_string(&self, max_chars: usize) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_describe() {
        let banner =
            RuntimeBanner { flavor: "CoreCLR".to_string(), version: "8.0.11".to_string() };
        assert_eq!(banner.describe(), "CoreCLR 8.0.11");
    }

    #[test]
    fn test_exception_describe() {
        let exc = ExceptionInfo {
            type_name: "System.InvalidOperationException".to_string(),
            message: "Collection was modified".to_string(),
        };
        assert_eq!(exc.describe(), "System.InvalidOperationException: Collection was modified");

        let bare = ExceptionInfo {
            type_name: "System.OutOfMemoryException".to_string(),
            message: String::new(),
        };
        assert_eq!(bare.describe(), "System.OutOfMemoryException");
    }
}
