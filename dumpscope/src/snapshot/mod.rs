//! Snapshot extraction: the data model and the builder pipeline.
//!
//! - [`model`]: the immutable entity set a build produces
//! - [`builder`]: the eleven-phase extraction pipeline and its options
//! - [`threads`]: thread scoring and selection
//! - [`strings`]: head+tail truncation and string deduplication
//! - [`heap`]: heap object walk (histogram + heap strings)
//! - [`warnings`]: data-quality warning categories and ordering

pub mod builder;
mod heap;
pub mod model;
pub mod strings;
mod threads;
pub mod warnings;

// Re-export the working surface
pub use builder::{build, build_with_cancel, detect_host_cpus, BuildOptions};
pub use model::{
    BlockingSummary, DeadlockCandidate, GcSnapshot, HeapTypeStat, ModuleInfo, NotableString,
    Snapshot, StringSource, ThreadSnapshot,
};
pub use strings::{head_tail_truncate, STRING_CAPTURE_HARD_CAP, STRING_LENGTH_HARD_CAP};
pub use warnings::{DataWarning, WarningCategory};
