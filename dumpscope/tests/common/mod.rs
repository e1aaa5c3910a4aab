//! Shared helpers for integration tests: write replay captures to disk so
//! the full open→build→analyze path runs exactly as the CLI drives it.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use dumpscope::inspector::replay::{
    DumpFixture, RuntimeFixture, SegmentFixture, SegmentKindFixture, ThreadFixture,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Write `fixture` to a unique temp file and return its path.
pub fn capture_file(fixture: &DumpFixture) -> PathBuf {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "dumpscope-it-{}-{}.json",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&path, serde_json::to_string_pretty(fixture).unwrap()).unwrap();
    path
}

pub fn running_thread(id: u32) -> ThreadFixture {
    ThreadFixture { managed_id: id, state: "Running".to_string(), ..ThreadFixture::default() }
}

pub fn waiting_thread(id: u32) -> ThreadFixture {
    ThreadFixture {
        managed_id: id,
        state: "WaitSleepJoin".to_string(),
        ..ThreadFixture::default()
    }
}

/// Segments sized in MiB, one per non-zero generation.
pub fn segments_mib(gen0: u64, gen1: u64, gen2: u64, large: u64, pinned: u64) -> Vec<SegmentFixture> {
    const MIB: u64 = 1024 * 1024;
    [
        (SegmentKindFixture::Gen0, gen0),
        (SegmentKindFixture::Gen1, gen1),
        (SegmentKindFixture::Gen2, gen2),
        (SegmentKindFixture::Large, large),
        (SegmentKindFixture::Pinned, pinned),
    ]
    .into_iter()
    .filter(|&(_, mib)| mib > 0)
    .map(|(kind, mib)| SegmentFixture { kind, length: mib * MIB })
    .collect()
}

pub fn single_runtime(threads: Vec<ThreadFixture>) -> RuntimeFixture {
    RuntimeFixture { threads, ..RuntimeFixture::default() }
}
