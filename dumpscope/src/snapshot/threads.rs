//! Thread selection for stack capture.
//!
//! Dumps of busy worker processes carry hundreds of threads; capturing every
//! stack would swamp both the snapshot and the reader. Selection scores each
//! alive thread by how much it can tell a human about the failure, forces a
//! handful of must-keep threads into the set, and truncates the rest behind
//! a warning that names what was dropped.

use std::collections::BTreeMap;

use crate::snapshot::warnings::{DataWarning, WarningCategory};

/// Interest score weights. An in-flight exception dominates everything.
const SCORE_EXCEPTION: u32 = 1000;
const SCORE_RUNNING: u32 = 200;
const SCORE_WAITING: u32 = 120;
const SCORE_FINALIZER: u32 = 80;
const SCORE_GC: u32 = 40;
const SCORE_PER_LOCK: u32 = 5;
const SCORE_LOCK_CAP: u32 = 200;

/// Per-category quota for the forced set.
const FORCED_RUNNING: usize = 5;
const FORCED_WAITING: usize = 5;

/// Threads always captured regardless of `top_stack_threads`, so a snapshot
/// keeps enough context to be readable.
pub(crate) const MIN_CAPTURE: usize = 10;

/// Ids listed in the truncation warning before it cuts off.
const MAX_DROPPED_IDS_SHOWN: usize = 20;

/// Everything selection needs to know about one alive thread.
///
/// Extracted from the inspector once; `view_index` points back at the boxed
/// thread view for the later stack read.
#[derive(Debug, Clone)]
pub(crate) struct ThreadProbe {
    pub view_index: usize,
    pub managed_id: u32,
    pub address: u64,
    pub state: String,
    pub lock_count: u32,
    pub exception: Option<String>,
    pub is_finalizer: bool,
    pub is_gc: bool,
}

impl ThreadProbe {
    fn is_running(&self) -> bool {
        state_contains(&self.state, "Running")
    }

    fn is_waiting(&self) -> bool {
        state_contains(&self.state, "Wait") || state_contains(&self.state, "Sleep")
    }
}

fn state_contains(state: &str, needle: &str) -> bool {
    state.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

/// Interest score; higher is kept first.
#[must_use]
pub(crate) fn thread_score(probe: &ThreadProbe) -> u32 {
    let mut score = 0;
    if probe.exception.is_some() {
        score += SCORE_EXCEPTION;
    }
    if probe.is_running() {
        score += SCORE_RUNNING;
    }
    if probe.is_waiting() {
        score += SCORE_WAITING;
    }
    if probe.is_finalizer {
        score += SCORE_FINALIZER;
    }
    if probe.is_gc {
        score += SCORE_GC;
    }
    score + (probe.lock_count * SCORE_PER_LOCK).min(SCORE_LOCK_CAP)
}

/// Outcome of selection: threads to capture and threads dropped by the cap.
pub(crate) struct Selection {
    pub kept: Vec<ThreadProbe>,
    pub dropped: Vec<ThreadProbe>,
}

/// Pick the threads whose stacks get captured.
///
/// Order is `(score desc, lock_count desc, managed_id desc)`; a forced set
/// (the first excepting thread plus up to five running and five waiting
/// threads) is pulled to the front before the cap is applied. The cap is
/// `max(top_stack_threads, MIN_CAPTURE)`.
pub(crate) fn select_threads(probes: Vec<ThreadProbe>, top_stack_threads: usize) -> Selection {
    let cap = top_stack_threads.max(MIN_CAPTURE);

    let mut scored: Vec<(u32, ThreadProbe)> =
        probes.into_iter().map(|p| (thread_score(&p), p)).collect();
    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.lock_count.cmp(&a.lock_count))
            .then_with(|| b.managed_id.cmp(&a.managed_id))
    });

    // Mark the forced set off the score order: the first thread carrying an
    // exception, then quota slots for running and waiting threads. One
    // thread may satisfy several criteria at once.
    let mut exception_taken = false;
    let mut running_taken = 0usize;
    let mut waiting_taken = 0usize;
    let mut forced: Vec<bool> = Vec::with_capacity(scored.len());
    for (_, probe) in &scored {
        let mut keep = false;
        if probe.exception.is_some() && !exception_taken {
            exception_taken = true;
            keep = true;
        }
        if probe.is_running() && running_taken < FORCED_RUNNING {
            running_taken += 1;
            keep = true;
        }
        if probe.is_waiting() && waiting_taken < FORCED_WAITING {
            waiting_taken += 1;
            keep = true;
        }
        forced.push(keep);
    }

    let mut ordered: Vec<(bool, u32, ThreadProbe)> = scored
        .into_iter()
        .zip(forced)
        .map(|((score, probe), forced)| (forced, score, probe))
        .collect();
    ordered.sort_by(|(fa, sa, a), (fb, sb, b)| {
        fb.cmp(fa)
            .then_with(|| sb.cmp(sa))
            .then_with(|| b.lock_count.cmp(&a.lock_count))
            .then_with(|| b.managed_id.cmp(&a.managed_id))
    });

    let mut kept = Vec::with_capacity(cap.min(ordered.len()));
    let mut dropped = Vec::new();
    for (_, _, probe) in ordered {
        if kept.len() < cap {
            kept.push(probe);
        } else {
            dropped.push(probe);
        }
    }
    Selection { kept, dropped }
}

/// Build the `ThreadTruncation` warning for a non-empty dropped set.
///
/// Names up to [`MAX_DROPPED_IDS_SHOWN`] ids and a per-state histogram of
/// the dropped threads, alphabetical for determinism.
pub(crate) fn truncation_warning(kept: usize, dropped: &[ThreadProbe]) -> DataWarning {
    let mut ids: Vec<String> = dropped
        .iter()
        .take(MAX_DROPPED_IDS_SHOWN)
        .map(|p| p.managed_id.to_string())
        .collect();
    if dropped.len() > MAX_DROPPED_IDS_SHOWN {
        ids.push(format!("and {} more", dropped.len() - MAX_DROPPED_IDS_SHOWN));
    }

    let mut states: BTreeMap<&str, usize> = BTreeMap::new();
    for probe in dropped {
        *states.entry(probe.state.as_str()).or_default() += 1;
    }
    let histogram: Vec<String> =
        states.iter().map(|(state, count)| format!("{state}={count}")).collect();

    DataWarning::new(
        WarningCategory::ThreadTruncation,
        format!(
            "Captured stacks for {kept} threads; dropped {} (ids: {}; states: {})",
            dropped.len(),
            ids.join(", "),
            histogram.join(", ")
        ),
    )
}
