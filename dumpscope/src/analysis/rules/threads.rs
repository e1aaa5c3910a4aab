//! Thread rules: crashes, CPU shape, finalizer health, thread-pool health,
//! wait classification, and non-monitor blocking hotspots.

use std::collections::HashMap;

use super::{contains_any_ci, contains_ci};
use crate::analysis::findings::{Finding, Severity};
use crate::snapshot::model::{Snapshot, ThreadSnapshot};

/// Frames from the top of each stack considered "current work".
const TOP_FRAMES: usize = 5;

/// Keyword tables for wait classification. Matching is case-insensitive
/// substring, so both full namespaces and bare type names hit.
const HTTP_WAIT_MARKERS: &[&str] = &["HttpClient", "System.Net.Http", "HttpConnection"];
const SQL_WAIT_MARKERS: &[&str] =
    &["SqlClient", "Microsoft.Data.SqlClient", "System.Data.SqlClient"];
const SYNC_OVER_ASYNC_MARKERS: &[&str] =
    &["Task.Wait", "Task`1.GetResult", "GetAwaiter().GetResult"];
const THREADPOOL_GATE_MARKERS: &[&str] = &["ThreadPoolWorkQueue", "PortableThreadPool"];

/// Threads showing the same I/O or wait pattern before a finding fires.
const WAIT_PATTERN_THRESHOLD: usize = 3;

fn is_running(thread: &ThreadSnapshot) -> bool {
    contains_ci(&thread.state, "Running")
}

fn is_waiting(thread: &ThreadSnapshot) -> bool {
    contains_ci(&thread.state, "Wait") || contains_ci(&thread.state, "Sleep")
}

fn is_parked(thread: &ThreadSnapshot) -> bool {
    is_waiting(thread) || contains_ci(&thread.state, "Block")
}

/// Count captured threads with any frame matching any marker.
fn threads_matching<'a>(snapshot: &'a Snapshot, markers: &[&str]) -> Vec<&'a ThreadSnapshot> {
    snapshot
        .threads
        .iter()
        .filter(|t| t.frames.iter().any(|f| contains_any_ci(f, markers)))
        .collect()
}

/// In-flight exceptions: the loudest signal a dump can carry.
pub(crate) fn crash_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    for thread in &snapshot.threads {
        if let Some(exception) = &thread.current_exception {
            findings.push(Finding::new(
                Severity::Critical,
                "Application crash or unhandled exception",
                format!("{} reports an in-flight exception:\n{exception}", thread.managed_id),
                "Inspect the exception type and message, then walk this \
                 thread's captured stack to the faulting frame.",
            ));
        }
    }
}

/// Too many runnable threads, or an oversized GC thread pack.
pub(crate) fn cpu_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let cpus = snapshot.host_cpu_count.max(1);
    let running = snapshot.threads.iter().filter(|t| is_running(t)).count();
    if running > cpus * 4 {
        findings.push(Finding::new(
            Severity::Warning,
            "High CPU suspicion",
            format!("{running} runnable threads against {cpus} host CPUs"),
            "Far more runnable threads than CPUs points at spinning or \
             oversubscription; check the hottest stacks for busy loops.",
        ));
    }

    let gc_threads = snapshot.threads.iter().filter(|t| t.is_gc).count();
    if gc_threads > (cpus / 2).max(2) {
        findings.push(Finding::new(
            Severity::Warning,
            "GC threads elevated",
            format!("{gc_threads} GC threads on a {cpus}-CPU host"),
            "An oversized GC thread pack suggests heap pressure keeping the \
             collector busy; correlate with the memory findings.",
        ));
    }
}

/// A stuck finalizer stalls every finalizable object in the process.
pub(crate) fn finalizer_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let blocked: Vec<&ThreadSnapshot> = snapshot
        .threads
        .iter()
        .filter(|t| {
            t.is_finalizer
                && (contains_ci(&t.state, "Wait") || contains_ci(&t.state, "Block"))
        })
        .collect();
    if !blocked.is_empty() {
        let lines: Vec<String> = blocked
            .iter()
            .map(|t| format!("{} in state \"{}\"", t.managed_id, t.state))
            .collect();
        findings.push(Finding::new(
            Severity::Critical,
            "Finalizer thread may be blocked",
            lines.join("\n"),
            "A blocked finalizer leaks every finalizable object; look at the \
             finalizer's stack for the lock or I/O it is stuck on.",
        ));
    }

    const FINALIZE_FRAME_THRESHOLD: usize = 50;
    let finalize_frames = snapshot
        .threads
        .iter()
        .flat_map(|t| t.frames.iter())
        .filter(|f| contains_ci(f, "Finalize"))
        .count();
    if finalize_frames > FINALIZE_FRAME_THRESHOLD {
        findings.push(Finding::new(
            Severity::Warning,
            "Heavy finalization activity",
            format!("{finalize_frames} captured frames mention finalization"),
            "Heavy finalization means objects rely on finalizers instead of \
             deterministic disposal; implement and call Dispose.",
        ));
    }
}

/// Thread-pool starvation and gate congestion.
pub(crate) fn threadpool_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let cpus = snapshot.host_cpu_count.max(1);
    let running = snapshot.threads.iter().filter(|t| is_running(t)).count();
    let waiting = snapshot.threads.iter().filter(|t| is_waiting(t)).count();

    if running <= (cpus / 2).max(1) && waiting > running * 4 && waiting >= 8 {
        findings.push(Finding::new(
            Severity::Warning,
            "ThreadPool starvation or queue backlog",
            format!("{running} running threads vs {waiting} waiting threads"),
            "Almost everything is waiting while little runs: classic pool \
             starvation. Find the blocking calls on the waiting stacks and \
             make them asynchronous.",
        ));
    }

    const GATE_FRAME_THRESHOLD: usize = 5;
    let gate_frames = snapshot
        .threads
        .iter()
        .flat_map(|t| t.frames.iter().take(TOP_FRAMES))
        .filter(|f| contains_any_ci(f, THREADPOOL_GATE_MARKERS))
        .count();
    if gate_frames >= GATE_FRAME_THRESHOLD {
        findings.push(Finding::new(
            Severity::Warning,
            "ThreadPool gate congestion",
            format!(
                "{gate_frames} top-of-stack frames sit in thread-pool dispatch"
            ),
            "Many threads parked inside the pool's own dispatch path means \
             work items outpace the pool; reduce queued work or raise the \
             minimum thread count.",
        ));
    }
}

/// Classify what captured threads are waiting on.
pub(crate) fn wait_classification_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    let http = threads_matching(snapshot, HTTP_WAIT_MARKERS);
    if http.len() >= WAIT_PATTERN_THRESHOLD {
        findings.push(Finding::new(
            Severity::Info,
            "HTTP I/O waits observed",
            format!("{} threads show HTTP client frames", http.len()),
            "Several threads are inside outbound HTTP calls; check downstream \
             service latency and client timeout configuration.",
        ));
    }

    let sql = threads_matching(snapshot, SQL_WAIT_MARKERS);
    if sql.len() >= WAIT_PATTERN_THRESHOLD {
        findings.push(Finding::new(
            Severity::Info,
            "SQL I/O waits observed",
            format!("{} threads show SQL client frames", sql.len()),
            "Several threads are inside database calls; check query latency, \
             blocking, and connection pool saturation on the server.",
        ));
    }

    let sync_over_async = threads_matching(snapshot, SYNC_OVER_ASYNC_MARKERS);
    if sync_over_async.len() >= WAIT_PATTERN_THRESHOLD {
        let lines: Vec<String> = sync_over_async
            .iter()
            .map(|t| format!("{} waiting in a Task wait", t.managed_id))
            .collect();
        findings.push(Finding::new(
            Severity::Warning,
            "Sync-over-async / Task waits detected",
            lines.join("\n"),
            "Blocking on Task results eats pool threads and invites deadlocks; \
             await the calls instead of .Wait()/.Result/GetResult().",
        ));
    }
}

/// Shared parking spots that are not monitor waits.
pub(crate) fn non_monitor_blocking_signals(snapshot: &Snapshot, findings: &mut Vec<Finding>) {
    const HOTSPOT_THRESHOLD: usize = 5;
    const HOTSPOTS_SHOWN: usize = 3;

    let mut parked_at: HashMap<&str, usize> = HashMap::new();
    for thread in snapshot.threads.iter().filter(|t| is_parked(t)) {
        let Some(frame) = thread.frames.iter().find(|f| !f.trim().is_empty()) else {
            continue;
        };
        if contains_ci(frame, "Monitor") {
            continue;
        }
        *parked_at.entry(frame.as_str()).or_default() += 1;
    }

    let mut hotspots: Vec<(&str, usize)> =
        parked_at.into_iter().filter(|&(_, count)| count >= HOTSPOT_THRESHOLD).collect();
    hotspots.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    hotspots.truncate(HOTSPOTS_SHOWN);

    if !hotspots.is_empty() {
        let lines: Vec<String> = hotspots
            .iter()
            .map(|(frame, count)| format!("{count} threads parked at {frame}"))
            .collect();
        findings.push(Finding::new(
            Severity::Warning,
            "Non-monitor blocking hotspot",
            lines.join("\n"),
            "Many threads share the same non-monitor wait; whatever that call \
             gates (semaphore, event, I/O handle) is the bottleneck.",
        ));
    }
}
