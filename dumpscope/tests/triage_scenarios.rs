//! End-to-end triage scenarios: replay capture on disk → snapshot → findings.

mod common;

use common::{capture_file, running_thread, segments_mib, single_runtime, waiting_thread};
use dumpscope::analysis::{analyze, Finding, Severity};
use dumpscope::inspector::replay::{
    DumpFixture, ExceptionFixture, HeapFixture, ModuleFixture, ObjectFixture, ReplayReader,
    SyncBlockFixture, ThreadFixture,
};
use dumpscope::snapshot::{build, BuildOptions, Snapshot, WarningCategory};

fn triage(fixture: &DumpFixture, options: &BuildOptions) -> (Snapshot, Vec<Finding>) {
    let path = capture_file(fixture);
    let snapshot = build(&ReplayReader, path.to_str().unwrap(), options).unwrap();
    let findings = analyze(&snapshot);
    std::fs::remove_file(&path).ok();
    (snapshot, findings)
}

fn find<'a>(findings: &'a [Finding], title_fragment: &str) -> Option<&'a Finding> {
    findings.iter().find(|f| f.title.to_ascii_lowercase().contains(&title_fragment.to_ascii_lowercase()))
}

#[test]
fn crash_detection() {
    let mut crashed = running_thread(1);
    crashed.exception = Some(ExceptionFixture {
        type_name: "System.NullReferenceException".to_string(),
        message: "boom".to_string(),
    });
    let mut runtime = single_runtime(vec![crashed, running_thread(2)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(60, 20, 20, 0, 0),
        ..HeapFixture::default()
    });

    let (_, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    let crash = find(&findings, "crash").expect("crash finding");
    assert_eq!(crash.severity, Severity::Critical);
    assert!(crash.evidence.contains("Thread 1"));
    assert!(crash.evidence.contains("NullReferenceException"));
}

#[test]
fn high_memory_pressure() {
    let mut runtime = single_runtime(vec![running_thread(1)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(1024, 1024, 1024, 64, 0),
        ..HeapFixture::default()
    });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    assert!(snapshot.gc.total_heap_bytes > 2 * 1024 * 1024 * 1024);
    let pressure = find(&findings, "memory").expect("memory finding");
    assert_eq!(pressure.severity, Severity::Critical);
}

#[test]
fn synchronization_contention() {
    let mut holder = running_thread(1);
    holder.lock_count = 6;
    holder.address = 0x7000;
    let mut runtime = single_runtime(vec![holder]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(40, 30, 30, 0, 0),
        sync_blocks: (0..6)
            .map(|i| SyncBlockFixture {
                waiting_thread_count: 2,
                is_monitor_held: true,
                holding_thread_address: Some(0x7000),
                object_address: 0x9000 + i * 0x20,
            })
            .collect(),
        ..HeapFixture::default()
    });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    assert_eq!(snapshot.blocking.sync_block_count, 6);
    assert_eq!(snapshot.blocking.waiting_thread_count, 12);

    // waiting > 5 makes this critical even though block count is modest
    let contention = find(&findings, "Synchronization contention").expect("contention");
    assert_eq!(contention.severity, Severity::Critical);

    // The held monitors resolve to the holder thread
    let deadlock = find(&findings, "deadlock").expect("deadlock candidates");
    assert!(deadlock.evidence.contains("Thread 1"));
}

#[test]
fn sync_over_async_waits() {
    let frames = [
        "System.Threading.Tasks.Task.Wait()",
        "System.Threading.Tasks.Task`1.GetResult()",
        "MyApp.Api.Fetch() via GetAwaiter().GetResult",
    ];
    let threads: Vec<ThreadFixture> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| ThreadFixture {
            frames: vec![(*frame).to_string()],
            ..waiting_thread(i as u32 + 1)
        })
        .collect();
    let mut runtime = single_runtime(threads);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(50, 30, 20, 0, 0),
        ..HeapFixture::default()
    });

    let (_, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    let waits = find(&findings, "Sync-over-async").expect("sync-over-async");
    assert_eq!(waits.severity, Severity::Warning);
}

#[test]
fn high_duplicate_strings() {
    let sql = "SELECT * FROM orders WHERE status = 'pending'";
    let mut runtime = single_runtime(vec![running_thread(1)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(50, 30, 20, 0, 0),
        objects: (0..40)
            .map(|i| ObjectFixture {
                address: 0x2000 + i * 0x40,
                type_name: Some("System.String".to_string()),
                size: 24 + 2 * sql.len() as u64,
                string_value: Some(sql.to_string()),
                ..ObjectFixture::default()
            })
            .collect(),
        ..HeapFixture::default()
    });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    assert_eq!(snapshot.unique_string_count, 1);
    assert_eq!(snapshot.total_string_occurrences, 40);
    assert_eq!(snapshot.strings[0].occurrences, 40);

    let dup = find(&findings, "duplicate string").expect("duplicate strings");
    assert_eq!(dup.severity, Severity::Warning);
}

#[test]
fn clean_dump_gets_single_all_clear() {
    let mut runtime = single_runtime(vec![running_thread(1)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(60, 20, 20, 0, 0),
        ..HeapFixture::default()
    });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    assert!(snapshot.warnings.is_empty(), "warnings: {:?}", snapshot.warnings);
    assert_eq!(findings.len(), 1, "findings: {:?}", findings);
    assert_eq!(findings[0].severity, Severity::Info);
    assert_eq!(findings[0].title, "No critical signals detected");
}

// ── beyond the canned scenarios ─────────────────────────────────────────

#[test]
fn torn_stacks_become_warnings_not_errors() {
    let mut torn = running_thread(1);
    torn.frames_fail = true;
    let mut runtime = single_runtime(vec![torn, running_thread(2)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(60, 20, 20, 0, 0),
        ..HeapFixture::default()
    });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    let warning = snapshot
        .warnings
        .iter()
        .find(|w| w.category == WarningCategory::StackReadPartial)
        .expect("partial stack warning");
    assert!(warning.message.contains('1'));

    // The warning surfaces as a data-availability finding.
    let availability = find(&findings, "Data availability").expect("availability");
    assert!(availability.evidence.contains("Stack frames unavailable"));
}

#[test]
fn unwalkable_heap_still_triages() {
    let mut crashed = running_thread(1);
    crashed.exception = Some(ExceptionFixture {
        type_name: "System.OutOfMemoryException".to_string(),
        message: String::new(),
    });
    let mut runtime = single_runtime(vec![crashed]);
    runtime.heap = Some(HeapFixture { can_walk: false, ..HeapFixture::default() });

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    assert!(snapshot
        .warnings
        .iter()
        .any(|w| w.category == WarningCategory::HeapUnavailable));
    // The crash is still found even with no heap data.
    assert!(find(&findings, "crash").is_some());
}

#[test]
fn thread_truncation_names_dropped_states() {
    let threads: Vec<ThreadFixture> =
        (1..=40).map(|id| if id % 2 == 0 { running_thread(id) } else { waiting_thread(id) }).collect();
    let mut runtime = single_runtime(threads);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(60, 20, 20, 0, 0),
        ..HeapFixture::default()
    });

    let (snapshot, _) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions { top_stack_threads: 5, ..BuildOptions::default() },
    );

    assert_eq!(snapshot.total_thread_count, 40);
    assert_eq!(snapshot.threads.len(), 10); // max(top_stack_threads, 10)
    let truncation = snapshot
        .warnings
        .iter()
        .find(|w| w.category == WarningCategory::ThreadTruncation)
        .expect("truncation warning");
    assert!(truncation.message.contains("dropped 30"));
    // State histogram is alphabetical: Running before WaitSleepJoin.
    let running_pos = truncation.message.find("Running=").unwrap();
    let waiting_pos = truncation.message.find("WaitSleepJoin=").unwrap();
    assert!(running_pos < waiting_pos);
}

#[test]
fn stack_strings_join_heap_owners() {
    let secret = "Server=db01;Database=orders;User Id=app";
    let mut worker = waiting_thread(7);
    worker.stack_roots = vec![0x5000];
    let mut runtime = single_runtime(vec![worker]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(50, 30, 20, 0, 0),
        objects: vec![ObjectFixture {
            address: 0x5000,
            type_name: Some("System.String".to_string()),
            size: 24 + 2 * secret.len() as u64,
            string_value: Some(secret.to_string()),
            ..ObjectFixture::default()
        }],
        ..HeapFixture::default()
    });

    let (snapshot, _) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    // Seen from the stack root AND from the heap walk: one aggregate,
    // merged source, owner recorded.
    assert_eq!(snapshot.unique_string_count, 1);
    let entry = &snapshot.strings[0];
    assert_eq!(entry.occurrences, 2);
    assert_eq!(snapshot.stack_string_occurrences, 1);
    assert_eq!(snapshot.heap_string_occurrences, 1);
    assert!(entry.thread_ids.iter().any(|id| id.0 == 7));
}

#[test]
fn json_report_carries_snapshot_and_findings() {
    let mut runtime = single_runtime(vec![running_thread(1)]);
    runtime.heap = Some(HeapFixture {
        segments: segments_mib(60, 20, 20, 0, 0),
        ..HeapFixture::default()
    });
    runtime.modules = vec![
        ModuleFixture { name: "System.Runtime.dll".to_string(), size: 2_000_000 },
        ModuleFixture { name: "MyApp.dll".to_string(), size: 500_000 },
    ];

    let (snapshot, findings) = triage(
        &DumpFixture::with_runtime(runtime),
        &BuildOptions::default(),
    );

    let mut buffer = Vec::new();
    dumpscope::export::write_report(&mut buffer, &snapshot, &findings).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(parsed["snapshot"]["total_thread_count"], 1);
    assert_eq!(parsed["snapshot"]["total_module_count"], 2);
    assert_eq!(parsed["snapshot"]["modules"][0]["name"], "System.Runtime.dll");
    assert!(parsed["findings"].as_array().is_some());
}
