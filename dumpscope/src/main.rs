//! # Dumpscope - Main Entry Point
//!
//! Thin wrapper around the triage core:
//!
//! 1. Parse and clamp CLI arguments
//! 2. Build the snapshot from the dump (replay backend)
//! 3. Run the reasoner
//! 4. Print the console report; optionally write the JSON report
//!
//! Exit code is 0 on success (and for `--help`), non-zero on any triage
//! error. The four core error kinds each get a tailored hint before the
//! error propagates.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;

use dumpscope::analysis::{analyze, Finding, Severity};
use dumpscope::cli::Args;
use dumpscope::domain::TriageError;
use dumpscope::export::write_report;
use dumpscope::inspector::replay::ReplayReader;
use dumpscope::snapshot::model::Snapshot;
use dumpscope::snapshot::{build, BuildOptions};

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let options = args.build_options();
    let dump_path = args.dump.clone().unwrap_or_default();

    println!("🔍 dumpscope v{}", env!("CARGO_PKG_VERSION"));

    let snapshot = match build(&ReplayReader, &dump_path, &options) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            print_error_hint(&err);
            return Err(err.into());
        }
    };
    info!(
        "Snapshot built: {} threads captured, {} strings, {} warnings",
        snapshot.threads.len(),
        snapshot.strings.len(),
        snapshot.warnings.len()
    );

    let findings = analyze(&snapshot);
    print_report(&snapshot, &findings, &options);

    if let Some(json_path) = &args.json {
        let file = File::create(json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        write_report(BufWriter::new(file), &snapshot, &findings)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        println!("\n💾 Report written to {}", json_path.display());
    }

    Ok(())
}

fn print_error_hint(err: &TriageError) {
    match err {
        TriageError::MissingPath => {
            eprintln!(
                "No dump path given.\n\n\
                 Usage:\n  dumpscope <DUMP> [--json report.json]\n  dumpscope --help"
            );
        }
        TriageError::FileNotFound(path) => {
            eprintln!(
                "Dump file {} does not exist. Check the path and try again.",
                path.display()
            );
        }
        TriageError::NoManagedRuntime => {
            eprintln!(
                "The dump contains no managed runtime. Native-only processes \
                 are out of scope for this tool."
            );
        }
        TriageError::Cancelled => {
            eprintln!("Analysis was cancelled before completion.");
        }
        TriageError::Internal(_) => {
            eprintln!("The dump reader failed; the dump may be truncated or corrupt.");
        }
    }
}

fn print_report(snapshot: &Snapshot, findings: &[Finding], options: &BuildOptions) {
    println!("   Dump: {}", snapshot.dump_path);
    println!("   Runtime: {}\n", snapshot.runtime_description);

    println!("SNAPSHOT");
    println!(
        "  Threads: {} alive, {} captured",
        snapshot.total_thread_count,
        snapshot.threads.len()
    );
    println!(
        "  Heap: {} across {} segments ({} GC)",
        format_bytes(snapshot.gc.total_heap_bytes),
        snapshot.gc.segment_count,
        if snapshot.gc.is_server_gc { "server" } else { "workstation" }
    );
    println!(
        "  Sync blocks: {} ({} threads waiting)",
        snapshot.blocking.sync_block_count, snapshot.blocking.waiting_thread_count
    );
    println!(
        "  Strings: {} unique / {} occurrences",
        snapshot.unique_string_count, snapshot.total_string_occurrences
    );
    println!(
        "  Heap types: {} shown of {} ({:.0}% of heap bytes)",
        snapshot.heap_histogram.len(),
        snapshot.total_heap_type_count,
        snapshot.heap_histogram_coverage * 100.0
    );
    println!(
        "  Modules: {} ({})",
        snapshot.total_module_count,
        format_bytes(snapshot.total_module_bytes)
    );

    if !snapshot.warnings.is_empty() {
        println!("\nDATA WARNINGS");
        for warning in &snapshot.warnings {
            println!("  ⚠ {}", warning.message);
        }
    }

    println!("\nFINDINGS ({})", findings.len());
    for finding in findings {
        let marker = match finding.severity {
            Severity::Critical => "🟥",
            Severity::Warning => "🟨",
            Severity::Info => "🟦",
        };
        println!("\n{marker} [{}] {}", finding.severity, finding.title);
        for line in finding.evidence.lines() {
            println!("      {line}");
        }
        println!("      → {}", finding.recommendation);
    }

    let shown = snapshot.threads.len().min(options.top_stack_threads);
    if shown < snapshot.threads.len() {
        println!(
            "\n({} threads captured; showing stacks for the top {}; see the \
             JSON report for the rest)",
            snapshot.threads.len(),
            shown
        );
    }
    for thread in snapshot.threads.iter().take(options.top_stack_threads) {
        println!(
            "\nSTACK {} [{}]{}",
            thread.managed_id,
            thread.state,
            thread
                .current_exception
                .as_deref()
                .map(|e| format!(" :: {e}"))
                .unwrap_or_default()
        );
        if thread.frames.is_empty() {
            println!("  <no frames captured>");
        }
        for frame in &thread.frames {
            println!("  at {frame}");
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
