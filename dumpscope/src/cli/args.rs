//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::snapshot::builder::{detect_host_cpus, BuildOptions};

const DEFAULT_MAX_STRING_LENGTH: usize = 65_536;
const DEFAULT_MAX_STACK_FRAMES: usize = 30;
const DEFAULT_TOP_STACK_THREADS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "dumpscope", about = "Offline triage for managed-runtime process dumps")]
pub struct Args {
    /// Path to the process dump to triage
    pub dump: Option<String>,

    /// Stack-root string aggregates to capture (0 disables)
    #[arg(short = 's', long = "strings", default_value_t = 100, allow_negative_numbers = true)]
    pub strings: i64,

    /// Characters kept per string before head+tail truncation
    #[arg(long, default_value_t = 65536, allow_negative_numbers = true)]
    pub max_string_length: i64,

    /// Additional heap-string aggregates to capture (0 disables)
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    pub heap_strings: i64,

    /// Heap types to surface in the histogram (0 disables the heap walk)
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub heap_histogram: i64,

    /// Stack frames captured per thread
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    pub max_stack_frames: i64,

    /// Threads shown with stacks (capture keeps at least 10)
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub top_stack_threads: i64,

    /// Write the full {snapshot, findings} report as pretty JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

impl Args {
    /// Translate CLI values into builder options.
    ///
    /// Negative counts clamp to 0 (disabled); non-positive values of the
    /// always-on limits fall back to their defaults.
    #[must_use]
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            max_strings_to_capture: clamp_count(self.strings),
            max_string_length: default_if_nonpositive(
                self.max_string_length,
                DEFAULT_MAX_STRING_LENGTH,
            ),
            heap_string_limit: clamp_count(self.heap_strings),
            heap_histogram_count: clamp_count(self.heap_histogram),
            max_stack_frames: default_if_nonpositive(
                self.max_stack_frames,
                DEFAULT_MAX_STACK_FRAMES,
            ),
            top_stack_threads: default_if_nonpositive(
                self.top_stack_threads,
                DEFAULT_TOP_STACK_THREADS,
            ),
            host_cpu_count: detect_host_cpus(),
        }
    }
}

fn clamp_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn default_if_nonpositive(value: i64, default: usize) -> usize {
    if value <= 0 {
        default
    } else {
        value as usize
    }
}
