//! Structured error types for dumpscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Only failures that make the whole analysis impossible surface here.
//! Per-item inspector failures (a stack that will not enumerate, a string
//! that will not read) are recovered inside the builder and turned into
//! data-quality warnings or silent skips; the snapshot is always produced
//! from whatever the dump still yields.

use std::path::PathBuf;
use thiserror::Error;

/// Errors at the triage-core boundary.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("No dump path was provided")]
    MissingPath,

    #[error("Dump file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No managed runtime found in the dump")]
    NoManagedRuntime,

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Inspector failure: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors while writing the JSON report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
