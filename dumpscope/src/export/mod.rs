//! Report export.
//!
//! Currently one format: the pretty-printed JSON report consumed by
//! dashboards and diffing scripts.

pub mod json_report;

pub use json_report::{write_report, TriageReport};
