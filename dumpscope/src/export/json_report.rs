//! JSON report: `{snapshot, findings}`, pretty-printed.
//!
//! The report is the serde view of the model: every snapshot field lands in
//! the output verbatim, so downstream tooling never needs a second schema.

use serde::Serialize;
use std::io::Write;

use crate::analysis::Finding;
use crate::domain::ReportError;
use crate::snapshot::model::Snapshot;

/// The report container.
#[derive(Debug, Serialize)]
pub struct TriageReport<'a> {
    pub snapshot: &'a Snapshot,
    pub findings: &'a [Finding],
}

/// Write the pretty-printed report to `writer`.
pub fn write_report<W: Write>(
    mut writer: W,
    snapshot: &Snapshot,
    findings: &[Finding],
) -> Result<(), ReportError> {
    let report = TriageReport { snapshot, findings };
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    Ok(())
}
