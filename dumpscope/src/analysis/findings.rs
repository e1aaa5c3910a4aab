//! Finding model: what the reasoner hands to reporters.

use serde::Serialize;
use std::fmt;

/// How urgent a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{label}")
    }
}

/// One diagnostic conclusion with its supporting evidence.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub title: String,
    pub severity: Severity,
    /// Multiline free text quoting the numbers and names that triggered the rule.
    pub evidence: String,
    /// What to do about it.
    pub recommendation: String,
}

impl Finding {
    #[must_use]
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        evidence: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            severity,
            evidence: evidence.into(),
            recommendation: recommendation.into(),
        }
    }
}

/// Human-readable byte quantity, the way evidence text quotes sizes.
#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
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
