//! Data-quality warnings.
//!
//! Every limit the builder enforces, and every partial read it survives, is
//! observable as a warning on the snapshot. Reporters surface them so nobody
//! mistakes a truncated view for the whole truth.

use serde::Serialize;

/// Warning classification.
///
/// Ordering of the report is governed by [`priority`](WarningCategory::priority),
/// an explicit table, not by the declaration order of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningCategory {
    /// The GC heap could not be walked at all.
    HeapUnavailable,
    /// More threads existed than the capture cap allowed.
    ThreadTruncation,
    /// Some threads' stacks failed to enumerate.
    StackReadPartial,
    /// Thread selection observed an anomaly (e.g. zero alive threads).
    ThreadSelection,
    /// A string capture option exceeded its hard cap.
    StringClamp,
    /// The heap string budget was smaller than requested.
    HeapStringClamp,
    /// Duplicate string values were merged.
    StringDedupe,
    /// The heap histogram was truncated.
    HeapHistogramClamp,
    /// More modules were loaded than the display cap.
    ModuleClamp,
    /// Anything else worth recording.
    Other,
}

impl WarningCategory {
    /// Report priority; lower sorts first.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            WarningCategory::HeapUnavailable => 0,
            WarningCategory::ThreadTruncation => 1,
            WarningCategory::StackReadPartial => 2,
            WarningCategory::ThreadSelection => 3,
            WarningCategory::StringClamp => 4,
            WarningCategory::HeapStringClamp => 5,
            WarningCategory::StringDedupe => 6,
            WarningCategory::HeapHistogramClamp => 7,
            WarningCategory::ModuleClamp => 8,
            WarningCategory::Other => 9,
        }
    }
}

/// One recorded data-quality event.
#[derive(Debug, Clone, Serialize)]
pub struct DataWarning {
    pub category: WarningCategory,
    pub message: String,
}

impl DataWarning {
    #[must_use]
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into() }
    }
}

/// Sort warnings by category priority, then message text. Stable.
pub fn sort_warnings(warnings: &mut [DataWarning]) {
    warnings.sort_by(|a, b| {
        a.category
            .priority()
            .cmp(&b.category.priority())
            .then_with(|| a.message.cmp(&b.message))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities_are_distinct() {
        let all = [
            WarningCategory::HeapUnavailable,
            WarningCategory::ThreadTruncation,
            WarningCategory::StackReadPartial,
            WarningCategory::ThreadSelection,
            WarningCategory::StringClamp,
            WarningCategory::HeapStringClamp,
            WarningCategory::StringDedupe,
            WarningCategory::HeapHistogramClamp,
            WarningCategory::ModuleClamp,
            WarningCategory::Other,
        ];
        let mut priorities: Vec<u8> = all.iter().map(|c| c.priority()).collect();
        priorities.sort_unstable();
        priorities.dedup();
        assert_eq!(priorities.len(), all.len());
    }

    #[test]
    fn test_sort_by_priority_then_message() {
        let mut warnings = vec![
            DataWarning::new(WarningCategory::ModuleClamp, "b"),
            DataWarning::new(WarningCategory::HeapUnavailable, "z"),
            DataWarning::new(WarningCategory::ModuleClamp, "a"),
            DataWarning::new(WarningCategory::StringDedupe, "m"),
        ];
        sort_warnings(&mut warnings);
        let rendered: Vec<(u8, &str)> =
            warnings.iter().map(|w| (w.category.priority(), w.message.as_str())).collect();
        assert_eq!(rendered, vec![(0, "z"), (6, "m"), (8, "a"), (8, "b")]);
    }
}
