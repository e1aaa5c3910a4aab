//! Heap object walk: type histogram and heap-string capture.
//!
//! One pass over every heap object feeds two consumers: per-type size/count
//! aggregation (surfaced as the top-N histogram) and the second stage of
//! string capture, which shares the dictionary (and the global hard cap)
//! with the stack-root stage. A heap value that deduplicates into an
//! existing aggregate never consumes heap-string budget; only net-new
//! entries do.

use std::collections::{BTreeSet, HashMap};

use crate::domain::ThreadId;
use crate::inspector::HeapView;
use crate::snapshot::model::{HeapTypeStat, StringSource};
use crate::snapshot::strings::{Observation, StringTally};

/// What one heap walk produced.
pub(crate) struct HeapWalkOutput {
    /// Top-N types by total size, descending.
    pub histogram: Vec<HeapTypeStat>,
    /// Distinct type names observed (histogram may be shorter).
    pub total_types: usize,
    pub total_objects: u64,
    /// Heap string sightings merged into existing aggregates.
    pub deduped: u32,
}

/// Walk the heap once, accumulating the histogram and capturing strings.
///
/// `histogram_count == 0` disables type aggregation; `string_budget == 0`
/// disables string capture (the caller has already reconciled the requested
/// heap-string limit against the shared hard cap). Per-object read failures
/// are silent skips.
pub(crate) fn walk_heap(
    heap: &dyn HeapView,
    histogram_count: usize,
    string_budget: usize,
    tally: &mut StringTally,
    stack_owners: &HashMap<u64, BTreeSet<ThreadId>>,
) -> HeapWalkOutput {
    let mut types: HashMap<String, (u64, u64)> = HashMap::new();
    let mut total_objects = 0u64;
    let mut deduped = 0u32;

    let starting_count = tally.len();
    let budget_ceiling = starting_count + string_budget;
    let probe = tally.probe_chars();

    for object in heap.objects() {
        total_objects += 1;

        if histogram_count > 0 {
            if let Some(name) = object.type_name() {
                if !name.is_empty() {
                    let entry = types.entry(name).or_insert((0, 0));
                    entry.0 += object.size();
                    entry.1 += 1;
                }
            }
        }

        // String capture, while budget remains. Dedups against aggregates
        // the stack phase already created do not consume budget: the stop
        // condition watches dictionary growth, not sightings.
        if string_budget > 0 && tally.len() < budget_ceiling {
            if !object.is_valid() || !object.is_string() {
                continue;
            }
            let Ok(raw) = object.read_string(probe) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let owners: Vec<ThreadId> = stack_owners
                .get(&object.address())
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            if tally.observe(&raw, StringSource::Heap, owners) == Observation::Merged {
                deduped += 1;
            }
        }
    }

    let total_types = types.len();
    let mut histogram: Vec<HeapTypeStat> = types
        .into_iter()
        .map(|(type_name, (total_size, instance_count))| HeapTypeStat {
            type_name,
            total_size,
            instance_count,
        })
        .collect();
    // Size descending; name ascending keeps equal-sized types deterministic.
    histogram.sort_by(|a, b| {
        b.total_size.cmp(&a.total_size).then_with(|| a.type_name.cmp(&b.type_name))
    });
    histogram.truncate(histogram_count);

    HeapWalkOutput { histogram, total_types, total_objects, deduped }
}

/// Fraction of `total_bytes` attributed to the histogram rows, in [0, 1].
///
/// Zero when the heap is empty: no bytes, no coverage.
#[must_use]
pub(crate) fn histogram_coverage(histogram: &[HeapTypeStat], total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    let shown: u64 = histogram.iter().map(|s| s.total_size).sum();
    (shown as f64 / total_bytes as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::replay::{HeapFixture, ObjectFixture};

    fn typed_object(address: u64, type_name: &str, size: u64) -> ObjectFixture {
        ObjectFixture {
            address,
            type_name: Some(type_name.to_string()),
            size,
            ..ObjectFixture::default()
        }
    }

    fn string_object(address: u64, value: &str) -> ObjectFixture {
        ObjectFixture {
            address,
            type_name: Some("System.String".to_string()),
            size: 24 + 2 * value.len() as u64,
            string_value: Some(value.to_string()),
            ..ObjectFixture::default()
        }
    }

    fn heap_with(objects: Vec<ObjectFixture>) -> HeapFixture {
        HeapFixture { objects, ..HeapFixture::default() }
    }

    #[test]
    fn test_histogram_sorted_and_truncated() {
        let heap = heap_with(vec![
            typed_object(0x10, "Buffer", 100),
            typed_object(0x20, "Buffer", 50),
            typed_object(0x30, "Session", 400),
            typed_object(0x40, "Widget", 10),
        ]);
        let mut tally = StringTally::new(64);
        let out = walk_heap(&heap.view(), 2, 0, &mut tally, &HashMap::new());

        assert_eq!(out.total_objects, 4);
        assert_eq!(out.total_types, 3);
        assert_eq!(out.histogram.len(), 2);
        assert_eq!(out.histogram[0].type_name, "Session");
        assert_eq!(out.histogram[1].type_name, "Buffer");
        assert_eq!(out.histogram[1].total_size, 150);
        assert_eq!(out.histogram[1].instance_count, 2);
    }

    #[test]
    fn test_histogram_skips_unnamed_objects() {
        let heap = heap_with(vec![
            typed_object(0x10, "Buffer", 100),
            ObjectFixture { address: 0x20, size: 64, ..ObjectFixture::default() },
            ObjectFixture {
                address: 0x30,
                type_name: Some(String::new()),
                size: 64,
                ..ObjectFixture::default()
            },
        ]);
        let mut tally = StringTally::new(64);
        let out = walk_heap(&heap.view(), 10, 0, &mut tally, &HashMap::new());

        assert_eq!(out.total_objects, 3);
        assert_eq!(out.total_types, 1);
    }

    #[test]
    fn test_string_budget_counts_only_new_entries() {
        // Budget of 2: the duplicate "alpha" merges without consuming
        // budget, so "beta" still lands; "gamma" finds the dictionary full.
        let heap = heap_with(vec![
            string_object(0x10, "alpha"),
            string_object(0x20, "alpha"),
            string_object(0x30, "beta"),
            string_object(0x40, "gamma"),
        ]);
        let mut tally = StringTally::new(64);
        let out = walk_heap(&heap.view(), 0, 2, &mut tally, &HashMap::new());

        assert_eq!(tally.len(), 2);
        assert_eq!(out.deduped, 1);
        let entries = tally.into_entries();
        assert_eq!(entries[0].text, "alpha");
        assert_eq!(entries[0].occurrences, 2);
        assert_eq!(entries[1].text, "beta");
    }

    #[test]
    fn test_heap_strings_pick_up_stack_owners() {
        use crate::domain::ThreadId;
        let heap = heap_with(vec![string_object(0x10, "pinned by a stack")]);
        let mut owners = HashMap::new();
        owners.insert(0x10u64, std::iter::once(ThreadId(4)).collect::<BTreeSet<_>>());

        let mut tally = StringTally::new(64);
        walk_heap(&heap.view(), 0, 10, &mut tally, &owners);

        let entries = tally.into_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].thread_ids.contains(&ThreadId(4)));
        assert_eq!(entries[0].source, StringSource::Heap);
    }

    #[test]
    fn test_torn_string_reads_are_skipped() {
        let heap = heap_with(vec![
            ObjectFixture { read_fails: true, ..string_object(0x10, "gone") },
            string_object(0x20, "still here"),
        ]);
        let mut tally = StringTally::new(64);
        walk_heap(&heap.view(), 0, 10, &mut tally, &HashMap::new());

        let entries = tally.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "still here");
    }

    #[test]
    fn test_coverage_empty_heap_is_zero() {
        assert_eq!(histogram_coverage(&[], 0), 0.0);
    }

    #[test]
    fn test_coverage_clamped() {
        let histogram = vec![HeapTypeStat {
            type_name: "A".to_string(),
            total_size: 150,
            instance_count: 1,
        }];
        assert_eq!(histogram_coverage(&histogram, 100), 1.0);
        assert!((histogram_coverage(&histogram, 300) - 0.5).abs() < f64::EPSILON);
    }
}
