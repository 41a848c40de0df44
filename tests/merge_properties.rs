//! Property tests for the merge-join and header diff

use proptest::prelude::*;
use s3_tree_compare::compare::{merge_join, HeaderDiff, IgnoredHeaders, MergeStep};
use std::collections::{BTreeMap, BTreeSet};

/// Sorted, de-duplicated suffix lists
fn suffix_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-c/._-]{1,4}", 0..40).prop_map(|set| set.into_iter().collect())
}

fn header_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(
        prop::sample::select(vec![
            "content-length",
            "content-type",
            "etag",
            "cache-control",
            "x-amz-meta-owner",
        ])
        .prop_map(String::from),
        "[a-z0-9]{1,3}",
        0..5,
    )
}

proptest! {
    /// Every entry is yielded exactly once, as matched or one-sided
    #[test]
    fn prop_merge_covers_symmetric_difference(a in suffix_list(), b in suffix_list()) {
        let set_a: BTreeSet<&String> = a.iter().collect();
        let set_b: BTreeSet<&String> = b.iter().collect();

        let mut both = Vec::new();
        let mut only_first = Vec::new();
        let mut only_second = Vec::new();
        for step in merge_join(&a, &b) {
            match step {
                MergeStep::Both(s) => both.push(s),
                MergeStep::OnlyFirst(s) => only_first.push(s),
                MergeStep::OnlySecond(s) => only_second.push(s),
            }
        }

        let expected_both: Vec<&String> = set_a.intersection(&set_b).copied().collect();
        let expected_first: Vec<&String> = set_a.difference(&set_b).copied().collect();
        let expected_second: Vec<&String> = set_b.difference(&set_a).copied().collect();

        prop_assert_eq!(both, expected_both);
        prop_assert_eq!(only_first, expected_first);
        prop_assert_eq!(only_second, expected_second);
    }

    /// Steps come out in ascending order
    #[test]
    fn prop_merge_is_ordered(a in suffix_list(), b in suffix_list()) {
        let names: Vec<&String> = merge_join(&a, &b)
            .map(|step| match step {
                MergeStep::Both(s) | MergeStep::OnlyFirst(s) | MergeStep::OnlySecond(s) => s,
            })
            .collect();

        prop_assert!(names.windows(2).all(|w| w[0] < w[1]));
    }

    /// A header lands in exactly one of the common and differing maps
    #[test]
    fn prop_header_diff_partitions(a in header_map(), b in header_map()) {
        let diff = HeaderDiff::compute(&a, &b);

        let all: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
        prop_assert_eq!(diff.common.len() + diff.differing.len(), all.len());
        for name in all {
            prop_assert!(diff.common.contains_key(name) != diff.differing.contains_key(name));
        }
        for [value1, value2] in diff.differing.values() {
            prop_assert!(value1 != value2);
        }
    }

    /// Identical headers are never significant, and ignoring every header
    /// silences any difference
    #[test]
    fn prop_header_diff_significance(a in header_map(), b in header_map()) {
        prop_assert!(!HeaderDiff::compute(&a, &a).is_significant(&IgnoredHeaders::new()));

        let diff = HeaderDiff::compute(&a, &b);
        let everything: IgnoredHeaders = a.keys().chain(b.keys()).collect();
        prop_assert!(!diff.is_significant(&everything));
        prop_assert_eq!(diff.is_significant(&IgnoredHeaders::new()), a != b);
    }
}
