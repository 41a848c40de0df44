//! Two-pointer merge-join of sorted sibling listings
//!
//! Both inputs must be sorted ascending. Each entry of either input is
//! yielded exactly once, in ascending order: as [`MergeStep::Both`] when the
//! two sides agree, otherwise as a one-sided step.

use std::cmp::Ordering;

/// One step of a merge-join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep<'a, T> {
    /// Present on both sides
    Both(&'a T),
    /// Present only on the first side
    OnlyFirst(&'a T),
    /// Present only on the second side
    OnlySecond(&'a T),
}

/// Iterator over the merge-join of two sorted slices
#[derive(Debug, Clone)]
pub struct MergeJoin<'a, T> {
    first: &'a [T],
    second: &'a [T],
    i: usize,
    j: usize,
}

impl<'a, T: Ord> MergeJoin<'a, T> {
    pub fn new(first: &'a [T], second: &'a [T]) -> Self {
        debug_assert!(first.windows(2).all(|w| w[0] <= w[1]), "first side not sorted");
        debug_assert!(second.windows(2).all(|w| w[0] <= w[1]), "second side not sorted");
        Self {
            first,
            second,
            i: 0,
            j: 0,
        }
    }
}

impl<'a, T: Ord> Iterator for MergeJoin<'a, T> {
    type Item = MergeStep<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match (self.first.get(self.i), self.second.get(self.j)) {
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Equal => {
                    self.i += 1;
                    self.j += 1;
                    MergeStep::Both(a)
                }
                Ordering::Less => {
                    self.i += 1;
                    MergeStep::OnlyFirst(a)
                }
                Ordering::Greater => {
                    self.j += 1;
                    MergeStep::OnlySecond(b)
                }
            },
            (Some(a), None) => {
                self.i += 1;
                MergeStep::OnlyFirst(a)
            }
            (None, Some(b)) => {
                self.j += 1;
                MergeStep::OnlySecond(b)
            }
            (None, None) => return None,
        };
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left_first = self.first.len() - self.i;
        let left_second = self.second.len() - self.j;
        (
            left_first.max(left_second),
            Some(left_first + left_second),
        )
    }
}

/// Merge-join two sorted slices
pub fn merge_join<'a, T: Ord>(first: &'a [T], second: &'a [T]) -> MergeJoin<'a, T> {
    MergeJoin::new(first, second)
}
