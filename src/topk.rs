//! Top-K selection over scores
//!
//! Min-heap selection keeps the K best candidates seen so far: O(N log K)
//! instead of a full O(N log N) sort. Ties are broken by index (lower index
//! ranks first) so results are deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

// Greater means "ranks earlier"
#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Indices of the `k` largest values, largest first. NaN values are skipped.
///
/// # Examples
///
/// ```rust
/// use vital_forest::topk::select_top_k;
///
/// let scores = [0.5, 0.9, 0.3, 0.9];
/// assert_eq!(select_top_k(&scores, 3), vec![1, 3, 0]);
/// ```
#[must_use]
pub fn select_top_k(values: &[f64], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k.min(values.len()));
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        let candidate = Candidate { value, index };
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if candidate > *worst {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    // Ascending order of Reverse<_> is best-first
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(c)| c.index)
        .collect()
}
