//! Sorting and summary statistics behind the history, insights, and
//! leaderboard views.
//!
//! Two explicit O(n log n) sorts are provided because their properties are
//! part of the contract:
//!
//! - [`merge_sort_by`] is **stable**: equal elements keep their input order.
//!   The ledger's chronological view relies on this for identical timestamps.
//! - [`heap_sort_by`] is **in place** and index-based. It is not stable.
//!
//! Both order elements ascending under the comparator, like `slice::sort_by`;
//! pass a reversed comparator for descending output.

use std::cmp::Ordering;
use std::hash::Hash;

use rustc_hash::FxHashMap;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Stable out-of-place merge sort.
///
/// When `compare(left, right)` is `Less` or `Equal` the left element is taken
/// first, which is what keeps equal elements in their original order.
pub fn merge_sort_by<T, F>(items: &[T], mut compare: F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    merge_sort_inner(items, &mut compare)
}

fn merge_sort_inner<T, F>(items: &[T], compare: &mut F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items.to_vec();
    }

    let mid = items.len() / 2;
    let left = merge_sort_inner(&items[..mid], compare);
    let right = merge_sort_inner(&items[mid..], compare);

    let mut merged = Vec::with_capacity(items.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(&left[i], &right[j]) != Ordering::Greater {
            merged.push(left[i].clone());
            i += 1;
        } else {
            merged.push(right[j].clone());
            j += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

/// In-place heap sort.
///
/// Builds a max-heap under `compare`, then repeatedly swaps the root to the
/// end of the unsorted region. The result is ascending under `compare`.
pub fn heap_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let n = items.len();
    if n < 2 {
        return;
    }

    for root in (0..n / 2).rev() {
        sift_down(items, root, n, &mut compare);
    }

    for end in (1..n).rev() {
        items.swap(0, end);
        sift_down(items, 0, end, &mut compare);
    }
}

/// Restore the heap property for the subtree at `root`, considering only
/// `items[..len]`.
fn sift_down<T, F>(items: &mut [T], mut root: usize, len: usize, compare: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    loop {
        let left = 2 * root + 1;
        let right = left + 1;
        let mut largest = root;

        if left < len && compare(&items[left], &items[largest]) == Ordering::Greater {
            largest = left;
        }
        if right < len && compare(&items[right], &items[largest]) == Ordering::Greater {
            largest = right;
        }
        if largest == root {
            return;
        }
        items.swap(root, largest);
        root = largest;
    }
}

/// True if `items` is ascending under `compare`.
pub fn is_sorted_by<T, F>(items: &[T], mut compare: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    items
        .windows(2)
        .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
}

// ---------------------------------------------------------------------------
// Frequency counts
// ---------------------------------------------------------------------------

/// Occurrence count per key, in order of first appearance.
pub fn frequencies<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

/// Most frequent key. Ties go to the key that appeared first.
///
/// Returns `None` for an empty input.
pub fn mode<K, I>(keys: I) -> Option<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut best: Option<(K, usize)> = None;
    for (key, count) in frequencies(keys) {
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((key, count));
        }
    }
    best.map(|(k, _)| k)
}

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by `n`). `None` for an empty slice.
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation. Zero for an empty slice.
pub fn volatility(returns: &[f64]) -> f64 {
    variance(returns).map_or(0.0, f64::sqrt)
}

/// Simple period returns `(v[i] - v[i-1]) / v[i-1]`.
///
/// Periods starting from a zero value are skipped.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

// ---------------------------------------------------------------------------
// Concentration and win rate
// ---------------------------------------------------------------------------

/// Herfindahl concentration index: sum of squared shares.
///
/// `values` are non-negative sizes (e.g. per-symbol market values). The result
/// is 1.0 for a single position and `1/n` for `n` equal positions; 0.0 when
/// the total is zero.
pub fn herfindahl(values: &[f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values.iter().map(|v| (v / total).powi(2)).sum()
}

/// Fraction of trades that were profitable, in `[0, 1]`.
///
/// Zero when there are no trades.
pub fn win_rate<T>(trades: &[T], mut profitable: impl FnMut(&T) -> bool) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| profitable(t)).count();
    wins as f64 / trades.len() as f64
}
