//! Sparse ordering
//!
//! Tabs and groups are sorted by a float key. New items are appended one
//! step past the end; insertions between two items take the midpoint, so a
//! move never rewrites the keys of its neighbours. When midpoints get too
//! close the sequence is renumbered.

pub const ORDER_STEP: f64 = 500.0;

/// Gaps smaller than this are treated as collapsed.
pub const MIN_ORDER_GAP: f64 = 1e-6;

pub fn midpoint(prev: f64, next: f64) -> f64 {
    (prev + next) / 2.0
}

/// Key for an item placed at `index` among `sorted` (the keys of the other
/// items, ascending). Indices past the end append.
pub fn order_at(sorted: &[f64], index: usize) -> f64 {
    let index = index.min(sorted.len());
    let prev = index.checked_sub(1).map(|i| sorted[i]);
    let next = sorted.get(index).copied();

    match (prev, next) {
        (None, None) => 0.0,
        (None, Some(next)) => next - ORDER_STEP,
        (Some(prev), None) => prev + ORDER_STEP,
        (Some(prev), Some(next)) => midpoint(prev, next),
    }
}

/// Returns true if `order` no longer sorts strictly between its neighbours.
pub fn is_collapsed(prev: Option<f64>, order: f64, next: Option<f64>) -> bool {
    prev.is_some_and(|p| order - p < MIN_ORDER_GAP)
        || next.is_some_and(|n| n - order < MIN_ORDER_GAP)
}

/// Evenly spaced keys for `len` items
pub fn renumbered(len: usize) -> impl Iterator<Item = f64> {
    (0..len).map(|i| i as f64 * ORDER_STEP)
}
