//! Parallel-map capability.
//!
//! Passes over individuals or variables go through these helpers. With
//! `parallel = false` they are plain iterator loops; with `parallel = true`
//! they run on the rayon pool. Results are returned in index order either way.

use rayon::prelude::*;

/// `f(0), f(1), ..., f(n - 1)`, collected in order.
pub fn map_indices<T, F>(parallel: bool, n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// `f(j, &mut items[j])` for every item, results collected in order.
pub fn map_mut<T, R, F>(parallel: bool, items: &mut [T], f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, &mut T) -> R + Sync + Send,
{
    if parallel {
        items
            .par_iter_mut()
            .enumerate()
            .map(|(j, item)| f(j, item))
            .collect()
    } else {
        items
            .iter_mut()
            .enumerate()
            .map(|(j, item)| f(j, item))
            .collect()
    }
}
