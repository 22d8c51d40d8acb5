//! Parallel map over plain slices.
//!
//! Splits the input across the [`ComputeTaskPool`], falling back to
//! sequential mapping for small inputs where task overhead would dominate.
//! Used for the depth-bucket multiplications of the inner transform layer,
//! which cannot go through a query's own parallel iterator.

use bevy_tasks::{ComputeTaskPool, TaskPool};

use crate::config::PropagationConfig;

/// Maps `items` through `f`, preserving order.
///
/// Runs sequentially when `items` is shorter than
/// [`PropagationConfig::parallel_threshold`] or when the pool has a single
/// thread.
pub(crate) fn par_map<T, R, F>(items: &[T], config: &PropagationConfig, f: F) -> Vec<R>
where
    T: Sync,
    R: Send + 'static,
    F: Fn(&T) -> R + Sync,
{
    let count = items.len();
    if count < config.parallel_threshold {
        return items.iter().map(&f).collect();
    }

    let pool = ComputeTaskPool::get_or_init(TaskPool::default);
    let threads = pool.thread_num();
    if threads <= 1 {
        return items.iter().map(&f).collect();
    }

    let batch_size = config.batch_size(count, threads);
    let f = &f;
    // Scope results come back in spawn order.
    let chunks = pool.scope(|scope| {
        for chunk in items.chunks(batch_size) {
            scope.spawn(async move { chunk.iter().map(f).collect::<Vec<R>>() });
        }
    });

    let mut results = Vec::with_capacity(count);
    for chunk in chunks {
        results.extend(chunk);
    }
    results
}
