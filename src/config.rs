//! Tuning knobs for transform propagation.

use bevy_ecs::prelude::Resource;

/// Configuration for the transform systems.
///
/// Use [`Default::default()`] for sensible defaults. The pipeline inserts it
/// when missing; hosts may overwrite the resource between cycles.
#[derive(Resource, Debug, Clone)]
pub struct PropagationConfig {
    /// Depth buckets smaller than this are multiplied on the calling thread.
    /// Default: 128.
    pub parallel_threshold: usize,
    /// Minimum number of entities per parallel chunk. Prevents task overhead
    /// from dominating for small buckets. Default: 64.
    pub min_batch_size: usize,
    /// Longest ancestor chain the depth walk follows before it reports a
    /// cycle. Default: 1024.
    pub max_depth: u32,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 128,
            min_batch_size: 64,
            max_depth: 1024,
        }
    }
}

impl PropagationConfig {
    /// Chunk size for splitting `count` items across `threads` workers.
    pub(crate) fn batch_size(&self, count: usize, threads: usize) -> usize {
        (count / (threads.max(1) * 4))
            .max(self.min_batch_size)
            .max(1)
    }
}
