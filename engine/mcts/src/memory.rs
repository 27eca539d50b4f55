//! Memory governor: splits the configured ceiling between the evaluator,
//! its cache, and the search tree, and refuses settings that leave any of
//! them starved.

use thiserror::Error;

use crate::cache::{ENTRY_SIZE, MIN_CACHE_COUNT};

pub const MIB: usize = 1024 * 1024;

/// Ceiling applied when the user sets none.
pub const DEFAULT_MAX_MEMORY: usize = 2048 * MIB;

/// Floor for the search tree allocation.
pub const MIN_TREE_SPACE: usize = 10 * MIB;

/// Allocator and bookkeeping overhead on top of raw structure sizes.
pub fn add_overhead(bytes: usize) -> usize {
    bytes * 5 / 4
}

pub fn remove_overhead(bytes: usize) -> usize {
    bytes * 4 / 5
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Not enough memory for network. {required} MiB required.")]
    Network { required: usize },

    #[error("Not enough memory for cache.")]
    Cache,

    #[error("Not enough memory for search tree.")]
    Tree,
}

/// Validated memory split.
#[derive(Debug, Clone)]
pub struct MemoryLimits {
    pub max_memory: usize,
    pub cache_ratio_percent: usize,
    /// Tree ceiling in raw bytes (overhead already removed), compared
    /// against the live tree counter.
    pub max_tree_size: usize,
    /// Evaluator cache capacity in entries.
    pub cache_count: usize,
}

/// Compute the split for a requested ceiling, or explain why it cannot
/// work. `base_memory` is the resident evaluator footprint.
pub fn set_max_memory(
    max_memory: usize,
    cache_ratio_percent: usize,
    base_memory: usize,
) -> Result<(MemoryLimits, String), MemoryError> {
    let max_memory = if max_memory == 0 {
        DEFAULT_MAX_MEMORY
    } else {
        max_memory
    };
    debug_assert!((1..=99).contains(&cache_ratio_percent));

    if max_memory < base_memory {
        return Err(MemoryError::Network {
            required: base_memory.div_ceil(MIB),
        });
    }

    let max_memory_for_search = max_memory - base_memory;
    let max_cache_size = max_memory_for_search * cache_ratio_percent / 100;
    let cache_count = remove_overhead(max_cache_size) / ENTRY_SIZE;
    if cache_count < MIN_CACHE_COUNT {
        return Err(MemoryError::Cache);
    }

    let max_tree_size = max_memory_for_search - max_cache_size;
    if max_tree_size < MIN_TREE_SPACE {
        return Err(MemoryError::Tree);
    }

    let limits = MemoryLimits {
        max_memory,
        cache_ratio_percent,
        max_tree_size: remove_overhead(max_tree_size),
        cache_count,
    };
    let message = format!(
        "Setting max tree size to {} MiB and cache size to {} MiB.",
        max_tree_size / MIB,
        max_cache_size / MIB
    );
    Ok((limits, message))
}

/// Three-way breakdown for `lz-memory_report`.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReport {
    pub base: usize,
    pub tree: usize,
    pub cache: usize,
}

impl MemoryReport {
    pub fn new(base_memory: usize, tree_bytes: usize, cache_bytes: usize) -> Self {
        Self {
            base: base_memory,
            tree: add_overhead(tree_bytes),
            cache: add_overhead(cache_bytes),
        }
    }

    pub fn total(&self) -> usize {
        self.base + self.tree + self.cache
    }
}
