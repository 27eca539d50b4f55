//! Content-addressed evaluator result cache.
//!
//! Keyed by position hash, bounded, evicting oldest-inserted first. The
//! memory governor owns the capacity; `resize` is only called between
//! searches.

use std::collections::VecDeque;

use games_go::NUM_INTERSECTIONS;
use rustc_hash::FxHashMap;

use crate::evaluator::NetOutput;

/// Smallest cache the governor will accept.
pub const MIN_CACHE_COUNT: usize = 6_000;

/// Approximate bytes per cached entry: the policy vector dominates, plus
/// map and deque bookkeeping.
pub const ENTRY_SIZE: usize = std::mem::size_of::<NetOutput>()
    + NUM_INTERSECTIONS * std::mem::size_of::<f32>()
    + 3 * std::mem::size_of::<u64>();

pub struct EvalCache {
    capacity: usize,
    map: FxHashMap<u64, NetOutput>,
    order: VecDeque<u64>,
    hits: u64,
    lookups: u64,
}

impl EvalCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: FxHashMap::default(),
            order: VecDeque::new(),
            hits: 0,
            lookups: 0,
        }
    }

    pub fn lookup(&mut self, hash: u64) -> Option<NetOutput> {
        self.lookups += 1;
        let hit = self.map.get(&hash).cloned();
        if hit.is_some() {
            self.hits += 1;
        }
        hit
    }

    pub fn insert(&mut self, hash: u64, output: NetOutput) {
        if self.map.contains_key(&hash) {
            return;
        }
        while self.map.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
        self.map.insert(hash, output);
        self.order.push_back(hash);
    }

    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Current footprint estimate in bytes.
    pub fn estimated_size(&self) -> usize {
        self.map.len() * ENTRY_SIZE
    }
}
