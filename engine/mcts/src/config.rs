//! Search configuration parameters.

use crate::memory::DEFAULT_MAX_MEMORY;

/// Sentinel for "no visit/playout limit".
pub const UNLIMITED: u32 = u32::MAX;

/// Immutable bundle of every search tunable. Built once by the front-end
/// and handed to the controller; there are no process-wide knobs.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Worker threads per search. 0 auto-detects from the CPU count.
    pub threads: usize,

    /// Root visit budget; [`UNLIMITED`] disables.
    pub max_visits: u32,

    /// Completed-playout budget; [`UNLIMITED`] disables.
    pub max_playouts: u32,

    /// PUCT exploration constant.
    pub c_puct: f32,

    /// First-play-urgency reduction for interior nodes.
    pub fpu_reduction: f32,

    /// First-play-urgency reduction at the root.
    pub fpu_root_reduction: f32,

    /// Mix Dirichlet noise into root priors (self-play exploration).
    pub noise: bool,

    /// Noise mixing weight.
    pub dirichlet_epsilon: f32,

    /// Dirichlet concentration.
    pub dirichlet_alpha: f32,

    /// Opening moves sampled proportionally to visit counts.
    pub random_moves: u32,

    /// Minimum visits for a move to be sampled in the random window.
    pub random_min_visits: u32,

    /// Temperature for proportional sampling.
    pub random_temp: f32,

    /// Resign when the best winrate falls below this percentage; -1
    /// disables resignation entirely.
    pub resign_percent: i32,

    /// Tree memory ceiling in bytes, set by the memory governor.
    pub max_tree_size: usize,

    /// RNG seed; searches with the same seed and one thread replay
    /// identically.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_visits: UNLIMITED,
            max_playouts: UNLIMITED,
            c_puct: 0.8,
            fpu_reduction: 0.25,
            fpu_root_reduction: 0.25,
            noise: false,
            dirichlet_epsilon: 0.25,
            dirichlet_alpha: 0.03,
            random_moves: 0,
            random_min_visits: 1,
            random_temp: 1.0,
            resign_percent: -1,
            max_tree_size: DEFAULT_MAX_MEMORY,
            seed: 0,
        }
    }
}

impl SearchConfig {
    /// Worker count with auto-detection resolved.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Config for self-play: root noise on, opening randomization.
    pub fn for_selfplay() -> Self {
        Self {
            noise: true,
            random_moves: 8,
            ..Self::default()
        }
    }

    /// Fast deterministic config for tests: one thread, fixed seed,
    /// small visit budget.
    pub fn for_testing() -> Self {
        Self {
            threads: 1,
            max_visits: 64,
            seed: 42,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_visits(mut self, visits: u32) -> Self {
        // 0 means "no limit" on the wire; normalize here.
        self.max_visits = if visits == 0 { UNLIMITED } else { visits };
        self
    }

    pub fn with_playouts(mut self, playouts: u32) -> Self {
        self.max_playouts = if playouts == 0 { UNLIMITED } else { playouts };
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_noise(mut self, noise: bool) -> Self {
        self.noise = noise;
        self
    }
}
