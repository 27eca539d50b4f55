//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

fn d_log_level() -> String {
    defaults::LOG_LEVEL.into()
}
fn d_threads() -> usize {
    defaults::THREADS
}
fn d_visits() -> u32 {
    defaults::VISITS
}
fn d_playouts() -> u32 {
    defaults::PLAYOUTS
}
fn d_resign_percent() -> i32 {
    defaults::RESIGN_PERCENT
}
fn d_pondering() -> bool {
    defaults::PONDERING
}
fn d_noise() -> bool {
    defaults::NOISE
}
fn d_random_moves() -> u32 {
    defaults::RANDOM_MOVES
}
fn d_rng_seed() -> u64 {
    defaults::RNG_SEED
}
fn d_max_memory_mib() -> usize {
    defaults::MAX_MEMORY_MIB
}
fn d_cache_ratio_percent() -> usize {
    defaults::CACHE_RATIO_PERCENT
}
fn d_lagbuffer_cs() -> i32 {
    defaults::LAGBUFFER_CS
}
fn d_opening_moves() -> u32 {
    defaults::OPENING_MOVES
}
fn d_strong_weights() -> String {
    defaults::STRONG_WEIGHTS.into()
}
fn d_nominal_weights() -> String {
    defaults::NOMINAL_WEIGHTS.into()
}
fn d_komi() -> f32 {
    defaults::KOMI
}

/// Root configuration structure matching config.toml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub memory: MemorySection,
    #[serde(default)]
    pub time: TimeSection,
    #[serde(default)]
    pub strength: StrengthSection,
    #[serde(default)]
    pub game: GameSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: d_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    /// Worker threads; 0 auto-detects from the CPU count.
    #[serde(default = "d_threads")]
    pub threads: usize,
    /// Visit budget per move; 0 means unlimited.
    #[serde(default = "d_visits")]
    pub visits: u32,
    /// Playout budget per move; 0 means unlimited.
    #[serde(default = "d_playouts")]
    pub playouts: u32,
    /// Resign when the winrate drops below this percentage; -1 disables.
    #[serde(default = "d_resign_percent")]
    pub resign_percent: i32,
    #[serde(default = "d_pondering")]
    pub pondering: bool,
    /// Dirichlet noise at the root (self-play exploration).
    #[serde(default = "d_noise")]
    pub noise: bool,
    /// Opening moves picked proportionally to visit counts.
    #[serde(default = "d_random_moves")]
    pub random_moves: u32,
    /// 0 seeds from entropy; anything else is fully reproducible.
    #[serde(default = "d_rng_seed")]
    pub rng_seed: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            threads: d_threads(),
            visits: d_visits(),
            playouts: d_playouts(),
            resign_percent: d_resign_percent(),
            pondering: d_pondering(),
            noise: d_noise(),
            random_moves: d_random_moves(),
            rng_seed: d_rng_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    #[serde(default = "d_max_memory_mib")]
    pub max_memory_mib: usize,
    #[serde(default = "d_cache_ratio_percent")]
    pub cache_ratio_percent: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            max_memory_mib: d_max_memory_mib(),
            cache_ratio_percent: d_cache_ratio_percent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSection {
    /// Network lag compensation in centiseconds.
    #[serde(default = "d_lagbuffer_cs")]
    pub lagbuffer_cs: i32,
}

impl Default for TimeSection {
    fn default() -> Self {
        Self {
            lagbuffer_cs: d_lagbuffer_cs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrengthSection {
    /// Opening moves played from the nominal tree before the rule set runs.
    #[serde(default = "d_opening_moves")]
    pub opening_moves: u32,
    /// Weights file for the strong tree (empty: stub evaluator).
    #[serde(default = "d_strong_weights")]
    pub strong_weights: String,
    /// Weights file for the nominal tree (empty: stub evaluator).
    #[serde(default = "d_nominal_weights")]
    pub nominal_weights: String,
}

impl Default for StrengthSection {
    fn default() -> Self {
        Self {
            opening_moves: d_opening_moves(),
            strong_weights: d_strong_weights(),
            nominal_weights: d_nominal_weights(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSection {
    #[serde(default = "d_komi")]
    pub komi: f32,
}

impl Default for GameSection {
    fn default() -> Self {
        Self { komi: d_komi() }
    }
}
