//! Default configuration values.
//!
//! Single source of truth for every default used across the Tengen system.
//! Search-policy defaults follow the engine's tuned constants.

// Common defaults
pub const LOG_LEVEL: &str = "info";

// Search defaults
/// 0 means auto-detect from the CPU count.
pub const THREADS: usize = 0;
/// 0 means unlimited.
pub const VISITS: u32 = 0;
/// 0 means unlimited.
pub const PLAYOUTS: u32 = 0;
pub const RESIGN_PERCENT: i32 = -1;
pub const PONDERING: bool = true;
pub const NOISE: bool = false;
/// Moves at the start of the game picked proportionally to visit counts.
pub const RANDOM_MOVES: u32 = 0;
pub const RNG_SEED: u64 = 0;

// Memory defaults
pub const MAX_MEMORY_MIB: usize = 2048;
pub const CACHE_RATIO_PERCENT: usize = 10;

// Time defaults
pub const LAGBUFFER_CS: i32 = 100;

// Strength-control defaults
pub const OPENING_MOVES: u32 = 2;
pub const STRONG_WEIGHTS: &str = "";
pub const NOMINAL_WEIGHTS: &str = "";

// Game defaults
pub const KOMI: f32 = 7.5;
