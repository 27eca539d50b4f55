//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable
//! overrides.

use crate::CentralConfig;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from a subdirectory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the TENGEN_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var("TENGEN_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from TENGEN_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "TENGEN_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &PathBuf) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (usize, u32, f32, bool, ...)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: TENGEN_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "TENGEN_COMMON_LOG_LEVEL");

    // Search
    env_override!(config, search.threads, "TENGEN_SEARCH_THREADS", parse);
    env_override!(config, search.visits, "TENGEN_SEARCH_VISITS", parse);
    env_override!(config, search.playouts, "TENGEN_SEARCH_PLAYOUTS", parse);
    env_override!(
        config,
        search.resign_percent,
        "TENGEN_SEARCH_RESIGN_PERCENT",
        parse
    );
    env_override!(config, search.pondering, "TENGEN_SEARCH_PONDERING", parse);
    env_override!(config, search.noise, "TENGEN_SEARCH_NOISE", parse);
    env_override!(
        config,
        search.random_moves,
        "TENGEN_SEARCH_RANDOM_MOVES",
        parse
    );
    env_override!(config, search.rng_seed, "TENGEN_SEARCH_RNG_SEED", parse);

    // Memory
    env_override!(
        config,
        memory.max_memory_mib,
        "TENGEN_MEMORY_MAX_MEMORY_MIB",
        parse
    );
    env_override!(
        config,
        memory.cache_ratio_percent,
        "TENGEN_MEMORY_CACHE_RATIO_PERCENT",
        parse
    );

    // Time
    env_override!(config, time.lagbuffer_cs, "TENGEN_TIME_LAGBUFFER_CS", parse);

    // Strength
    env_override!(
        config,
        strength.opening_moves,
        "TENGEN_STRENGTH_OPENING_MOVES",
        parse
    );
    env_override!(
        config,
        strength.strong_weights,
        "TENGEN_STRENGTH_STRONG_WEIGHTS"
    );
    env_override!(
        config,
        strength.nominal_weights,
        "TENGEN_STRENGTH_NOMINAL_WEIGHTS"
    );

    // Game
    env_override!(config, game.komi, "TENGEN_GAME_KOMI", parse);

    config
}
