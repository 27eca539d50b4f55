//! Tests for config parsing and env overrides.
//!
//! Env-var tests mutate process state, so each uses its own unique key.

use crate::{apply_env_overrides, CentralConfig};

#[test]
fn defaults_match_constants() {
    let config = CentralConfig::default();
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.search.threads, 0);
    assert_eq!(config.search.visits, 0);
    assert_eq!(config.search.resign_percent, -1);
    assert!(config.search.pondering);
    assert!(!config.search.noise);
    assert_eq!(config.memory.max_memory_mib, 2048);
    assert_eq!(config.memory.cache_ratio_percent, 10);
    assert_eq!(config.time.lagbuffer_cs, 100);
    assert_eq!(config.strength.opening_moves, 2);
    assert_eq!(config.game.komi, 7.5);
}

#[test]
fn parses_partial_toml() {
    let toml = r#"
        [search]
        threads = 4
        visits = 3200

        [memory]
        max_memory_mib = 4096
    "#;
    let config: CentralConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.search.threads, 4);
    assert_eq!(config.search.visits, 3200);
    // Unset fields fall back to defaults.
    assert_eq!(config.search.playouts, 0);
    assert_eq!(config.memory.max_memory_mib, 4096);
    assert_eq!(config.memory.cache_ratio_percent, 10);
}

#[test]
fn parses_empty_toml() {
    let config: CentralConfig = toml::from_str("").unwrap();
    assert_eq!(config.search.visits, 0);
    assert_eq!(config.game.komi, 7.5);
}

#[test]
fn env_override_applies() {
    std::env::set_var("TENGEN_SEARCH_THREADS", "7");
    let config = apply_env_overrides(CentralConfig::default());
    std::env::remove_var("TENGEN_SEARCH_THREADS");
    assert_eq!(config.search.threads, 7);
}

#[test]
fn env_override_bad_value_ignored() {
    std::env::set_var("TENGEN_SEARCH_VISITS", "not-a-number");
    let config = apply_env_overrides(CentralConfig::default());
    std::env::remove_var("TENGEN_SEARCH_VISITS");
    assert_eq!(config.search.visits, 0);
}

#[test]
fn env_override_strings() {
    std::env::set_var("TENGEN_STRENGTH_STRONG_WEIGHTS", "/tmp/strong.onnx");
    let config = apply_env_overrides(CentralConfig::default());
    std::env::remove_var("TENGEN_STRENGTH_STRONG_WEIGHTS");
    assert_eq!(config.strength.strong_weights, "/tmp/strong.onnx");
}
