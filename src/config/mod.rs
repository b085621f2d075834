//! Engine Configuration Module
//!
//! Provides the ambient, operator-tunable configuration for the contextual
//! matrix profile engine, replacing magic numbers (the combined-severity
//! threshold, the default context length, calculator scheduling defaults)
//! with values loadable from TOML.
//!
//! ## Loading Order
//!
//! 1. `CTXMP_CONFIG` environment variable (path to TOML file)
//! 2. `ctxmp_config.toml` in the current working directory
//! 3. Built-in defaults (matching the spec's adopted values)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(EngineConfig::load());
//! let threshold = config::get().scoring.combined_severity_threshold;
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
