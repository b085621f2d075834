//! Engine configuration — all tunable knobs named in the spec's Open
//! Questions as operator-settable TOML values.
//!
//! Each field implements `Default` with the value this crate adopted when
//! resolving the spec's Open Questions, so an absent config file reproduces
//! the documented behaviour exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one engine run.
///
/// Load with `EngineConfig::load()`, which searches:
/// 1. `$CTXMP_CONFIG` env var
/// 2. `./ctxmp_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub calculator: CalculatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            context: ContextConfig::default(),
            calculator: CalculatorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CTXMP_CONFIG` environment variable
    /// 2. `./ctxmp_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("CTXMP_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from CTXMP_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from CTXMP_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "CTXMP_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("ctxmp_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./ctxmp_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./ctxmp_config.toml, using defaults");
                }
            }
        }

        info!("No ctxmp_config.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate the config for internal consistency and physical plausibility.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_physical_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Combined severity (`cmp_score + energy_score`) at or above which a
    /// day is reported (§3, §9 Open Question 2).
    #[serde(default = "default_severity_threshold")]
    pub combined_severity_threshold: u32,
    /// Cap on emitted anomalies per (time window, cluster) pair (§4.7 step 4).
    #[serde(default = "default_max_anomalies")]
    pub max_anomalies_per_cluster_window: usize,
    /// Minimum cluster size for percentile scoring to be non-degenerate.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size_for_scoring: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            combined_severity_threshold: default_severity_threshold(),
            max_anomalies_per_cluster_window: default_max_anomalies(),
            min_cluster_size_for_scoring: default_min_cluster_size(),
        }
    }
}

fn default_severity_threshold() -> u32 {
    defaults::COMBINED_SEVERITY_THRESHOLD
}
fn default_max_anomalies() -> usize {
    defaults::MAX_ANOMALIES_PER_CLUSTER_WINDOW
}
fn default_min_cluster_size() -> usize {
    defaults::MIN_CLUSTER_SIZE_FOR_SCORING
}

// ============================================================================
// Context
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Default context length in hours (§4.7 step 1, `m_ctx`, default 1 hour).
    #[serde(default = "default_m_ctx")]
    pub default_m_ctx_hours: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_m_ctx_hours: default_m_ctx(),
        }
    }
}

fn default_m_ctx() -> f64 {
    defaults::DEFAULT_M_CTX_HOURS
}

// ============================================================================
// Calculator
// ============================================================================

/// Column visit order for the anytime calculator (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnOrder {
    Sequential,
    Random { seed: u64 },
}

impl Default for ColumnOrder {
    fn default() -> Self {
        ColumnOrder::Sequential
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorConfig {
    #[serde(default)]
    pub default_order: ColumnOrder,
    /// `None` means unbounded (run to completion in one call).
    #[serde(default)]
    pub default_budget: Option<usize>,
    /// Number of rayon worker threads for parallel column dispatch. `1`
    /// means sequential, single-threaded (§5).
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            default_order: ColumnOrder::default(),
            default_budget: None,
            worker_threads: default_worker_threads(),
        }
    }
}

fn default_worker_threads() -> usize {
    defaults::DEFAULT_WORKER_THREADS
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_adopted_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.scoring.combined_severity_threshold, 6);
        assert_eq!(cfg.scoring.max_anomalies_per_cluster_window, 10);
        assert_eq!(cfg.context.default_m_ctx_hours, 1.0);
        assert_eq!(cfg.calculator.default_order, ColumnOrder::Sequential);
        assert_eq!(cfg.calculator.default_budget, None);
    }

    #[test]
    fn load_from_missing_file_errors() {
        let result = EngineConfig::load_from_file(Path::new("/nonexistent/ctxmp.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_reads_overridden_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctxmp_config.toml");
        std::fs::write(
            &path,
            "[scoring]\ncombined_severity_threshold = 10\n",
        )
        .unwrap();

        let cfg = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.scoring.combined_severity_threshold, 10);
        // Untouched sections still fall back to their defaults.
        assert_eq!(cfg.context.default_m_ctx_hours, 1.0);
    }

    #[test]
    fn load_from_file_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not = = valid toml").unwrap();

        let err = EngineConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = EngineConfig::default();
        let toml_str = cfg.to_toml().unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.scoring.combined_severity_threshold,
            cfg.scoring.combined_severity_threshold
        );
    }

    #[test]
    fn random_order_parses_with_seed() {
        let toml_str = r#"
[calculator.default_order]
kind = "random"
seed = 42
"#;
        let cfg: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.calculator.default_order, ColumnOrder::Random { seed: 42 });
    }
}
