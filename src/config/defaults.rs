//! System-wide default constants.
//!
//! Centralises the magic numbers named in the spec's Open Questions so they
//! don't end up scattered across the scoring and pipeline modules.

// ============================================================================
// Scoring
// ============================================================================

/// Combined severity (`cmp_score + energy_score`) at or above which a day is
/// reported as an anomaly. The source treats this as a fixed magic number;
/// this crate exposes it as a config field with this default.
pub const COMBINED_SEVERITY_THRESHOLD: u32 = 6;

/// Maximum number of anomalies emitted per (time window, cluster) pair.
pub const MAX_ANOMALIES_PER_CLUSTER_WINDOW: usize = 10;

/// Minimum cluster size for percentile-based scoring to be meaningful.
/// Below this, the scorer degenerates to all-zero scores (`DegenerateCluster`).
pub const MIN_CLUSTER_SIZE_FOR_SCORING: usize = 3;

// ============================================================================
// Context
// ============================================================================

/// Default context length in hours ("1 hour before the time window").
pub const DEFAULT_M_CTX_HOURS: f64 = 1.0;

// ============================================================================
// Calculator
// ============================================================================

/// Default number of worker threads for the anytime calculator's optional
/// parallel column dispatch. `1` means sequential, single-threaded.
pub const DEFAULT_WORKER_THREADS: usize = 1;

/// Minimum query length accepted by the distance generator.
pub const MIN_QUERY_LENGTH: usize = 4;
