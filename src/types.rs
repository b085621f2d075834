//! Shared data structures for the contextual matrix profile pipeline.
//!
//! - `Series`: the equally-spaced input signal plus its cadence.
//! - `TimeWindow`: a sub-daily interval produced by the external CART
//!   segmentation step.
//! - `ClusterMask`: the day→cluster assignment produced by the external
//!   clustering step.
//! - `AnomalyRecord`: one reported anomaly.

use serde::{Deserialize, Serialize};

// ============================================================================
// Series
// ============================================================================

/// An equally-spaced univariate time series plus its daily cadence.
///
/// Invariant: `values.len()` is a multiple of `samples_per_day`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// Raw sample values, 64-bit floating point, no gaps.
    pub values: Vec<f64>,
    /// Samples per day (`p` in the spec; 96 for 15-minute data).
    pub samples_per_day: usize,
    /// Optional aligned exogenous channel (e.g. temperature), same length
    /// as `values` when present.
    pub auxiliary: Option<Vec<f64>>,
}

impl Series {
    /// Construct a series, validating the cadence invariant and the
    /// absence of NaN/Inf samples (§4.1 failure policy: `DataError`).
    pub fn new(
        values: Vec<f64>,
        samples_per_day: usize,
        auxiliary: Option<Vec<f64>>,
    ) -> Result<Self, DataError> {
        if samples_per_day == 0 {
            return Err(DataError::InvalidCadence(samples_per_day));
        }
        if values.len() % samples_per_day != 0 {
            return Err(DataError::LengthNotMultipleOfCadence {
                len: values.len(),
                samples_per_day,
            });
        }
        if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
            return Err(DataError::NonFiniteSample(bad));
        }
        if let Some(aux) = &auxiliary {
            if aux.len() != values.len() {
                return Err(DataError::AuxiliaryLengthMismatch {
                    series_len: values.len(),
                    aux_len: aux.len(),
                });
            }
            if let Some(bad) = aux.iter().position(|v| !v.is_finite()) {
                return Err(DataError::NonFiniteSample(bad));
            }
        }
        Ok(Self {
            values,
            samples_per_day,
            auxiliary,
        })
    }

    /// Total number of samples, `n`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of days, `D = n / p`.
    pub fn num_days(&self) -> usize {
        self.values.len() / self.samples_per_day
    }

    /// Number of length-`m` subsequences, `N_sub = n - m + 1`.
    pub fn num_subsequences(&self, m: usize) -> usize {
        self.values.len() - m + 1
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataError {
    #[error("cadence must be > 0, got {0}")]
    InvalidCadence(usize),
    #[error("series length {len} is not a multiple of samples_per_day {samples_per_day}")]
    LengthNotMultipleOfCadence { len: usize, samples_per_day: usize },
    #[error("non-finite sample at index {0}")]
    NonFiniteSample(usize),
    #[error("auxiliary channel length {aux_len} does not match series length {series_len}")]
    AuxiliaryLengthMismatch { series_len: usize, aux_len: usize },
    #[error("could not parse \"{0}\" as an HH:MM time")]
    InvalidTimeString(String),
    #[error("cluster mask row {day} has {got} columns, expected {expected}")]
    RaggedClusterRow {
        day: usize,
        expected: usize,
        got: usize,
    },
    #[error("cluster mask row {day} marks {count} clusters, expected exactly 1")]
    ClusterMembershipCount { day: usize, count: usize },
}

// ============================================================================
// Time Window
// ============================================================================

/// A sub-daily time window produced by the external CART segmentation step.
///
/// The core treats `observations` as authoritative and `from`/`to` as
/// labels (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of window, `"HH:MM"`.
    pub from: String,
    /// End of window, `"HH:MM"`.
    pub to: String,
    /// Number of observations covered by this window.
    pub observations: usize,
    /// Opaque passthrough label from the external step (e.g. a node id or
    /// free-text description); unused by the core.
    pub label: Option<String>,
}

impl TimeWindow {
    /// Parse `from`/`to` as decimal hours (`"HH:MM"` → `HH + MM/60`).
    pub fn from_hours(&self) -> Result<f64, DataError> {
        parse_hhmm(&self.from)
    }

    pub fn to_hours(&self) -> Result<f64, DataError> {
        parse_hhmm(&self.to)
    }
}

fn parse_hhmm(s: &str) -> Result<f64, DataError> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| DataError::InvalidTimeString(s.to_string()))?;
    let h: f64 = h
        .parse()
        .map_err(|_| DataError::InvalidTimeString(s.to_string()))?;
    let m: f64 = m
        .parse()
        .map_err(|_| DataError::InvalidTimeString(s.to_string()))?;
    Ok(h + m / 60.0)
}

// ============================================================================
// Cluster Mask
// ============================================================================

/// Day → cluster assignment produced by the external clustering step.
///
/// Invariant: every day belongs to exactly one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMask {
    /// `membership[d]` is the cluster index day `d` belongs to.
    membership: Vec<usize>,
    num_clusters: usize,
}

impl ClusterMask {
    /// Build from a `D x g` boolean table, validating the "exactly one
    /// cluster per day" invariant.
    pub fn from_dense(rows: &[Vec<bool>]) -> Result<Self, DataError> {
        let g = rows.first().map_or(0, |r| r.len());
        let mut membership = Vec::with_capacity(rows.len());
        for (d, row) in rows.iter().enumerate() {
            if row.len() != g {
                return Err(DataError::RaggedClusterRow {
                    day: d,
                    expected: g,
                    got: row.len(),
                });
            }
            let matches: Vec<usize> = row
                .iter()
                .enumerate()
                .filter_map(|(j, &m)| m.then_some(j))
                .collect();
            if matches.len() != 1 {
                return Err(DataError::ClusterMembershipCount {
                    day: d,
                    count: matches.len(),
                });
            }
            membership.push(matches[0]);
        }
        Ok(Self {
            membership,
            num_clusters: g,
        })
    }

    pub fn num_days(&self) -> usize {
        self.membership.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn cluster_of_day(&self, day: usize) -> usize {
        self.membership[day]
    }

    /// Days belonging to cluster `j`, in ascending order.
    pub fn days_in_cluster(&self, j: usize) -> Vec<usize> {
        self.membership
            .iter()
            .enumerate()
            .filter_map(|(d, &c)| (c == j).then_some(d))
            .collect()
    }
}

// ============================================================================
// Anomaly Record
// ============================================================================

/// One reported anomaly: `combined_severity >= threshold` for this
/// (day, cluster, window) triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyRecord {
    pub date: chrono::NaiveDate,
    pub cluster_id: usize,
    pub window_id: usize,
    pub cmp_score: u32,
    pub energy_score: u32,
    pub temp_score: u32,
    pub combined_severity: u32,
    pub rank_within_cluster_window: usize,
}

// ============================================================================
// Context Descriptor (reporting only, never read by the numeric core)
// ============================================================================

/// Human-readable labels for one context, used only by `contexts_table`
/// export (§6). Mirrors `original_source`'s `context_string` /
/// `context_string_small` pair: `context_string` is the long descriptive
/// form, `context_string_small` the short slug form, both computed once at
/// construction and carried as plain fields so they round-trip through the
/// `contexts_table` JSON export unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDescriptor {
    pub from_hours: f64,
    pub to_hours: f64,
    pub query_length: usize,
    pub context_string: String,
    pub context_string_small: String,
}

impl ContextDescriptor {
    pub fn new(from_hours: f64, to_hours: f64, query_length: usize) -> Self {
        let context_string = format!(
            "Subsequences of {:.2}h (m = {}) that start in [{:.2}, {:.2})",
            to_hours - from_hours,
            query_length,
            from_hours,
            to_hours
        );
        let context_string_small = format!("ctx_from{from_hours:.2}_to{to_hours:.2}_m{query_length}")
            .replace('.', "_");
        Self {
            from_hours,
            to_hours,
            query_length,
            context_string,
            context_string_small,
        }
    }

    /// Long form, e.g. "Subsequences of 1.00h (m = 4) that start in [0.00, 1.00)".
    pub fn describe(&self) -> &str {
        &self.context_string
    }

    /// Short slug form, e.g. "ctx_from0_00_to1_00_m4".
    pub fn slug(&self) -> &str {
        &self.context_string_small
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_length_not_multiple_of_cadence() {
        let err = Series::new(vec![1.0; 10], 4, None).unwrap_err();
        assert!(matches!(err, DataError::LengthNotMultipleOfCadence { .. }));
    }

    #[test]
    fn series_rejects_nan() {
        let err = Series::new(vec![1.0, f64::NAN, 3.0, 4.0], 4, None).unwrap_err();
        assert!(matches!(err, DataError::NonFiniteSample(1)));
    }

    #[test]
    fn series_accepts_valid_input() {
        let s = Series::new(vec![1.0; 192], 96, None).unwrap();
        assert_eq!(s.num_days(), 2);
        assert_eq!(s.num_subsequences(20), 192 - 20 + 1);
    }

    #[test]
    fn cluster_mask_requires_exactly_one_membership() {
        let rows = vec![vec![true, false], vec![true, true]];
        let err = ClusterMask::from_dense(&rows).unwrap_err();
        assert!(matches!(
            err,
            DataError::ClusterMembershipCount { day: 1, count: 2 }
        ));
    }

    #[test]
    fn cluster_mask_rejects_ragged_rows() {
        let rows = vec![vec![true, false], vec![true]];
        let err = ClusterMask::from_dense(&rows).unwrap_err();
        assert!(matches!(
            err,
            DataError::RaggedClusterRow { day: 1, expected: 2, got: 1 }
        ));
    }

    #[test]
    fn time_window_rejects_malformed_string() {
        let w = TimeWindow {
            from: "not-a-time".to_string(),
            to: "08:00".to_string(),
            observations: 1,
            label: None,
        };
        assert!(matches!(w.from_hours(), Err(DataError::InvalidTimeString(_))));
    }

    #[test]
    fn cluster_mask_groups_days() {
        let rows = vec![
            vec![true, false],
            vec![false, true],
            vec![true, false],
        ];
        let mask = ClusterMask::from_dense(&rows).unwrap();
        assert_eq!(mask.days_in_cluster(0), vec![0, 2]);
        assert_eq!(mask.days_in_cluster(1), vec![1]);
    }

    #[test]
    fn time_window_parses_hours() {
        let w = TimeWindow {
            from: "06:15".to_string(),
            to: "08:00".to_string(),
            observations: 7,
            label: None,
        };
        assert!((w.from_hours().unwrap() - 6.25).abs() < 1e-9);
        assert!((w.to_hours().unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn context_descriptor_describe_and_slug() {
        let d = ContextDescriptor::new(0.0, 1.0, 4);
        assert!(d.describe().contains("m = 4"));
        assert_eq!(d.slug(), "ctx_from0_00_to1_00_m4");
    }
}
