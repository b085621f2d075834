//! Pipeline Driver (H3) — for each time window and day-cluster, runs the
//! Anytime Calculator to completion, extracts features, scores them, and
//! emits anomaly records (§4.7).
//!
//! Timestamp/CSV ingest is out of scope for this crate (§1); the driver
//! accepts `start_date` as the caller-supplied anchor mapping day index `0`
//! to a calendar date, so `AnomalyRecord.date` can still be populated
//! without the core taking on ingest responsibilities.

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculator::{AnytimeCalculator, CmpConsumer};
use crate::context::{ContextError, ContextManager};
use crate::distance::{DistanceError, DistanceGenerator};
use crate::features::{self, ClusterSubMatrix, FeatureError};
use crate::scoring::{self, ScoringError};
use crate::types::{AnomalyRecord, ClusterMask, ContextDescriptor, DataError, Series, TimeWindow};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Distance(#[from] DistanceError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("cluster mask covers {mask_days} days but series has {series_days} days")]
    ClusterSeriesMismatch {
        mask_days: usize,
        series_days: usize,
    },
    #[error("day index {day} overflows start_date into an out-of-range calendar date")]
    DateOverflow { day: usize },
}

/// Everything produced by one full pipeline run.
pub struct PipelineOutput {
    pub anomalies: Vec<AnomalyRecord>,
    pub contexts_table: Vec<ContextDescriptor>,
    /// Per-window exported distance matrix, only populated when the caller
    /// asked for it (§6: optional debug export).
    pub distance_matrices: Option<Vec<Vec<Vec<f64>>>>,
}

/// Orchestrates one run over all time windows using the engine config's
/// scoring thresholds and calculator order/budget/worker settings.
pub struct PipelineDriver {
    config: crate::config::EngineConfig,
}

impl PipelineDriver {
    pub fn new(config: crate::config::EngineConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over every time window and day cluster.
    pub fn run(
        &self,
        series: &Series,
        windows: &[TimeWindow],
        clusters: &ClusterMask,
        start_date: NaiveDate,
        export_matrices: bool,
    ) -> Result<PipelineOutput, PipelineError> {
        let d = series.num_days();
        if clusters.num_days() != d {
            return Err(PipelineError::ClusterSeriesMismatch {
                mask_days: clusters.num_days(),
                series_days: d,
            });
        }

        let p = series.samples_per_day;
        let m_ctx_hours = self.config.context.default_m_ctx_hours;
        let mut anomalies = Vec::new();
        let mut contexts_table = Vec::with_capacity(windows.len());
        let mut distance_matrices = export_matrices.then(|| Vec::with_capacity(windows.len()));

        for (k, window) in windows.iter().enumerate() {
            info!(window = k, "starting pipeline window");
            let (s, e, m) = self.derive_context_range(windows, k, p, m_ctx_hours)?;
            contexts_table.push(ContextDescriptor::new(
                s as f64 / p as f64 * 24.0,
                e as f64 / p as f64 * 24.0,
                m,
            ));

            let n_sub = series.num_subsequences(m);
            let contexts = ContextManager::per_day(d, p, s, e, n_sub)?;
            let generator = DistanceGenerator::prepare(series.values.clone(), m)?;
            let consumer = CmpConsumer::new(contexts);

            let mut calc = AnytimeCalculator::new(
                generator,
                consumer,
                n_sub,
                &self.config.calculator.default_order,
                self.config.calculator.worker_threads,
            );
            while !calc.calculate_columns(self.config.calculator.default_budget).completed {}

            let profile = calc.into_consumer().into_profile();
            let full_matrix = profile.export_distance_matrix();
            if let Some(matrices) = distance_matrices.as_mut() {
                matrices.push(full_matrix.clone());
            }

            for j in 0..clusters.num_clusters() {
                let day_idx = clusters.days_in_cluster(j);
                if day_idx.is_empty() {
                    continue;
                }
                let window_anomalies =
                    self.score_cluster_window(series, window, &full_matrix, &day_idx, k, j, start_date)?;
                anomalies.extend(window_anomalies);
            }
        }

        debug!(total = anomalies.len(), "pipeline run complete");
        Ok(PipelineOutput {
            anomalies,
            contexts_table,
            distance_matrices,
        })
    }

    /// Step 1 of §4.7: derive `(s, e, m)` in observation units for window `k`.
    fn derive_context_range(
        &self,
        windows: &[TimeWindow],
        k: usize,
        p: usize,
        m_ctx_hours: f64,
    ) -> Result<(usize, usize, usize), PipelineError> {
        let obs_per_hour = p as f64 / 24.0;
        if k == 0 {
            let e = (m_ctx_hours * obs_per_hour).round() as usize;
            let to_h = windows[0].to_hours()?;
            let m = ((to_h - 0.25 - m_ctx_hours) * obs_per_hour).floor() as usize;
            Ok((0, e.max(1), m.max(1)))
        } else {
            let from_h = windows[k].from_hours()?;
            let e = ((from_h + 0.25) * obs_per_hour).round() as usize;
            let s_raw = e as f64 - m_ctx_hours * obs_per_hour;
            let s = s_raw.max(0.0).round() as usize;
            let m = windows[k].observations;
            Ok((s, e, m.max(1)))
        }
    }

    /// Steps 4-5 of §4.7 for one (window, cluster) pair.
    #[allow(clippy::too_many_arguments)]
    fn score_cluster_window(
        &self,
        series: &Series,
        window: &TimeWindow,
        full_matrix: &[Vec<f64>],
        day_idx: &[usize],
        window_id: usize,
        cluster_id: usize,
        start_date: NaiveDate,
    ) -> Result<Vec<AnomalyRecord>, PipelineError> {
        let min_size = self.config.scoring.min_cluster_size_for_scoring;
        let threshold = self.config.scoring.combined_severity_threshold;
        let max_per_window = self.config.scoring.max_anomalies_per_cluster_window;

        let sub = ClusterSubMatrix::restrict(full_matrix, day_idx);
        let vcmp = features::vector_ad_cmp(&sub);
        let venergy = features::vector_ad_energy(series, window, day_idx)?;
        let vtemp = features::vector_ad_temperature(series, window, day_idx)?;

        let (cmp_scores, outcome) = scoring::score(&vcmp, min_size)?;
        let (energy_scores, _) = scoring::score(&venergy, min_size)?;
        let (temp_scores, _) = scoring::score(&vtemp, min_size)?;

        if outcome == scoring::ScoreOutcome::Degenerate {
            warn!(
                cluster = cluster_id,
                window = window_id,
                size = day_idx.len(),
                "cluster too small for percentile scoring, all scores zeroed"
            );
        }

        let mut candidates: Vec<(usize, u32, u32, u32, u32)> = day_idx
            .iter()
            .enumerate()
            .map(|(i, &day)| {
                let combined = cmp_scores[i] + energy_scores[i];
                (day, cmp_scores[i], energy_scores[i], temp_scores[i], combined)
            })
            .filter(|&(.., combined)| combined >= threshold)
            .collect();

        candidates.sort_by(|a, b| b.4.cmp(&a.4).then(a.0.cmp(&b.0)));
        candidates.truncate(max_per_window);

        candidates
            .into_iter()
            .enumerate()
            .map(|(rank, (day, cmp_score, energy_score, temp_score, combined))| {
                let date = start_date
                    .checked_add_days(Days::new(day as u64))
                    .ok_or(PipelineError::DateOverflow { day })?;
                Ok(AnomalyRecord {
                    date,
                    cluster_id,
                    window_id,
                    cmp_score,
                    energy_score,
                    temp_score,
                    combined_severity: combined,
                    rank_within_cluster_window: rank + 1,
                })
            })
            .collect()
    }
}
