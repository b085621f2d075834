//! Feature Extractors (H1) — derive per-day real-valued feature vectors
//! from a cluster-restricted CMP slice plus the raw series (§4.5).

use thiserror::Error;

use crate::types::{DataError, Series, TimeWindow};

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("day index {day} out of range for day_idx of length {len}")]
    DayIndexOutOfRange { day: usize, len: usize },
    #[error("window parse error: {0}")]
    Window(#[from] DataError),
}

/// `CMP|_j`: the `g x g` symmetric sub-matrix restricted to one cluster's
/// days, with `+Inf` already replaced by `0` per §4.7 step 4.
pub struct ClusterSubMatrix {
    rows: Vec<Vec<f64>>,
}

impl ClusterSubMatrix {
    /// Build by restricting a full `K x K` exported distance matrix to the
    /// rows/cols in `day_idx`, replacing `+Inf` with `0`.
    pub fn restrict(full: &[Vec<f64>], day_idx: &[usize]) -> Self {
        let rows = day_idx
            .iter()
            .map(|&u| {
                day_idx
                    .iter()
                    .map(|&v| {
                        let d = full[u][v];
                        if d.is_infinite() { 0.0 } else { d }
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `vector_ad_cmp`: for each day in the cluster, the minimum of its row in
/// `CMP|_j` excluding the diagonal (§4.5).
pub fn vector_ad_cmp(sub: &ClusterSubMatrix) -> Vec<f64> {
    (0..sub.len())
        .map(|d| {
            sub.rows[d]
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != d)
                .map(|(_, &v)| v)
                .fold(f64::INFINITY, f64::min)
        })
        .collect()
}

/// Observation offset of `window.from` within its day, rounded to the
/// nearest sample (§4.5: the window can start anywhere in the day, not just
/// at 0 — `from`/`to` are the window's real clock position).
fn window_start_offset(window: &TimeWindow, p: usize) -> Result<usize, FeatureError> {
    let from_h = window.from_hours()?;
    let obs_per_hour = p as f64 / 24.0;
    Ok((from_h * obs_per_hour).round() as usize)
}

/// `vector_ad_energy`: cumulative sum of `S` over the time window, per day
/// in `day_idx` (§4.5).
pub fn vector_ad_energy(
    series: &Series,
    window: &TimeWindow,
    day_idx: &[usize],
) -> Result<Vec<f64>, FeatureError> {
    let p = series.samples_per_day;
    let offset = window_start_offset(window, p)?;
    let obs = window.observations;
    day_idx
        .iter()
        .map(|&d| {
            let day_base = d
                .checked_mul(p)
                .ok_or(FeatureError::DayIndexOutOfRange { day: d, len: series.num_days() })?;
            let base = (day_base + offset).min(series.values.len());
            let end = (base + obs).min(series.values.len());
            Ok(series.values[base..end].iter().sum())
        })
        .collect()
}

/// `vector_ad_temperature`: mean of the auxiliary (temperature) channel over
/// the time window, per day in `day_idx` (§4.5).
pub fn vector_ad_temperature(
    series: &Series,
    window: &TimeWindow,
    day_idx: &[usize],
) -> Result<Vec<f64>, FeatureError> {
    let aux = series.auxiliary.as_deref().unwrap_or(&[]);
    let p = series.samples_per_day;
    let offset = window_start_offset(window, p)?;
    let obs = window.observations;
    day_idx
        .iter()
        .map(|&d| {
            let day_base = d
                .checked_mul(p)
                .ok_or(FeatureError::DayIndexOutOfRange { day: d, len: series.num_days() })?;
            let base = (day_base + offset).min(aux.len());
            let end = (base + obs).min(aux.len());
            if end <= base {
                return Ok(0.0);
            }
            let slice = &aux[base..end];
            Ok(slice.iter().sum::<f64>() / slice.len() as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(obs: usize) -> TimeWindow {
        TimeWindow {
            from: "00:00".to_string(),
            to: "01:00".to_string(),
            observations: obs,
            label: None,
        }
    }

    fn offset_window(from: &str, to: &str, obs: usize) -> TimeWindow {
        TimeWindow {
            from: from.to_string(),
            to: to.to_string(),
            observations: obs,
            label: None,
        }
    }

    #[test]
    fn vector_ad_cmp_excludes_diagonal() {
        let full = vec![
            vec![f64::NAN, 3.0, 5.0],
            vec![3.0, f64::NAN, 2.0],
            vec![5.0, 2.0, f64::NAN],
        ];
        let sub = ClusterSubMatrix::restrict(&full, &[0, 1, 2]);
        let v = vector_ad_cmp(&sub);
        assert_eq!(v, vec![3.0, 2.0, 2.0]);
    }

    #[test]
    fn vector_ad_cmp_replaces_inf_with_zero() {
        let full = vec![
            vec![f64::NAN, f64::INFINITY],
            vec![f64::INFINITY, f64::NAN],
        ];
        let sub = ClusterSubMatrix::restrict(&full, &[0, 1]);
        assert_eq!(vector_ad_cmp(&sub), vec![0.0, 0.0]);
    }

    #[test]
    fn vector_ad_energy_sums_window_per_day() {
        let series = Series::new(vec![1.0, 1.0, 10.0, 10.0, 2.0, 2.0, 20.0, 20.0], 4, None).unwrap();
        let w = window(2);
        let v = vector_ad_energy(&series, &w, &[0, 1]).unwrap();
        assert_eq!(v, vec![2.0, 4.0]);
    }

    #[test]
    fn vector_ad_temperature_means_window_per_day() {
        let aux = vec![10.0, 20.0, 0.0, 0.0, 30.0, 40.0, 0.0, 0.0];
        let series = Series::new(vec![0.0; 8], 4, Some(aux)).unwrap();
        let w = window(2);
        let v = vector_ad_temperature(&series, &w, &[0, 1]).unwrap();
        assert_eq!(v, vec![15.0, 35.0]);
    }

    #[test]
    fn vector_ad_energy_honors_nonzero_window_offset() {
        // p=8 (3h/sample); window [06:00, 09:00) is samples 2..4 within each
        // day, not the day's first two samples.
        let values = vec![
            0.0, 0.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, // day 0
            0.0, 0.0, 3.0, 3.0, 0.0, 0.0, 0.0, 0.0, // day 1
        ];
        let series = Series::new(values, 8, None).unwrap();
        let w = offset_window("06:00", "09:00", 2);
        let v = vector_ad_energy(&series, &w, &[0, 1]).unwrap();
        assert_eq!(v, vec![10.0, 6.0]);
    }

    #[test]
    fn vector_ad_temperature_honors_nonzero_window_offset() {
        let aux = vec![
            100.0, 100.0, 10.0, 20.0, 100.0, 100.0, 100.0, 100.0, // day 0
            100.0, 100.0, 30.0, 40.0, 100.0, 100.0, 100.0, 100.0, // day 1
        ];
        let series = Series::new(vec![0.0; 16], 8, Some(aux)).unwrap();
        let w = offset_window("06:00", "09:00", 2);
        let v = vector_ad_temperature(&series, &w, &[0, 1]).unwrap();
        assert_eq!(v, vec![15.0, 35.0]);
    }
}
