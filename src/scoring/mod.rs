//! Rank-Voting Scorer (H2) — converts a feature vector into a `0..=7`
//! severity score by counting rank-based percentile thresholds exceeded
//! (§4.6).

use thiserror::Error;

/// The seven percentile cut points, in ascending order (§4.6).
const PERCENTILES: [f64; 7] = [50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0];

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("empty feature vector")]
    EmptyVector,
}

/// A day's percentile thresholds degenerated to a trivially small sample.
/// Not an error: §4.7 requires a deterministic all-zero result rather than
/// a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    Scored,
    Degenerate,
}

/// Score every entry of `x` against the seven rank-percentile thresholds
/// computed from `x` itself (linear interpolation between order statistics,
/// R-7 / NumPy default — §9 Open Question 4).
///
/// Clusters smaller than `min_size` degenerate to an all-zero score vector,
/// per §4.7's failure policy; this is reported via the returned
/// `ScoreOutcome`, not a `Result` error.
pub fn score(x: &[f64], min_size: usize) -> Result<(Vec<u32>, ScoreOutcome), ScoringError> {
    if x.is_empty() {
        return Err(ScoringError::EmptyVector);
    }
    if x.len() < min_size {
        return Ok((vec![0; x.len()], ScoreOutcome::Degenerate));
    }

    let thresholds = percentile_thresholds(x);
    let scores = x
        .iter()
        .map(|&v| thresholds.iter().filter(|&&t| v > t).count() as u32)
        .collect();
    Ok((scores, ScoreOutcome::Scored))
}

/// Compute the seven thresholds via linear interpolation between order
/// statistics (the R-7 / NumPy default definition).
fn percentile_thresholds(x: &[f64]) -> [f64; 7] {
    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();

    let mut out = [0.0; 7];
    for (i, &p) in PERCENTILES.iter().enumerate() {
        out[i] = percentile_interpolated(&sorted, n, p);
    }
    out
}

fn percentile_interpolated(sorted: &[f64], n: usize, p: f64) -> f64 {
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}
