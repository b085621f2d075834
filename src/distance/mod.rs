//! Distance Generator (L1) — anytime streaming Euclidean distance columns.
//!
//! Maintains the running sliding-dot-product state described in the spec's
//! §4.1: a rolling sum-of-squares vector computed once in `O(n)`, and a
//! per-column inner-product vector updated in `O(N_sub)` per adjacent
//! column via Mueen's recursion. A non-adjacent column request triggers a
//! full `O(N_sub * m)` recompute.

use thiserror::Error;

use crate::config::defaults::MIN_QUERY_LENGTH;

#[derive(Debug, Error, PartialEq)]
pub enum DistanceError {
    #[error("query length {m} must be >= {min} (got m={m}, n={n})")]
    QueryTooShort { m: usize, min: usize, n: usize },
    #[error("query length {m} must be <= series length {n}")]
    QueryTooLong { m: usize, n: usize },
}

/// Stateful generator of one distance-matrix column at a time.
///
/// `column(c)` is cheap only when called with `c` adjacent to the
/// previously computed column; jumping to an arbitrary column forces a
/// full recompute, as documented in §4.1.
#[derive(Clone)]
pub struct DistanceGenerator {
    values: Vec<f64>,
    m: usize,
    n_sub: usize,
    /// Rolling sum of squares, `ss[i] = sum_{k=0..m} values[i+k]^2`.
    ss: Vec<f64>,
    /// `qt[r]` for the last computed column `last_c`.
    qt: Option<Vec<f64>>,
    last_c: Option<usize>,
    /// Scratch buffer reused across `column()` calls (§5: "does not escape
    /// the generator").
    scratch: Vec<f64>,
}

impl DistanceGenerator {
    /// Prepare the generator for series `values` and query length `m`.
    pub fn prepare(values: Vec<f64>, m: usize) -> Result<Self, DistanceError> {
        let n = values.len();
        if m < MIN_QUERY_LENGTH {
            return Err(DistanceError::QueryTooShort {
                m,
                min: MIN_QUERY_LENGTH,
                n,
            });
        }
        if m > n {
            return Err(DistanceError::QueryTooLong { m, n });
        }
        let n_sub = n - m + 1;
        let ss = rolling_sum_of_squares(&values, m, n_sub);
        Ok(Self {
            values,
            m,
            n_sub,
            ss,
            qt: None,
            last_c: None,
            scratch: vec![0.0; n_sub],
        })
    }

    pub fn num_subsequences(&self) -> usize {
        self.n_sub
    }

    /// Return the distance column `d` where `d[r] = ||S[r..r+m) - S[c..c+m)||_2`.
    ///
    /// Negative values produced by round-off inside the square root are
    /// clamped to zero (§4.1 numeric policy).
    pub fn column(&mut self, c: usize) -> &[f64] {
        debug_assert!(c < self.n_sub);

        let qt = match (&self.qt, self.last_c) {
            (Some(prev_qt), Some(prev_c)) if prev_c + 1 == c => {
                self.step_qt(prev_qt, prev_c, c)
            }
            _ => self.full_qt(c),
        };

        for r in 0..self.n_sub {
            let raw = self.ss[r] + self.ss[c] - 2.0 * qt[r];
            self.scratch[r] = raw.max(0.0).sqrt();
        }

        self.qt = Some(qt);
        self.last_c = Some(c);
        &self.scratch
    }

    fn full_qt(&self, c: usize) -> Vec<f64> {
        let m = self.m;
        (0..self.n_sub)
            .map(|r| dot(&self.values[r..r + m], &self.values[c..c + m]))
            .collect()
    }

    /// Mueen's sliding update: `QT[c+1][r+1] = QT[c][r] - S[r]*S[c] + S[r+m]*S[c+m]`.
    /// `QT[c+1][0]` has no predecessor and is computed directly.
    fn step_qt(&self, old_qt: &[f64], old_c: usize, new_c: usize) -> Vec<f64> {
        let m = self.m;
        let mut new_qt = vec![0.0; self.n_sub];
        new_qt[0] = dot(&self.values[0..m], &self.values[new_c..new_c + m]);
        for r in 0..self.n_sub - 1 {
            new_qt[r + 1] =
                old_qt[r] - self.values[r] * self.values[old_c] + self.values[r + m] * self.values[old_c + m];
        }
        new_qt
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn rolling_sum_of_squares(values: &[f64], m: usize, n_sub: usize) -> Vec<f64> {
    let mut ss = vec![0.0; n_sub];
    let mut acc: f64 = values[0..m].iter().map(|v| v * v).sum();
    ss[0] = acc;
    for i in 1..n_sub {
        acc += values[i + m - 1].powi(2) - values[i - 1].powi(2);
        ss[i] = acc;
    }
    ss
}
