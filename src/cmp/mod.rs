//! Contextual Matrix Profile Consumer (L3).
//!
//! Folds the conceptual `N_sub x N_sub` distance matrix down to a `K x K`
//! matrix of per-context minima as columns stream in, per §4.3. Internally
//! uses an explicit `Option<(f64, (u32, u32))>` "unset" sentinel rather than
//! `+Inf`/NaN as a logic value (§9 re-architecture notes); `+Inf`/NaN are
//! only introduced at the export boundary.

use crate::context::ContextManager;

/// `(min distance, (row index, col index))` for one CMP cell, or `None` if
/// no column feeding this cell has been processed yet.
pub type Cell = Option<(f64, (u32, u32))>;

/// `K x K` matrix of per-context minimum distances and their arg-min index
/// pairs, built incrementally from streamed distance columns.
pub struct ContextualMatrixProfile {
    k: usize,
    cells: Vec<Cell>,
}

impl ContextualMatrixProfile {
    /// Allocate a `K x K` profile, all cells unset.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            cells: vec![None; k * k],
        }
    }

    pub fn num_contexts(&self) -> usize {
        self.k
    }

    fn idx(&self, u: usize, v: usize) -> usize {
        u * self.k + v
    }

    /// Current minimum distance for `(u, v)`, or `None` if unset.
    pub fn min_distance(&self, u: usize, v: usize) -> Option<f64> {
        self.cells[self.idx(u, v)].map(|(d, _)| d)
    }

    /// Current arg-min `(row, col)` for `(u, v)`, or `None` if unset.
    pub fn argmin(&self, u: usize, v: usize) -> Option<(u32, u32)> {
        self.cells[self.idx(u, v)].map(|(_, rc)| rc)
    }

    /// Feed one raw distance column, updating every context pair that
    /// subscribes to it (§4.3 steps 1-3) plus the mirrored transpose entry
    /// (§4.3 "Symmetry").
    pub fn process_column(&mut self, c: usize, distances: &[f64], contexts: &ContextManager) {
        let v = match contexts.context_of_col(c) {
            Some(v) => v,
            None => return,
        };

        for (u, range) in contexts.contexts() {
            let mut best: Option<(f64, usize)> = None;
            for r in range {
                if r == c {
                    continue; // trivial self-match
                }
                let d = distances[r];
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, r));
                }
            }
            let Some((dmin, r_star)) = best else { continue };

            self.offer(u, v, dmin, (r_star as u32, c as u32));
            self.offer(v, u, dmin, (c as u32, r_star as u32));
        }
    }

    /// Update `(u, v)` if `dmin` improves on the current minimum. Ties keep
    /// the first-seen (earliest visited column) value, per §5's
    /// reproducibility rule.
    fn offer(&mut self, u: usize, v: usize, dmin: f64, rc: (u32, u32)) {
        let idx = self.idx(u, v);
        let improves = match self.cells[idx] {
            None => true,
            Some((existing, _)) => dmin < existing,
        };
        if improves {
            self.cells[idx] = Some((dmin, rc));
        }
    }

    /// Merge another profile's cells into this one, keeping the smaller
    /// distance per cell and this profile's existing value on ties (§5:
    /// parallel-worker shadow-matrix merge).
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.k, other.k);
        for (slot, incoming) in self.cells.iter_mut().zip(other.cells.into_iter()) {
            if let Some((d, rc)) = incoming {
                let improves = match slot {
                    None => true,
                    Some((existing, _)) => d < *existing,
                };
                if improves {
                    *slot = Some((d, rc));
                }
            }
        }
    }

    /// Export as a dense matrix with the diagonal replaced by NaN and
    /// unset cells replaced by `+Inf` (§3, §9: sentinels only at the
    /// export boundary).
    pub fn export_distance_matrix(&self) -> Vec<Vec<f64>> {
        (0..self.k)
            .map(|u| {
                (0..self.k)
                    .map(|v| {
                        if u == v {
                            f64::NAN
                        } else {
                            self.min_distance(u, v).unwrap_or(f64::INFINITY)
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
