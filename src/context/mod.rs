//! Context Manager (L2) — partitions the subsequence-index axis into
//! disjoint, labelled contexts.
//!
//! Materialises two parallel lookup arrays (`context_of_row`,
//! `context_of_col`) at construction so consumers get `O(1)` lookups
//! instead of scanning an opaque iterable of ranges (§9 re-architecture
//! notes).

use thiserror::Error;
use std::ops::Range;

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("context {index} range [{start}, {end}) is empty")]
    EmptyRange {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("context {index} range [{start}, {end}) exceeds bound {bound}")]
    OutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        bound: usize,
    },
    #[error("context {a} [{a_start}, {a_end}) overlaps context {b} [{b_start}, {b_end})")]
    Overlap {
        a: usize,
        a_start: usize,
        a_end: usize,
        b: usize,
        b_start: usize,
        b_end: usize,
    },
}

/// A disjoint partition of `[0, n_sub)` into labelled contexts.
pub struct ContextManager {
    ranges: Vec<Range<usize>>,
    context_of_index: Vec<Option<usize>>,
}

impl ContextManager {
    /// Build from a list of half-open ranges, validating non-emptiness,
    /// bounds, and pairwise disjointness (§4.2).
    pub fn new(ranges: Vec<Range<usize>>, n_sub: usize) -> Result<Self, ContextError> {
        for (k, r) in ranges.iter().enumerate() {
            if r.start >= r.end {
                return Err(ContextError::EmptyRange {
                    index: k,
                    start: r.start,
                    end: r.end,
                });
            }
            if r.end > n_sub {
                return Err(ContextError::OutOfBounds {
                    index: k,
                    start: r.start,
                    end: r.end,
                    bound: n_sub,
                });
            }
        }

        let mut context_of_index = vec![None; n_sub];
        for (k, r) in ranges.iter().enumerate() {
            for i in r.clone() {
                if let Some(existing) = context_of_index[i] {
                    let other = &ranges[existing];
                    return Err(ContextError::Overlap {
                        a: existing,
                        a_start: other.start,
                        a_end: other.end,
                        b: k,
                        b_start: r.start,
                        b_end: r.end,
                    });
                }
                context_of_index[i] = Some(k);
            }
        }

        Ok(Self {
            ranges,
            context_of_index,
        })
    }

    /// One context per day: `[d*p + s, d*p + e)` for `d` in `[0, num_days)`.
    pub fn per_day(num_days: usize, p: usize, s: usize, e: usize, n_sub: usize) -> Result<Self, ContextError> {
        let ranges = (0..num_days).map(|d| (d * p + s)..(d * p + e)).collect();
        Self::new(ranges, n_sub)
    }

    pub fn num_contexts(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_of(&self, k: usize) -> Range<usize> {
        self.ranges[k].clone()
    }

    pub fn context_of_row(&self, i: usize) -> Option<usize> {
        self.context_of_index.get(i).copied().flatten()
    }

    pub fn context_of_col(&self, j: usize) -> Option<usize> {
        self.context_of_row(j)
    }

    pub fn contexts(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.ranges.iter().cloned().enumerate()
    }
}
