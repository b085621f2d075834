//! Anytime Calculator (M1) — orchestrates a distance source and a context
//! profile consumer over a budget-bounded, resumable column schedule (§4.4).
//!
//! The visit order and the worker count are resolved once at construction
//! (`new`) into a concrete plan; the inner loop never dispatches through a
//! trait object (§9: no dynamic dispatch on the hot path). Parallel columns
//! are processed against per-worker shadow generators and profiles, merged
//! back via `ContextualMatrixProfile::merge` once the batch completes —
//! `argmin` ties may differ from a sequential run, but every minimum
//! distance does not.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::cmp::ContextualMatrixProfile;
use crate::config::ColumnOrder;
use crate::context::ContextManager;
use crate::distance::DistanceGenerator;

/// Resolves one column into a distance vector. Implemented for
/// `DistanceGenerator`; the trait exists so the calculator's construction
/// signature documents the capability it needs rather than the concrete
/// type, without paying for dynamic dispatch (the calculator is generic,
/// not boxed).
pub trait DistanceSource: Send {
    fn compute_column(&mut self, c: usize) -> Vec<f64>;
    fn num_subsequences(&self) -> usize;
}

impl DistanceSource for DistanceGenerator {
    fn compute_column(&mut self, c: usize) -> Vec<f64> {
        self.column(c).to_vec()
    }

    fn num_subsequences(&self) -> usize {
        DistanceGenerator::num_subsequences(self)
    }
}

/// Accepts streamed distance columns and folds them into an accumulated
/// result. Implemented for `CmpConsumer`; `new_shadow`/`merge_from` back the
/// parallel path's per-worker accumulation.
pub trait ColumnSink: Send {
    fn consume(&mut self, c: usize, distances: &[f64]);
    fn new_shadow(&self) -> Self
    where
        Self: Sized;
    fn merge_from(&mut self, other: Self)
    where
        Self: Sized;
}

/// Binds a `ContextManager` (L2) to the `ContextualMatrixProfile` (L3) it
/// feeds, the concrete sink the calculator's core pipeline uses.
#[derive(Clone)]
pub struct CmpConsumer {
    contexts: std::sync::Arc<ContextManager>,
    cmp: ContextualMatrixProfile,
}

impl CmpConsumer {
    pub fn new(contexts: ContextManager) -> Self {
        let k = contexts.num_contexts();
        Self {
            contexts: std::sync::Arc::new(contexts),
            cmp: ContextualMatrixProfile::new(k),
        }
    }

    pub fn profile(&self) -> &ContextualMatrixProfile {
        &self.cmp
    }

    pub fn into_profile(self) -> ContextualMatrixProfile {
        self.cmp
    }

    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }
}

impl ColumnSink for CmpConsumer {
    fn consume(&mut self, c: usize, distances: &[f64]) {
        self.cmp.process_column(c, distances, &self.contexts);
    }

    fn new_shadow(&self) -> Self {
        Self {
            contexts: std::sync::Arc::clone(&self.contexts),
            cmp: ContextualMatrixProfile::new(self.cmp.num_contexts()),
        }
    }

    fn merge_from(&mut self, other: Self) {
        self.cmp.merge(other.cmp);
    }
}

/// Result of one `calculate_columns` call.
#[derive(Debug, Clone, Copy)]
pub struct CalcStatus {
    /// True once every column in the visit order has been processed at
    /// least once, across this and all prior calls.
    pub completed: bool,
    /// Number of columns actually processed by this call (may be less than
    /// the requested budget if fewer columns remained).
    pub columns_processed: usize,
}

/// Orchestrates `G` (a distance source) and `C` (a column sink) over a
/// deterministic, resumable column schedule.
pub struct AnytimeCalculator<G: DistanceSource + Clone, C: ColumnSink + Clone> {
    generator: G,
    consumer: C,
    order: Vec<usize>,
    cursor: usize,
    worker_threads: usize,
}

impl<G: DistanceSource + Clone, C: ColumnSink + Clone> AnytimeCalculator<G, C> {
    /// Build a calculator over `n_sub` columns visited in the order
    /// described by `order_cfg`, with `worker_threads` parallel workers
    /// (`1` is sequential).
    pub fn new(generator: G, consumer: C, n_sub: usize, order_cfg: &ColumnOrder, worker_threads: usize) -> Self {
        let order = Self::build_order(n_sub, order_cfg);
        Self {
            generator,
            consumer,
            order,
            cursor: 0,
            worker_threads: worker_threads.max(1),
        }
    }

    fn build_order(n_sub: usize, order_cfg: &ColumnOrder) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n_sub).collect();
        if let ColumnOrder::Random { seed } = order_cfg {
            let mut rng = rand::rngs::StdRng::seed_from_u64(*seed);
            order.shuffle(&mut rng);
        }
        order
    }

    /// Process up to `budget` more columns (all remaining columns if
    /// `None`), resuming from wherever the previous call left off. The
    /// consumer holds a valid partial result after every call, whose
    /// entries only improve (never worsen) on subsequent calls.
    pub fn calculate_columns(&mut self, budget: Option<usize>) -> CalcStatus {
        let remaining = self.order.len() - self.cursor;
        let take = budget.map_or(remaining, |b| b.min(remaining));
        if take == 0 {
            return CalcStatus {
                completed: self.cursor >= self.order.len(),
                columns_processed: 0,
            };
        }

        let slice = self.order[self.cursor..self.cursor + take].to_vec();
        self.cursor += take;

        if self.worker_threads <= 1 || slice.len() < self.worker_threads {
            for c in slice {
                let distances = self.generator.compute_column(c);
                self.consumer.consume(c, &distances);
            }
        } else {
            let chunk_size = slice.len().div_ceil(self.worker_threads);
            let shadows: Vec<C> = slice
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let mut gen = self.generator.clone();
                    let mut shadow = self.consumer.new_shadow();
                    for &c in chunk {
                        let distances = gen.compute_column(c);
                        shadow.consume(c, &distances);
                    }
                    shadow
                })
                .collect();
            for shadow in shadows {
                self.consumer.merge_from(shadow);
            }
        }

        CalcStatus {
            completed: self.cursor >= self.order.len(),
            columns_processed: take,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.order.len()
    }

    pub fn columns_remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextManager;

    fn calc(n_sub: usize, m: usize, values: Vec<f64>, order: &ColumnOrder, workers: usize) -> AnytimeCalculator<DistanceGenerator, CmpConsumer> {
        let gen = DistanceGenerator::prepare(values, m).unwrap();
        let contexts = ContextManager::per_day(2, 96, 0, 20, n_sub).unwrap();
        let consumer = CmpConsumer::new(contexts);
        AnytimeCalculator::new(gen, consumer, n_sub, order, workers)
    }

    fn series() -> Vec<f64> {
        (0..192).map(|i| (i as f64 * 0.1).sin()).collect()
    }

    #[test]
    fn sequential_run_completes_in_one_call() {
        let n_sub = 192 - 20 + 1;
        let mut c = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        let status = c.calculate_columns(None);
        assert!(status.completed);
        assert_eq!(status.columns_processed, n_sub);
        assert!(c.is_complete());
    }

    #[test]
    fn budgeted_run_resumes_across_calls() {
        let n_sub = 192 - 20 + 1;
        let mut c = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        let mut processed = 0;
        loop {
            let status = c.calculate_columns(Some(7));
            processed += status.columns_processed;
            if status.completed {
                break;
            }
        }
        assert_eq!(processed, n_sub);
    }

    #[test]
    fn budgeted_result_matches_unbudgeted_result() {
        let n_sub = 192 - 20 + 1;
        let mut full = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        full.calculate_columns(None);
        let full_matrix = full.into_consumer().into_profile().export_distance_matrix();

        let mut budgeted = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        while !budgeted.calculate_columns(Some(3)).completed {}
        let budgeted_matrix = budgeted.into_consumer().into_profile().export_distance_matrix();

        assert_eq!(full_matrix, budgeted_matrix);
    }

    #[test]
    fn random_order_is_deterministic_for_a_fixed_seed() {
        let n_sub = 192 - 20 + 1;
        let order = ColumnOrder::Random { seed: 7 };
        let mut a = calc(n_sub, 20, series(), &order, 1);
        a.calculate_columns(None);
        let matrix_a = a.into_consumer().into_profile().export_distance_matrix();

        let mut b = calc(n_sub, 20, series(), &order, 1);
        b.calculate_columns(None);
        let matrix_b = b.into_consumer().into_profile().export_distance_matrix();

        assert_eq!(matrix_a, matrix_b);
    }

    #[test]
    fn parallel_run_matches_sequential_minima() {
        let n_sub = 192 - 20 + 1;
        let mut seq = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        seq.calculate_columns(None);
        let seq_matrix = seq.into_consumer().into_profile().export_distance_matrix();

        let mut par = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 4);
        par.calculate_columns(None);
        let par_matrix = par.into_consumer().into_profile().export_distance_matrix();

        for (row_a, row_b) in seq_matrix.iter().zip(par_matrix.iter()) {
            for (x, y) in row_a.iter().zip(row_b.iter()) {
                if x.is_finite() && y.is_finite() {
                    assert!((x - y).abs() < 1e-9);
                } else {
                    assert_eq!(x.is_nan(), y.is_nan());
                    assert_eq!(x.is_infinite(), y.is_infinite());
                }
            }
        }
    }

    #[test]
    fn zero_budget_is_a_no_op() {
        let n_sub = 192 - 20 + 1;
        let mut c = calc(n_sub, 20, series(), &ColumnOrder::Sequential, 1);
        let status = c.calculate_columns(Some(0));
        assert_eq!(status.columns_processed, 0);
        assert!(!status.completed);
    }
}
