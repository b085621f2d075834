//! Property-based tests for the invariants named in the spec.

use ctxmp::cmp::ContextualMatrixProfile;
use ctxmp::context::{ContextError, ContextManager};
use ctxmp::distance::DistanceGenerator;
use ctxmp::scoring;
use proptest::prelude::*;

fn finite_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, 24..80)
}

proptest! {
    /// Invariant 1: distance symmetry — d_c[r] == d_r[c].
    #[test]
    fn distance_columns_are_symmetric(values in finite_series(), m_raw in 4usize..10) {
        let n = values.len();
        prop_assume!(m_raw <= n);
        let mut gen = DistanceGenerator::prepare(values, m_raw).unwrap();
        let n_sub = gen.num_subsequences();
        prop_assume!(n_sub >= 2);

        let mut full = Vec::with_capacity(n_sub);
        for c in 0..n_sub {
            full.push(gen.column(c).to_vec());
        }
        for r in 0..n_sub {
            for c in 0..n_sub {
                prop_assert!((full[r][c] - full[c][r]).abs() < 1e-6);
            }
        }
    }

    /// Invariant 2: all distances are non-negative.
    #[test]
    fn distances_are_non_negative(values in finite_series(), m_raw in 4usize..10) {
        let n = values.len();
        prop_assume!(m_raw <= n);
        let mut gen = DistanceGenerator::prepare(values, m_raw).unwrap();
        for c in 0..gen.num_subsequences() {
            for &d in gen.column(c) {
                prop_assert!(d >= 0.0);
            }
        }
    }

    /// Invariant 3: CMP entries never increase in distance as more columns
    /// are processed.
    #[test]
    fn cmp_minima_are_monotonically_non_increasing(values in finite_series(), m_raw in 4usize..8) {
        let n = values.len();
        prop_assume!(m_raw <= n);
        let mut gen = DistanceGenerator::prepare(values, m_raw).unwrap();
        let n_sub = gen.num_subsequences();
        prop_assume!(n_sub >= 6);
        let k = 2;
        let half = n_sub / 2;
        prop_assume!(half >= 1);
        let contexts = ContextManager::new(vec![0..half, half..n_sub], n_sub).unwrap();
        let mut profile = ContextualMatrixProfile::new(k);

        let mut prev: Option<f64> = None;
        for c in 0..n_sub {
            let d = gen.column(c).to_vec();
            profile.process_column(c, &d, &contexts);
            if let Some(current) = profile.min_distance(0, 1) {
                if let Some(p) = prev {
                    prop_assert!(current <= p + 1e-9);
                }
                prev = Some(current);
            }
        }
    }

    /// Invariant 7: scorer monotonicity — larger values never score lower.
    #[test]
    fn scorer_is_monotonic_in_value(mut x in prop::collection::vec(-1000.0f64..1000.0, 5..40)) {
        x.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let (scores, _) = scoring::score(&x, 3).unwrap();
        for w in scores.windows(2) {
            prop_assert!(w[1] >= w[0]);
        }
    }

    /// Invariant 8: scorer output is always within [0, 7].
    #[test]
    fn scorer_output_is_bounded(x in prop::collection::vec(-1000.0f64..1000.0, 1..40)) {
        let (scores, _) = scoring::score(&x, 3).unwrap();
        for s in scores {
            prop_assert!(s <= 7);
        }
    }
}

/// Invariant 4: on completion, the CMP is symmetric and argmin indices
/// mirror each other.
#[test]
fn cmp_is_symmetric_on_completion() {
    let values: Vec<f64> = (0..40).map(|i| (i as f64 * 0.37).sin() * 5.0).collect();
    let m = 6;
    let mut gen = DistanceGenerator::prepare(values, m).unwrap();
    let n_sub = gen.num_subsequences();
    let contexts = ContextManager::new(vec![0..n_sub / 2, n_sub / 2..n_sub], n_sub).unwrap();
    let mut profile = ContextualMatrixProfile::new(2);

    for c in 0..n_sub {
        let d = gen.column(c).to_vec();
        profile.process_column(c, &d, &contexts);
    }

    assert_eq!(profile.min_distance(0, 1), profile.min_distance(1, 0));
    let (r01, c01) = profile.argmin(0, 1).unwrap();
    let (r10, c10) = profile.argmin(1, 0).unwrap();
    assert_eq!((r01, c01), (c10, r10));
}

/// Invariant 6: overlapping context ranges are rejected with `ContextError`.
#[test]
fn overlapping_contexts_are_rejected() {
    let err = ContextManager::new(vec![0..10, 5..15], 20).unwrap_err();
    assert!(matches!(err, ContextError::Overlap { .. }));
}
