//! Property-based tests for the threshold sweep and segment strategies
//!
//! These tests verify invariants that should hold for all inputs:
//! - Contingency counts always sum to the population size
//! - Contacts and recall never increase as the threshold rises
//! - Identical inputs produce identical sweeps
//! - Segment-specific optima never lose to a shared grid threshold

use churnroi::{
    build_cost_matrix, compare_models, compare_strategies, create_value_segments,
    evaluate_threshold, segment_sweep, threshold_sweep, AnalysisConfig, ModelChoice, ModelSweep,
    PredictionSet, ThresholdGrid, ValueSegment,
};
use polars::prelude::*;
use proptest::prelude::*;

/// Generate aligned labels and probabilities
fn prediction_pairs(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<f64>)> {
    prop::collection::vec((0u8..=1, 0.0f64..=1.0), 1..max_len)
        .prop_map(|pairs| pairs.into_iter().unzip())
}

/// Labels, probabilities and monthly charges for one population
fn customers(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<f64>, Vec<f64>)> {
    prop::collection::vec((0u8..=1, 0.0f64..=1.0, 18.0f64..120.0), 2..max_len).prop_map(|rows| {
        let mut labels = Vec::with_capacity(rows.len());
        let mut proba = Vec::with_capacity(rows.len());
        let mut charges = Vec::with_capacity(rows.len());
        for (l, p, c) in rows {
            labels.push(l);
            proba.push(p);
            charges.push(c);
        }
        (labels, proba, charges)
    })
}

proptest! {
    /// Property: every record accounts for every customer exactly once
    #[test]
    fn prop_counts_are_conserved((labels, proba) in prediction_pairs(60)) {
        let n = labels.len() as u64;
        let predictions = PredictionSet::new(labels, proba).unwrap();
        let matrix = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();
        let sweep = threshold_sweep(&predictions, &matrix, &ThresholdGrid::default()).unwrap();

        for record in &sweep {
            prop_assert_eq!(record.tp + record.fp + record.fn_ + record.tn, n);
            prop_assert_eq!(record.customers_contacted, record.tp + record.fp);
        }
    }

    /// Property: raising the threshold never contacts more customers or
    /// catches more churners
    #[test]
    fn prop_contacts_and_recall_are_monotone((labels, proba) in prediction_pairs(60)) {
        let predictions = PredictionSet::new(labels, proba).unwrap();
        let matrix = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();
        let sweep = threshold_sweep(&predictions, &matrix, &ThresholdGrid::default()).unwrap();

        for pair in sweep.records().windows(2) {
            prop_assert!(pair[1].customers_contacted <= pair[0].customers_contacted);
            prop_assert!(pair[1].recall <= pair[0].recall);
        }
    }

    /// Property: a zero threshold contacts everyone at the base churn rate
    #[test]
    fn prop_zero_threshold_contacts_everyone((labels, proba) in prediction_pairs(60)) {
        let n = labels.len();
        let positives = labels.iter().filter(|&&l| l == 1).count();
        let predictions = PredictionSet::new(labels, proba).unwrap();
        let matrix = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();
        let record = evaluate_threshold(&predictions, 0.0, &matrix).unwrap();

        prop_assert_eq!(record.customers_contacted as usize, n);
        prop_assert!((record.precision - positives as f64 / n as f64).abs() < 1e-12);
    }

    /// Property: sweeps are deterministic field for field
    #[test]
    fn prop_sweep_is_deterministic((labels, proba) in prediction_pairs(60)) {
        let predictions = PredictionSet::new(labels, proba).unwrap();
        let matrix = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();
        let grid = ThresholdGrid::new(0.05, 0.95, 0.05).unwrap();

        let first = threshold_sweep(&predictions, &matrix, &grid).unwrap();
        let second = threshold_sweep(&predictions, &matrix, &grid).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: comparing a sweep with itself always picks the second
    #[test]
    fn prop_identical_models_pick_second((labels, proba) in prediction_pairs(40)) {
        let predictions = PredictionSet::new(labels, proba).unwrap();
        let matrix = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();
        let sweep = threshold_sweep(&predictions, &matrix, &ThresholdGrid::default()).unwrap();

        let a = ModelSweep::new("A", sweep.clone());
        let b = ModelSweep::new("B", sweep);
        let best = compare_models(&a, &b).unwrap();
        prop_assert_eq!(best.choice, ModelChoice::Second);
    }

    /// Property: segment-specific thresholds never lose to any shared grid
    /// threshold
    #[test]
    fn prop_segment_total_dominates_single(
        (labels, proba, charges) in customers(50),
        shared_index in 0usize..17,
    ) {
        prop_assume!(charges.iter().any(|&c| c != charges[0]));

        let frame = df!("MonthlyCharges" => &charges).unwrap();
        let population = create_value_segments(&frame, "MonthlyCharges").unwrap();
        prop_assume!(population.count(ValueSegment::LowValue) > 0);

        let predictions = PredictionSet::new(labels, proba).unwrap();
        let config = AnalysisConfig::default();
        let base = build_cost_matrix(1500.0, 50.0, 0.25).unwrap();

        let high = segment_sweep(&predictions, &population, ValueSegment::HighValue, &base, &config).unwrap();
        let low = segment_sweep(&predictions, &population, ValueSegment::LowValue, &base, &config).unwrap();

        let shared = config.grid.threshold_at(shared_index);
        let comparison = compare_strategies(&high.sweep, &low.sweep, shared).unwrap();

        prop_assert!(comparison.single_threshold_exact);
        prop_assert!(comparison.segment_total_roi >= comparison.single_total_roi);
        prop_assert!(comparison.improvement >= 0.0);
    }
}
