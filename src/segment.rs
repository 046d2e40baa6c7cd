//! Value segmentation and segment-specific threshold strategies
//!
//! Customers are split at the median of a charge column into High-Value and
//! Low-Value segments. Each segment gets its own CLV and cost matrix, its own
//! sweep, and its own optimal threshold. [`compare_strategies`] measures what
//! that buys over one shared threshold.

use crate::config::AnalysisConfig;
use crate::cost::{calculate_clv, CostMatrix};
use crate::data::numeric_column;
use crate::error::{RoiError, RoiResult};
use crate::metrics::{BusinessMetricsRecord, PredictionSet};
use crate::sweep::{find_optimal, threshold_sweep, Metric, SweepTable};
use ndarray::Array1;
use polars::prelude::*;
use std::fmt;

/// Name of the column added by [`create_value_segments`]
pub const SEGMENT_COLUMN: &str = "value_segment";

/// Tolerance for matching a shared threshold in a single-row sweep
const SINGLE_ROW_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSegment {
    HighValue,
    LowValue,
}

impl ValueSegment {
    pub fn label(self) -> &'static str {
        match self {
            ValueSegment::HighValue => "High-Value",
            ValueSegment::LowValue => "Low-Value",
        }
    }
}

impl fmt::Display for ValueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Population tagged with value segments
#[derive(Debug, Clone)]
pub struct SegmentedPopulation {
    /// Input table with the [`SEGMENT_COLUMN`] appended
    pub frame: DataFrame,
    pub charges: Array1<f64>,
    pub segments: Vec<ValueSegment>,
    /// Median charge the split was made at
    pub charge_median: f64,
}

impl SegmentedPopulation {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Row indices belonging to `segment`, in table order
    pub fn indices(&self, segment: ValueSegment) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == segment)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, segment: ValueSegment) -> usize {
        self.segments.iter().filter(|&&s| s == segment).count()
    }

    pub fn charges_of(&self, segment: ValueSegment) -> Vec<f64> {
        self.indices(segment)
            .into_iter()
            .map(|i| self.charges[i])
            .collect()
    }
}

/// Median with the two middle values averaged for even lengths
fn median(values: &[f64]) -> RoiResult<f64> {
    if values.is_empty() {
        return Err(RoiError::invalid("cannot take the median of an empty column"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(RoiError::invalid("charge column contains non-finite values"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Tag every row High-Value when `charge >= median`, Low-Value otherwise
pub fn create_value_segments(
    population: &DataFrame,
    charge_column: &str,
) -> RoiResult<SegmentedPopulation> {
    let charges = numeric_column(population, charge_column)?;
    let charge_median = median(&charges)?;

    let segments: Vec<ValueSegment> = charges
        .iter()
        .map(|&c| {
            if c >= charge_median {
                ValueSegment::HighValue
            } else {
                ValueSegment::LowValue
            }
        })
        .collect();

    let mut frame = population.clone();
    let labels: Vec<&str> = segments.iter().map(|s| s.label()).collect();
    frame.with_column(Series::new(SEGMENT_COLUMN, labels))?;

    log::debug!(
        "Split {} customers at median {} {:.2}",
        segments.len(),
        charge_column,
        charge_median
    );

    Ok(SegmentedPopulation {
        frame,
        charges: Array1::from(charges),
        segments,
        charge_median,
    })
}

/// CLV of the customers in one segment
pub fn segment_clv(
    population: &SegmentedPopulation,
    segment: ValueSegment,
    horizon_months: u32,
) -> RoiResult<f64> {
    let charges = population.charges_of(segment);
    if charges.is_empty() {
        return Err(RoiError::EmptySegment(segment));
    }
    calculate_clv(&charges, horizon_months)
}

/// Base matrix with the segment CLV substituted
pub fn segment_cost_matrix(base_matrix: &CostMatrix, segment_clv: f64) -> CostMatrix {
    base_matrix.with_clv(segment_clv)
}

/// Sweep of one segment under its own cost matrix
#[derive(Debug, Clone)]
pub struct SegmentSweep {
    pub segment: ValueSegment,
    pub clv: f64,
    pub cost_matrix: CostMatrix,
    pub sweep: SweepTable,
}

/// Run the threshold sweep on one segment's customers
pub fn segment_sweep(
    predictions: &PredictionSet,
    population: &SegmentedPopulation,
    segment: ValueSegment,
    base_matrix: &CostMatrix,
    config: &AnalysisConfig,
) -> RoiResult<SegmentSweep> {
    if predictions.len() != population.len() {
        return Err(RoiError::invalid(format!(
            "{} predictions for a population of {}",
            predictions.len(),
            population.len()
        )));
    }

    let clv = segment_clv(population, segment, config.horizon_months)?;
    let cost_matrix = segment_cost_matrix(base_matrix, clv);
    let subset = predictions.select(&population.indices(segment))?;
    let sweep = threshold_sweep(&subset, &cost_matrix, &config.grid)?;

    log::debug!(
        "{} segment: {} customers, CLV {:.2}",
        segment,
        subset.len(),
        clv
    );

    Ok(SegmentSweep {
        segment,
        clv,
        cost_matrix,
        sweep,
    })
}

/// One shared threshold versus per-segment optimal thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyComparison {
    pub single_threshold: f64,
    pub single_high_roi: f64,
    pub single_low_roi: f64,
    pub single_total_roi: f64,
    pub high_value_optimal: BusinessMetricsRecord,
    pub low_value_optimal: BusinessMetricsRecord,
    pub segment_total_roi: f64,
    pub improvement: f64,
    /// False when either segment's row for the shared threshold was matched
    /// to a nearby, not identical, grid value
    pub single_threshold_exact: bool,
}

/// Row for `threshold`, matched to the nearest grid value within half a step.
fn shared_threshold_row<'a>(
    sweep: &'a SweepTable,
    threshold: f64,
    segment: ValueSegment,
) -> RoiResult<(&'a BusinessMetricsRecord, bool)> {
    let row = sweep
        .closest(threshold)
        .ok_or_else(|| RoiError::invalid(format!("{} sweep is empty", segment)))?;

    let tolerance = sweep
        .grid_spacing()
        .map_or(SINGLE_ROW_TOLERANCE, |spacing| spacing / 2.0);
    let distance = (row.threshold - threshold).abs();
    if distance > tolerance {
        return Err(RoiError::invalid(format!(
            "threshold {} is not on the {} sweep grid (nearest {})",
            threshold, segment, row.threshold
        )));
    }

    let exact = row.threshold == threshold;
    if !exact {
        log::warn!(
            "{} sweep has no row at threshold {}; using nearest {}",
            segment,
            threshold,
            row.threshold
        );
    }
    Ok((row, exact))
}

/// Compare one shared threshold against segment-specific optimal thresholds.
pub fn compare_strategies(
    high_value_sweep: &SweepTable,
    low_value_sweep: &SweepTable,
    global_threshold: f64,
) -> RoiResult<StrategyComparison> {
    let high_value_optimal = find_optimal(high_value_sweep, Metric::NetRoi)?;
    let low_value_optimal = find_optimal(low_value_sweep, Metric::NetRoi)?;

    let (single_high, high_exact) =
        shared_threshold_row(high_value_sweep, global_threshold, ValueSegment::HighValue)?;
    let (single_low, low_exact) =
        shared_threshold_row(low_value_sweep, global_threshold, ValueSegment::LowValue)?;

    let single_total_roi = single_high.net_roi + single_low.net_roi;
    let segment_total_roi = high_value_optimal.net_roi + low_value_optimal.net_roi;
    let improvement = segment_total_roi - single_total_roi;

    log::info!(
        "Segment thresholds {:.2}/{:.2} improve net ROI by {:.2} over shared {:.2}",
        high_value_optimal.threshold,
        low_value_optimal.threshold,
        improvement,
        global_threshold
    );

    Ok(StrategyComparison {
        single_threshold: global_threshold,
        single_high_roi: single_high.net_roi,
        single_low_roi: single_low.net_roi,
        single_total_roi,
        high_value_optimal,
        low_value_optimal,
        segment_total_roi,
        improvement,
        single_threshold_exact: high_exact && low_exact,
    })
}

/// Headline figures for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSummary {
    pub segment: ValueSegment,
    pub count: usize,
    /// Share of members labelled as churners
    pub churn_rate: f64,
    pub avg_charge: f64,
    pub clv: f64,
}

pub fn summarize_segment(
    population: &SegmentedPopulation,
    predictions: &PredictionSet,
    segment: ValueSegment,
    horizon_months: u32,
) -> RoiResult<SegmentSummary> {
    if predictions.len() != population.len() {
        return Err(RoiError::invalid(format!(
            "{} predictions for a population of {}",
            predictions.len(),
            population.len()
        )));
    }

    let indices = population.indices(segment);
    if indices.is_empty() {
        return Err(RoiError::EmptySegment(segment));
    }

    let count = indices.len();
    let churners = indices
        .iter()
        .filter(|&&i| predictions.y_true()[i] == 1)
        .count();
    let avg_charge = indices.iter().map(|&i| population.charges[i]).sum::<f64>() / count as f64;

    Ok(SegmentSummary {
        segment,
        count,
        churn_rate: churners as f64 / count as f64,
        avg_charge,
        clv: segment_clv(population, segment, horizon_months)?,
    })
}

/// Customer flagged for a retention offer
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEntry {
    pub customer_id: String,
    pub segment: ValueSegment,
    pub monthly_charge: f64,
    pub churn_probability: f64,
}

/// Customers scored at or above `threshold`, highest probability first,
/// truncated to `top_n`.
pub fn contact_list(
    customer_ids: &[String],
    population: &SegmentedPopulation,
    predictions: &PredictionSet,
    threshold: f64,
    top_n: usize,
) -> RoiResult<Vec<ContactEntry>> {
    if customer_ids.len() != population.len() || predictions.len() != population.len() {
        return Err(RoiError::invalid(format!(
            "{} ids and {} predictions for a population of {}",
            customer_ids.len(),
            predictions.len(),
            population.len()
        )));
    }
    if !(0.0..=1.0).contains(&threshold) {
        return Err(RoiError::invalid(format!(
            "threshold must lie in [0, 1], got {}",
            threshold
        )));
    }

    let mut flagged: Vec<ContactEntry> = predictions
        .y_proba()
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p >= threshold)
        .map(|(i, &p)| ContactEntry {
            customer_id: customer_ids[i].clone(),
            segment: population.segments[i],
            monthly_charge: population.charges[i],
            churn_probability: p,
        })
        .collect();

    flagged.sort_by(|a, b| b.churn_probability.total_cmp(&a.churn_probability));
    flagged.truncate(top_n);
    Ok(flagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdGrid;
    use crate::cost::build_cost_matrix;

    fn population() -> SegmentedPopulation {
        let frame = df!(
            "customerID" => &["a", "b", "c", "d", "e", "f"],
            "MonthlyCharges" => &[20.0, 95.0, 70.0, 30.0, 110.0, 50.0]
        )
        .unwrap();
        create_value_segments(&frame, "MonthlyCharges").unwrap()
    }

    fn predictions() -> PredictionSet {
        PredictionSet::new(
            vec![0, 1, 1, 0, 1, 0],
            vec![0.2, 0.85, 0.4, 0.65, 0.7, 0.1],
        )
        .unwrap()
    }

    #[test]
    fn test_create_value_segments() {
        let pop = population();

        // Sorted: 20 30 50 70 95 110 -> median 60
        assert_eq!(pop.charge_median, 60.0);
        assert_eq!(pop.indices(ValueSegment::HighValue), vec![1, 2, 4]);
        assert_eq!(pop.indices(ValueSegment::LowValue), vec![0, 3, 5]);

        let column = pop.frame.column(SEGMENT_COLUMN).unwrap();
        assert_eq!(column.str().unwrap().get(1), Some("High-Value"));
        assert_eq!(column.str().unwrap().get(0), Some("Low-Value"));
    }

    #[test]
    fn test_median_value_is_high_value() {
        let frame = df!("MonthlyCharges" => &[10.0, 50.0, 90.0]).unwrap();
        let pop = create_value_segments(&frame, "MonthlyCharges").unwrap();

        assert_eq!(pop.charge_median, 50.0);
        assert_eq!(pop.segments[1], ValueSegment::HighValue);
    }

    #[test]
    fn test_missing_charge_column() {
        let frame = df!("Other" => &[1.0]).unwrap();
        assert!(matches!(
            create_value_segments(&frame, "MonthlyCharges"),
            Err(RoiError::Data(_))
        ));
    }

    #[test]
    fn test_segment_clv() {
        let pop = population();
        let high = segment_clv(&pop, ValueSegment::HighValue, 24).unwrap();
        let low = segment_clv(&pop, ValueSegment::LowValue, 24).unwrap();

        assert!((high - 275.0 / 3.0 * 24.0).abs() < 1e-9);
        assert!((low - 100.0 / 3.0 * 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_charges_leave_low_segment_empty() {
        let frame = df!("MonthlyCharges" => &[40.0, 40.0]).unwrap();
        let pop = create_value_segments(&frame, "MonthlyCharges").unwrap();

        assert_eq!(pop.count(ValueSegment::HighValue), 2);
        assert!(matches!(
            segment_clv(&pop, ValueSegment::LowValue, 24),
            Err(RoiError::EmptySegment(ValueSegment::LowValue))
        ));
    }

    #[test]
    fn test_segment_sweep_uses_segment_rows_and_clv() {
        let pop = population();
        let base = build_cost_matrix(1200.0, 50.0, 0.25).unwrap();
        let config = AnalysisConfig::default();

        let high =
            segment_sweep(&predictions(), &pop, ValueSegment::HighValue, &base, &config).unwrap();

        assert_eq!(high.sweep.len(), config.grid.len());
        assert!(high.sweep.iter().all(|r| r.population() == 3));
        assert_eq!(high.cost_matrix.fp, base.fp);
        assert!((high.cost_matrix.clv - high.clv).abs() < 1e-12);
        assert!((high.cost_matrix.tp - (high.clv * 0.25 - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_segment_sweep_rejects_misaligned_predictions() {
        let pop = population();
        let base = build_cost_matrix(1200.0, 50.0, 0.25).unwrap();
        let short = PredictionSet::new(vec![1], vec![0.5]).unwrap();

        assert!(segment_sweep(
            &short,
            &pop,
            ValueSegment::HighValue,
            &base,
            &AnalysisConfig::default()
        )
        .is_err());
    }

    fn sweeps() -> (SweepTable, SweepTable) {
        let pop = population();
        let base = build_cost_matrix(1200.0, 50.0, 0.25).unwrap();
        let config = AnalysisConfig::default();
        let high =
            segment_sweep(&predictions(), &pop, ValueSegment::HighValue, &base, &config).unwrap();
        let low =
            segment_sweep(&predictions(), &pop, ValueSegment::LowValue, &base, &config).unwrap();
        (high.sweep, low.sweep)
    }

    #[test]
    fn test_compare_strategies_on_grid() {
        let (high, low) = sweeps();
        let shared = ThresholdGrid::default().threshold_at(6);

        let comparison = compare_strategies(&high, &low, shared).unwrap();

        assert!(comparison.single_threshold_exact);
        assert_eq!(
            comparison.single_total_roi,
            comparison.single_high_roi + comparison.single_low_roi
        );
        assert!(comparison.segment_total_roi >= comparison.single_total_roi);
        assert!(comparison.improvement >= 0.0);
    }

    #[test]
    fn test_compare_strategies_nearest_match_is_flagged() {
        let (high, low) = sweeps();

        let comparison = compare_strategies(&high, &low, 0.42).unwrap();
        assert!(!comparison.single_threshold_exact);

        // Far outside the grid
        assert!(compare_strategies(&high, &low, 0.99).is_err());
    }

    #[test]
    fn test_summarize_segment() {
        let pop = population();
        let summary =
            summarize_segment(&pop, &predictions(), ValueSegment::HighValue, 24).unwrap();

        assert_eq!(summary.count, 3);
        assert_eq!(summary.churn_rate, 1.0);
        assert!((summary.avg_charge - 275.0 / 3.0).abs() < 1e-9);
        assert!((summary.clv - summary.avg_charge * 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_contact_list() {
        let pop = population();
        let ids: Vec<String> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let contacts = contact_list(&ids, &pop, &predictions(), 0.4, 3).unwrap();
        let order: Vec<&str> = contacts.iter().map(|c| c.customer_id.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "d"]);
        assert_eq!(contacts[2].segment, ValueSegment::LowValue);

        let all = contact_list(&ids, &pop, &predictions(), 0.4, 100).unwrap();
        assert_eq!(all.len(), 4);

        assert!(contact_list(&ids[..2], &pop, &predictions(), 0.4, 3).is_err());
    }
}
