//! Threshold sweep and optimal-threshold selection

use crate::config::ThresholdGrid;
use crate::cost::CostMatrix;
use crate::error::{RoiError, RoiResult};
use crate::metrics::{evaluate_threshold, BusinessMetricsRecord, PredictionSet};
use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Column names of an exported sweep table, in export order
pub const SWEEP_COLUMNS: [&str; 12] = [
    "Threshold",
    "Customers_Contacted",
    "TP",
    "FP",
    "FN",
    "TN",
    "Precision",
    "Recall",
    "Retention_Cost",
    "Revenue_Saved",
    "Opportunity_Cost",
    "Net_ROI",
];

/// Numeric field of a [`BusinessMetricsRecord`] that can be optimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    Threshold,
    CustomersContacted,
    TruePositives,
    FalsePositives,
    FalseNegatives,
    TrueNegatives,
    Precision,
    Recall,
    RetentionCost,
    RevenueSaved,
    OpportunityCost,
    #[default]
    NetRoi,
}

impl Metric {
    const ALL: [Metric; 12] = [
        Metric::Threshold,
        Metric::CustomersContacted,
        Metric::TruePositives,
        Metric::FalsePositives,
        Metric::FalseNegatives,
        Metric::TrueNegatives,
        Metric::Precision,
        Metric::Recall,
        Metric::RetentionCost,
        Metric::RevenueSaved,
        Metric::OpportunityCost,
        Metric::NetRoi,
    ];

    /// Column name used in exported tables
    pub fn column_name(self) -> &'static str {
        SWEEP_COLUMNS[self as usize]
    }

    pub fn value(self, record: &BusinessMetricsRecord) -> f64 {
        match self {
            Metric::Threshold => record.threshold,
            Metric::CustomersContacted => record.customers_contacted as f64,
            Metric::TruePositives => record.tp as f64,
            Metric::FalsePositives => record.fp as f64,
            Metric::FalseNegatives => record.fn_ as f64,
            Metric::TrueNegatives => record.tn as f64,
            Metric::Precision => record.precision,
            Metric::Recall => record.recall,
            Metric::RetentionCost => record.retention_cost,
            Metric::RevenueSaved => record.revenue_saved,
            Metric::OpportunityCost => record.opportunity_cost,
            Metric::NetRoi => record.net_roi,
        }
    }
}

impl FromStr for Metric {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column_name() == s)
            .ok_or_else(|| RoiError::MetricNotFound(s.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Business metrics for each grid threshold, ascending by threshold
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepTable {
    records: Vec<BusinessMetricsRecord>,
}

impl SweepTable {
    /// Wrap records that are already in ascending threshold order
    pub fn from_records(records: Vec<BusinessMetricsRecord>) -> RoiResult<Self> {
        if records.windows(2).any(|w| w[0].threshold >= w[1].threshold) {
            return Err(RoiError::invalid(
                "sweep records must be strictly ascending by threshold",
            ));
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[BusinessMetricsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BusinessMetricsRecord> {
        self.records.iter()
    }

    pub fn thresholds(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.threshold).collect()
    }

    /// Smallest gap between consecutive thresholds, `None` below two rows
    pub fn grid_spacing(&self) -> Option<f64> {
        self.records
            .windows(2)
            .map(|w| w[1].threshold - w[0].threshold)
            .reduce(f64::min)
    }

    /// Record whose threshold is nearest to `threshold`; the earlier record
    /// wins when two are equally near.
    pub fn closest(&self, threshold: f64) -> Option<&BusinessMetricsRecord> {
        let mut best: Option<&BusinessMetricsRecord> = None;
        for record in &self.records {
            let distance = (record.threshold - threshold).abs();
            match best {
                Some(b) if (b.threshold - threshold).abs() <= distance => {}
                _ => best = Some(record),
            }
        }
        best
    }

    /// Tabular form with the exported column names and order
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let f64_col = |name: &str, get: fn(&BusinessMetricsRecord) -> f64| {
            Series::new(name, self.records.iter().map(get).collect::<Vec<f64>>())
        };
        let u64_col = |name: &str, get: fn(&BusinessMetricsRecord) -> u64| {
            Series::new(name, self.records.iter().map(get).collect::<Vec<u64>>())
        };

        DataFrame::new(vec![
            f64_col("Threshold", |r| r.threshold),
            u64_col("Customers_Contacted", |r| r.customers_contacted),
            u64_col("TP", |r| r.tp),
            u64_col("FP", |r| r.fp),
            u64_col("FN", |r| r.fn_),
            u64_col("TN", |r| r.tn),
            f64_col("Precision", |r| r.precision),
            f64_col("Recall", |r| r.recall),
            f64_col("Retention_Cost", |r| r.retention_cost),
            f64_col("Revenue_Saved", |r| r.revenue_saved),
            f64_col("Opportunity_Cost", |r| r.opportunity_cost),
            f64_col("Net_ROI", |r| r.net_roi),
        ])
    }
}

impl<'a> IntoIterator for &'a SweepTable {
    type Item = &'a BusinessMetricsRecord;
    type IntoIter = std::slice::Iter<'a, BusinessMetricsRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Evaluate every threshold of `grid`.
///
/// Grid points are evaluated in parallel; the indexed collect keeps the
/// table ascending by threshold. Degenerate points (nobody contacted) are
/// kept.
pub fn threshold_sweep(
    predictions: &PredictionSet,
    cost_matrix: &CostMatrix,
    grid: &ThresholdGrid,
) -> RoiResult<SweepTable> {
    grid.validate()?;

    let records = (0..grid.len())
        .into_par_iter()
        .map(|i| evaluate_threshold(predictions, grid.threshold_at(i), cost_matrix))
        .collect::<RoiResult<Vec<_>>>()?;

    log::debug!(
        "Swept {} thresholds over {} customers (CLV {:.2})",
        records.len(),
        predictions.len(),
        cost_matrix.clv
    );

    Ok(SweepTable { records })
}

/// Record with the largest value of `metric`; the lowest threshold wins ties.
pub fn find_optimal(sweep: &SweepTable, metric: Metric) -> RoiResult<BusinessMetricsRecord> {
    let mut records = sweep.iter();
    let mut best = *records
        .next()
        .ok_or_else(|| RoiError::invalid("cannot select from an empty sweep"))?;

    for record in records {
        if metric.value(record) > metric.value(&best) {
            best = *record;
        }
    }

    Ok(best)
}

/// [`find_optimal`] with the metric given by its column name
pub fn find_optimal_by_name(sweep: &SweepTable, metric: &str) -> RoiResult<BusinessMetricsRecord> {
    let metric = metric.parse::<Metric>()?;
    find_optimal(sweep, metric)
}
