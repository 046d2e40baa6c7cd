//! CSV report artifacts for the presentation layer
//!
//! Column names written here are read verbatim by downstream dashboards.

use crate::cost::CostMatrix;
use crate::segment::{ContactEntry, SegmentSweep, StrategyComparison};
use crate::selection::ModelSelection;
use crate::sweep::SweepTable;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const RECOMMENDATIONS_FILE: &str = "business_recommendations.csv";
pub const CONTACT_LIST_FILE: &str = "contact_list.csv";
pub const HIGH_VALUE_SWEEP_FILE: &str = "high_value_threshold_sweep.csv";
pub const LOW_VALUE_SWEEP_FILE: &str = "low_value_threshold_sweep.csv";

/// One `Metric,Value` row of the recommendations table
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub metric: &'static str,
    pub value: String,
}

impl Recommendation {
    fn new(metric: &'static str, value: impl Into<String>) -> Self {
        Self {
            metric,
            value: value.into(),
        }
    }
}

/// Sweep file name for a model key, e.g. `lr_threshold_sweep.csv`
pub fn sweep_file_name(model_key: &str) -> String {
    let mut slug = String::with_capacity(model_key.len());
    for c in model_key.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "model" } else { slug };
    format!("{}_threshold_sweep.csv", slug)
}

/// Summary of the decision in the order dashboards display it
pub fn build_recommendations(
    selection: &ModelSelection<'_>,
    cost_matrix: &CostMatrix,
    high_value: &SegmentSweep,
    low_value: &SegmentSweep,
    comparison: &StrategyComparison,
    charge_median: f64,
) -> Vec<Recommendation> {
    vec![
        Recommendation::new("Recommended Model", selection.model),
        Recommendation::new("Optimal Threshold", format!("{:.2}", selection.threshold)),
        Recommendation::new("CLV (Average)", format!("{:.2}", cost_matrix.clv)),
        Recommendation::new("Retention Cost", format!("{:.2}", cost_matrix.retention_cost)),
        Recommendation::new(
            "Retention Success Rate",
            format!("{}", cost_matrix.retention_success_rate),
        ),
        Recommendation::new(
            "Customers Contacted",
            selection.optimal.customers_contacted.to_string(),
        ),
        Recommendation::new(
            "Expected Net ROI (Single)",
            format!("{:.2}", comparison.single_total_roi),
        ),
        Recommendation::new(
            "Expected Net ROI (Segmented)",
            format!("{:.2}", comparison.segment_total_roi),
        ),
        Recommendation::new(
            "Segmentation Improvement",
            format!("{:.2}", comparison.improvement),
        ),
        Recommendation::new("Charge Median", format!("{:.2}", charge_median)),
        Recommendation::new("High-Value CLV", format!("{:.2}", high_value.clv)),
        Recommendation::new("Low-Value CLV", format!("{:.2}", low_value.clv)),
        Recommendation::new(
            "High-Value Threshold",
            format!("{:.2}", comparison.high_value_optimal.threshold),
        ),
        Recommendation::new(
            "Low-Value Threshold",
            format!("{:.2}", comparison.low_value_optimal.threshold),
        ),
    ]
}

pub fn recommendations_frame(rows: &[Recommendation]) -> PolarsResult<DataFrame> {
    let metrics: Vec<&str> = rows.iter().map(|r| r.metric).collect();
    let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
    DataFrame::new(vec![Series::new("Metric", metrics), Series::new("Value", values)])
}

pub fn contact_list_frame(contacts: &[ContactEntry]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = contacts.iter().map(|c| c.customer_id.as_str()).collect();
    let segments: Vec<&str> = contacts.iter().map(|c| c.segment.label()).collect();
    let charges: Vec<f64> = contacts.iter().map(|c| c.monthly_charge).collect();
    let proba: Vec<f64> = contacts.iter().map(|c| c.churn_probability).collect();

    DataFrame::new(vec![
        Series::new("customerID", ids),
        Series::new("value_segment", segments),
        Series::new("MonthlyCharges", charges),
        Series::new("churn_probability", proba),
    ])
}

/// Write a frame as a headed CSV file
pub fn write_csv(frame: &mut DataFrame, path: &Path) -> crate::Result<()> {
    let mut file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", path.display(), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)?;
    log::debug!("Wrote {} rows to {}", frame.height(), path.display());
    Ok(())
}

pub fn write_sweep(sweep: &SweepTable, path: &Path) -> crate::Result<()> {
    let mut frame = sweep.to_frame()?;
    write_csv(&mut frame, path)
}

/// Paths of every artifact written by one pipeline run
#[derive(Debug, Clone, Default)]
pub struct WrittenReports {
    pub files: Vec<PathBuf>,
}

impl WrittenReports {
    pub fn sweep(&mut self, sweep: &SweepTable, path: PathBuf) -> crate::Result<()> {
        write_sweep(sweep, &path)?;
        self.files.push(path);
        Ok(())
    }

    pub fn frame(&mut self, mut frame: DataFrame, path: PathBuf) -> crate::Result<()> {
        write_csv(&mut frame, &path)?;
        self.files.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdGrid;
    use crate::cost::build_cost_matrix;
    use crate::metrics::PredictionSet;
    use crate::segment::ValueSegment;
    use crate::sweep::{threshold_sweep, SWEEP_COLUMNS};
    use tempfile::tempdir;

    fn read_back(path: &Path) -> DataFrame {
        LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .unwrap()
            .collect()
            .unwrap()
    }

    #[test]
    fn test_sweep_file_name() {
        assert_eq!(sweep_file_name("lr"), "lr_threshold_sweep.csv");
        assert_eq!(sweep_file_name("RF"), "rf_threshold_sweep.csv");
        assert_eq!(
            sweep_file_name("Logistic Regression"),
            "logistic_regression_threshold_sweep.csv"
        );
        assert_eq!(sweep_file_name("  RF (v2) "), "rf_v2_threshold_sweep.csv");
        assert_eq!(sweep_file_name("--"), "model_threshold_sweep.csv");
    }

    #[test]
    fn test_write_sweep() {
        let predictions =
            PredictionSet::new(vec![1, 0, 1, 0, 1], vec![0.9, 0.2, 0.6, 0.4, 0.8]).unwrap();
        let matrix = build_cost_matrix(1200.0, 50.0, 0.25).unwrap();
        let sweep = threshold_sweep(&predictions, &matrix, &ThresholdGrid::default()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("sweep.csv");
        write_sweep(&sweep, &path).unwrap();

        let frame = read_back(&path);
        assert_eq!(frame.height(), 17);
        assert_eq!(frame.get_column_names(), SWEEP_COLUMNS.to_vec());
    }

    #[test]
    fn test_write_contact_list() {
        let contacts = vec![ContactEntry {
            customer_id: "9237-HQITU".to_string(),
            segment: ValueSegment::HighValue,
            monthly_charge: 70.7,
            churn_probability: 0.81,
        }];

        let dir = tempdir().unwrap();
        let path = dir.path().join(CONTACT_LIST_FILE);
        let mut reports = WrittenReports::default();
        reports
            .frame(contact_list_frame(&contacts).unwrap(), path.clone())
            .unwrap();

        assert_eq!(reports.files, vec![path.clone()]);
        let frame = read_back(&path);
        assert_eq!(
            frame.get_column_names(),
            vec!["customerID", "value_segment", "MonthlyCharges", "churn_probability"]
        );
    }
}
