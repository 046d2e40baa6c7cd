//! Loading scored customer tables using Polars

use crate::error::{RoiError, RoiResult};
use crate::metrics::PredictionSet;
use polars::prelude::*;
use std::path::Path;

/// Names of the required columns in a customer table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Row identifier
    pub id: String,
    /// Monthly charge used for CLV and value segments
    pub charge: String,
    /// Churn label, Yes/No or 0/1
    pub label: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            id: "customerID".to_string(),
            charge: "MonthlyCharges".to_string(),
            label: "Churn".to_string(),
        }
    }
}

/// Customer table with the required columns extracted
#[derive(Debug, Clone)]
pub struct CustomerTable {
    /// Full table as loaded
    pub frame: DataFrame,
    pub customer_ids: Vec<String>,
    pub monthly_charges: Vec<f64>,
    /// 1 for churners, 0 otherwise
    pub labels: Vec<u8>,
    pub columns: ColumnSpec,
}

impl CustomerTable {
    /// Extract required columns from an already loaded frame
    pub fn from_frame(frame: DataFrame, columns: ColumnSpec) -> RoiResult<Self> {
        if frame.height() == 0 {
            return Err(RoiError::invalid("customer table has no rows"));
        }

        let customer_ids = string_column(&frame, &columns.id)?;
        let monthly_charges = numeric_column(&frame, &columns.charge)?;
        let labels = churn_labels(&frame, &columns.label)?;

        Ok(Self {
            frame,
            customer_ids,
            monthly_charges,
            labels,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.customer_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customer_ids.is_empty()
    }

    /// Churn labels paired with the scores in `proba_column`
    pub fn predictions(&self, proba_column: &str) -> RoiResult<PredictionSet> {
        let proba = numeric_column(&self.frame, proba_column)?;
        PredictionSet::new(self.labels.clone(), proba)
    }
}

/// Load a scored customer CSV
///
/// # Arguments
/// * `file_path` - Path to the CSV file
/// * `columns` - Names of the id, charge and label columns
/// * `proba_columns` - Probability columns that must be present
///
/// # Returns
/// * `CustomerTable` with the required columns validated
pub fn load_customer_table(
    file_path: &Path,
    columns: ColumnSpec,
    proba_columns: &[&str],
) -> crate::Result<CustomerTable> {
    let frame = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .finish()?
        .collect()?;

    if frame.height() == 0 {
        anyhow::bail!("No rows found in {}", file_path.display());
    }

    for name in proba_columns {
        // Validated up front so a bad column name fails before any sweep runs
        numeric_column(&frame, name)?;
    }

    let table = CustomerTable::from_frame(frame, columns)?;
    log::debug!(
        "Loaded {} customers from {}",
        table.len(),
        file_path.display()
    );
    Ok(table)
}

/// Values of a numeric column as `f64`; nulls and unparseable values are an error
pub fn numeric_column(frame: &DataFrame, name: &str) -> RoiResult<Vec<f64>> {
    let raw = frame.column(name)?;
    let missing = raw.is_null();
    let series = raw.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .zip(&missing)
        .enumerate()
        .map(|(row, (value, was_null))| match value {
            Some(v) => Ok(v),
            None if was_null.unwrap_or(true) => Err(RoiError::invalid(format!(
                "column {} has a missing value at row {}",
                name, row
            ))),
            // Non-strict cast turns unparseable text into null
            None => Err(RoiError::invalid(format!(
                "column {} has a non-numeric value {} at row {}",
                name,
                raw.get(row).map(|v| v.to_string()).unwrap_or_default(),
                row
            ))),
        })
        .collect()
}

/// Values of any column rendered as strings; nulls are an error
pub fn string_column(frame: &DataFrame, name: &str) -> RoiResult<Vec<String>> {
    let series = frame.column(name)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(str::to_string).ok_or_else(|| {
                RoiError::invalid(format!("column {} has a missing value at row {}", name, row))
            })
        })
        .collect()
}

fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(1),
        "no" | "n" | "false" | "0" => Some(0),
        _ => None,
    }
}

/// Churn labels as 0/1 from a Yes/No, boolean or integer column
pub fn churn_labels(frame: &DataFrame, name: &str) -> RoiResult<Vec<u8>> {
    string_column(frame, name)?
        .iter()
        .enumerate()
        .map(|(row, raw)| {
            parse_label(raw).ok_or_else(|| {
                RoiError::invalid(format!(
                    "column {} has unrecognised churn label '{}' at row {}",
                    name, raw, row
                ))
            })
        })
        .collect()
}
