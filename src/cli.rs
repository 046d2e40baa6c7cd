//! Command-line interface definitions and argument parsing

use crate::config::AnalysisConfig;
use crate::data::ColumnSpec;
use clap::Parser;
use std::path::PathBuf;

/// Churn retention ROI analysis: threshold sweeps, model selection and
/// value-segment strategies over a scored customer table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the scored customer CSV file
    #[arg(short, long, default_value = "churn_scored.csv")]
    pub input: PathBuf,

    /// Directory the report CSV files are written to
    #[arg(short, long, default_value = "reports")]
    pub output_dir: PathBuf,

    /// Optional TOML file with analysis assumptions
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Customer identifier column
    #[arg(long, default_value = "customerID")]
    pub id_column: String,

    /// Monthly charge column
    #[arg(long, default_value = "MonthlyCharges")]
    pub charge_column: String,

    /// Churn label column (Yes/No or 0/1)
    #[arg(long, default_value = "Churn")]
    pub label_column: String,

    /// Probability column of the first model
    #[arg(long, default_value = "lr_proba")]
    pub model_a_column: String,

    /// Display name of the first model
    #[arg(long, default_value = "Logistic Regression")]
    pub model_a_name: String,

    /// Short key naming the first model's sweep file (`<key>_threshold_sweep.csv`)
    #[arg(long, default_value = "lr")]
    pub model_a_key: String,

    /// Probability column of the second model (wins exact ROI ties)
    #[arg(long, default_value = "rf_proba")]
    pub model_b_column: String,

    /// Display name of the second model
    #[arg(long, default_value = "Random Forest")]
    pub model_b_name: String,

    /// Short key naming the second model's sweep file
    #[arg(long, default_value = "rf")]
    pub model_b_key: String,

    /// Assumed remaining customer lifetime in months
    #[arg(long)]
    pub horizon_months: Option<u32>,

    /// Cost per contacted customer
    #[arg(long)]
    pub retention_cost: Option<f64>,

    /// Probability that an offer saves an at-risk customer
    #[arg(long)]
    pub retention_success_rate: Option<f64>,

    /// First threshold of the sweep grid
    #[arg(long)]
    pub start: Option<f64>,

    /// Exclusive upper bound of the sweep grid
    #[arg(long)]
    pub end: Option<f64>,

    /// Sweep grid step
    #[arg(long)]
    pub step: Option<f64>,

    /// Number of customers kept in the contact list
    #[arg(long, default_value = "100")]
    pub top_n: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Configuration from the optional file with command-line overrides applied
    pub fn analysis_config(&self) -> crate::Result<AnalysisConfig> {
        let base = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        let config = self.apply_overrides(base);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(horizon) = self.horizon_months {
            config.horizon_months = horizon;
        }
        if let Some(cost) = self.retention_cost {
            config.retention_cost = cost;
        }
        if let Some(rate) = self.retention_success_rate {
            config.retention_success_rate = rate;
        }
        if let Some(start) = self.start {
            config.grid.start = start;
        }
        if let Some(end) = self.end {
            config.grid.end = end;
        }
        if let Some(step) = self.step {
            config.grid.step = step;
        }
        config
    }

    pub fn column_spec(&self) -> ColumnSpec {
        ColumnSpec {
            id: self.id_column.clone(),
            charge: self.charge_column.clone(),
            label: self.label_column.clone(),
        }
    }
}
