//! churnroi: turning churn probabilities into retention decisions
//!
//! This library builds a net-value cost matrix from customer lifetime value,
//! evaluates business metrics across a grid of classification thresholds,
//! selects the most profitable threshold and model, and compares a single
//! shared threshold against value-segment-specific thresholds.

pub mod cli;
pub mod config;
pub mod cost;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod segment;
pub mod selection;
pub mod sweep;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{AnalysisConfig, ThresholdGrid};
pub use cost::{build_cost_matrix, calculate_clv, CostMatrix};
pub use data::{load_customer_table, ColumnSpec, CustomerTable};
pub use error::{RoiError, RoiResult};
pub use metrics::{
    calculate_business_metrics, evaluate_threshold, BusinessMetricsRecord, PredictionSet,
};
pub use segment::{
    compare_strategies, contact_list, create_value_segments, segment_clv, segment_cost_matrix,
    segment_sweep, summarize_segment, SegmentSweep, SegmentedPopulation, StrategyComparison,
    ValueSegment,
};
pub use selection::{compare_models, ModelChoice, ModelSelection, ModelSweep};
pub use sweep::{find_optimal, find_optimal_by_name, threshold_sweep, Metric, SweepTable};

/// Common result type used by the loading and reporting layers
pub type Result<T> = anyhow::Result<T>;
