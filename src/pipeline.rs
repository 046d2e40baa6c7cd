//! Batch report pipeline: scored customer table in, decision CSV files out

use crate::cli::Args;
use crate::cost::{build_cost_matrix, calculate_clv};
use crate::data::load_customer_table;
use crate::report::{self, Recommendation, WrittenReports};
use crate::segment::{
    compare_strategies, contact_list, create_value_segments, segment_sweep, summarize_segment,
    StrategyComparison, ValueSegment,
};
use crate::selection::{compare_models, ModelChoice, ModelSweep};
use crate::sweep::threshold_sweep;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Instant;

/// What one pipeline run decided and wrote
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub recommended_model: String,
    pub optimal_threshold: f64,
    pub net_roi: f64,
    pub comparison: StrategyComparison,
    pub recommendations: Vec<Recommendation>,
    pub files: Vec<PathBuf>,
}

/// Run the full analysis described by `args`
pub fn run(args: &Args) -> crate::Result<PipelineOutcome> {
    let start_time = Instant::now();
    let config = args.analysis_config()?;
    log::debug!("Analysis config: {:?}", config);

    // Step 1: Load data
    let data_start = Instant::now();
    let table = load_customer_table(
        &args.input,
        args.column_spec(),
        &[args.model_a_column.as_str(), args.model_b_column.as_str()],
    )
    .with_context(|| format!("loading {}", args.input.display()))?;
    log::info!(
        "Loaded {} customers in {:.2}s",
        table.len(),
        data_start.elapsed().as_secs_f64()
    );

    // Step 2: Cost matrix
    let clv = calculate_clv(&table.monthly_charges, config.horizon_months)?;
    let cost_matrix =
        build_cost_matrix(clv, config.retention_cost, config.retention_success_rate)?;
    log::info!(
        "CLV {:.2}; net value TP {:.2}, FP {:.2}, FN {:.2}",
        cost_matrix.clv,
        cost_matrix.tp,
        cost_matrix.fp,
        cost_matrix.fn_
    );

    // Step 3: Sweep both models and select one
    let sweep_start = Instant::now();
    let predictions_a = table.predictions(&args.model_a_column)?;
    let predictions_b = table.predictions(&args.model_b_column)?;
    let model_a = ModelSweep::new(
        args.model_a_name.clone(),
        threshold_sweep(&predictions_a, &cost_matrix, &config.grid)?,
    );
    let model_b = ModelSweep::new(
        args.model_b_name.clone(),
        threshold_sweep(&predictions_b, &cost_matrix, &config.grid)?,
    );
    let selection = compare_models(&model_a, &model_b)?;
    log::info!(
        "Recommended model: {} at threshold {:.2}, net ROI {:.2} ({} customers contacted)",
        selection.model,
        selection.threshold,
        selection.roi,
        selection.optimal.customers_contacted
    );
    log::debug!(
        "Sweeps finished in {:.2}s",
        sweep_start.elapsed().as_secs_f64()
    );

    // Step 4: Value segments on the recommended model's scores
    let predictions = match selection.choice {
        ModelChoice::First => &predictions_a,
        ModelChoice::Second => &predictions_b,
    };
    let population = create_value_segments(&table.frame, &table.columns.charge)?;
    let high_value = segment_sweep(
        predictions,
        &population,
        ValueSegment::HighValue,
        &cost_matrix,
        &config,
    )?;
    let low_value = segment_sweep(
        predictions,
        &population,
        ValueSegment::LowValue,
        &cost_matrix,
        &config,
    )?;
    for segment in [ValueSegment::HighValue, ValueSegment::LowValue] {
        let summary =
            summarize_segment(&population, predictions, segment, config.horizon_months)?;
        log::info!(
            "{}: {} customers, churn rate {:.1}%, avg charge {:.2}, CLV {:.2}",
            summary.segment,
            summary.count,
            summary.churn_rate * 100.0,
            summary.avg_charge,
            summary.clv
        );
    }

    // Step 5: Single vs segment-specific thresholds
    let comparison =
        compare_strategies(&high_value.sweep, &low_value.sweep, selection.threshold)?;
    log::info!(
        "Net ROI single {:.2} vs segmented {:.2} (improvement {:.2})",
        comparison.single_total_roi,
        comparison.segment_total_roi,
        comparison.improvement
    );

    // Step 6: Write reports
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let out = |name: &str| args.output_dir.join(name);
    let mut reports = WrittenReports::default();

    reports.sweep(&model_a.sweep, out(&report::sweep_file_name(&args.model_a_key)))?;
    reports.sweep(&model_b.sweep, out(&report::sweep_file_name(&args.model_b_key)))?;
    reports.sweep(&high_value.sweep, out(report::HIGH_VALUE_SWEEP_FILE))?;
    reports.sweep(&low_value.sweep, out(report::LOW_VALUE_SWEEP_FILE))?;

    let recommendations = report::build_recommendations(
        &selection,
        &cost_matrix,
        &high_value,
        &low_value,
        &comparison,
        population.charge_median,
    );
    reports.frame(
        report::recommendations_frame(&recommendations)?,
        out(report::RECOMMENDATIONS_FILE),
    )?;

    let contacts = contact_list(
        &table.customer_ids,
        &population,
        predictions,
        selection.threshold,
        args.top_n,
    )?;
    reports.frame(
        report::contact_list_frame(&contacts)?,
        out(report::CONTACT_LIST_FILE),
    )?;

    for path in &reports.files {
        log::info!("Wrote {}", path.display());
    }
    log::info!(
        "Pipeline complete in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(PipelineOutcome {
        recommended_model: selection.model.to_string(),
        optimal_threshold: selection.threshold,
        net_roi: selection.roi,
        comparison,
        recommendations,
        files: reports.files,
    })
}
