//! Model selection by maximum Net ROI

use crate::error::RoiResult;
use crate::metrics::BusinessMetricsRecord;
use crate::sweep::{find_optimal, Metric, SweepTable};

/// A named model together with its threshold sweep
#[derive(Debug, Clone)]
pub struct ModelSweep {
    pub name: String,
    pub sweep: SweepTable,
}

impl ModelSweep {
    pub fn new(name: impl Into<String>, sweep: SweepTable) -> Self {
        Self {
            name: name.into(),
            sweep,
        }
    }
}

/// Which argument of [`compare_models`] was recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    First,
    Second,
}

/// Recommended model and its operating point
#[derive(Debug, Clone, Copy)]
pub struct ModelSelection<'a> {
    pub choice: ModelChoice,
    pub model: &'a str,
    pub threshold: f64,
    pub roi: f64,
    pub sweep: &'a SweepTable,
    pub optimal: BusinessMetricsRecord,
}

/// Pick the model with the higher maximum Net ROI.
///
/// `first` is chosen only when its maximum is strictly greater; an exact tie
/// goes to `second`.
pub fn compare_models<'a>(
    first: &'a ModelSweep,
    second: &'a ModelSweep,
) -> RoiResult<ModelSelection<'a>> {
    let first_optimal = find_optimal(&first.sweep, Metric::NetRoi)?;
    let second_optimal = find_optimal(&second.sweep, Metric::NetRoi)?;

    let (choice, winner, optimal, other) = if first_optimal.net_roi > second_optimal.net_roi {
        (ModelChoice::First, first, first_optimal, second)
    } else {
        (ModelChoice::Second, second, second_optimal, first)
    };

    log::info!(
        "Selected {} (threshold {:.2}, net ROI {:.2}) over {}",
        winner.name,
        optimal.threshold,
        optimal.net_roi,
        other.name
    );

    Ok(ModelSelection {
        choice,
        model: &winner.name,
        threshold: optimal.threshold,
        roi: optimal.net_roi,
        sweep: &winner.sweep,
        optimal,
    })
}
