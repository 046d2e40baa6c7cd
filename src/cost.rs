//! Customer lifetime value and the net-value cost matrix

use crate::error::{RoiError, RoiResult};

/// Net value of each confusion-matrix outcome for one population.
///
/// Built once and never mutated. Segment variants are separate values made by
/// [`CostMatrix::with_clv`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostMatrix {
    /// Customer lifetime value
    pub clv: f64,
    /// Cost per contacted customer
    pub retention_cost: f64,
    /// Probability that an offer saves an at-risk customer
    pub retention_success_rate: f64,
    /// Correctly flagged churner: saved value minus offer cost
    pub tp: f64,
    /// Wrongly flagged non-churner: wasted offer cost
    pub fp: f64,
    /// Missed churner: value that could have been saved
    pub fn_: f64,
    /// Correctly ignored non-churner
    pub tn: f64,
}

impl CostMatrix {
    /// Copy of this matrix with a different CLV. Only the CLV-dependent
    /// outcomes (`tp`, `fn_`) change.
    pub fn with_clv(&self, clv: f64) -> Self {
        Self {
            clv,
            tp: clv * self.retention_success_rate - self.retention_cost,
            fn_: -(clv * self.retention_success_rate),
            ..*self
        }
    }

    /// Revenue expected from saving one churner
    pub fn saved_value(&self) -> f64 {
        self.clv * self.retention_success_rate
    }
}

/// CLV = mean(charges) * horizon_months
pub fn calculate_clv(charges: &[f64], horizon_months: u32) -> RoiResult<f64> {
    if charges.is_empty() {
        return Err(RoiError::invalid("cannot compute CLV of an empty charge list"));
    }
    if horizon_months == 0 {
        return Err(RoiError::invalid("horizon_months must be positive"));
    }

    let mean = charges.iter().sum::<f64>() / charges.len() as f64;
    Ok(mean * f64::from(horizon_months))
}

/// Build the cost matrix for a population with the given CLV
pub fn build_cost_matrix(
    clv: f64,
    retention_cost: f64,
    retention_success_rate: f64,
) -> RoiResult<CostMatrix> {
    if !clv.is_finite() {
        return Err(RoiError::invalid(format!("CLV must be finite, got {}", clv)));
    }
    if !(retention_cost.is_finite() && retention_cost >= 0.0) {
        return Err(RoiError::invalid(format!(
            "retention cost must be non-negative, got {}",
            retention_cost
        )));
    }
    if !(0.0..=1.0).contains(&retention_success_rate) {
        return Err(RoiError::invalid(format!(
            "retention success rate must lie in [0, 1], got {}",
            retention_success_rate
        )));
    }

    Ok(CostMatrix {
        clv,
        retention_cost,
        retention_success_rate,
        tp: clv * retention_success_rate - retention_cost,
        fp: -retention_cost,
        fn_: -(clv * retention_success_rate),
        tn: 0.0,
    })
}
