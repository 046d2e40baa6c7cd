//! Business metrics for a single classification threshold

use crate::cost::CostMatrix;
use crate::error::{RoiError, RoiResult};
use ndarray::{Array1, Axis};

/// True churn labels and model scores, one pair per customer
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSet {
    y_true: Array1<u8>,
    y_proba: Array1<f64>,
}

impl PredictionSet {
    /// Validate and wrap labels and probabilities.
    ///
    /// Both sequences must be non-empty and of equal length, labels must be
    /// 0 or 1, and probabilities must lie in [0, 1].
    pub fn new(y_true: Vec<u8>, y_proba: Vec<f64>) -> RoiResult<Self> {
        if y_true.is_empty() || y_proba.is_empty() {
            return Err(RoiError::invalid("labels and probabilities must be non-empty"));
        }
        if y_true.len() != y_proba.len() {
            return Err(RoiError::invalid(format!(
                "label length {} != probability length {}",
                y_true.len(),
                y_proba.len()
            )));
        }
        if let Some(label) = y_true.iter().find(|&&l| l > 1) {
            return Err(RoiError::invalid(format!("label must be 0 or 1, got {}", label)));
        }
        if let Some(p) = y_proba.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(RoiError::invalid(format!(
                "probability must lie in [0, 1], got {}",
                p
            )));
        }

        Ok(Self {
            y_true: Array1::from(y_true),
            y_proba: Array1::from(y_proba),
        })
    }

    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }

    pub fn y_true(&self) -> &Array1<u8> {
        &self.y_true
    }

    pub fn y_proba(&self) -> &Array1<f64> {
        &self.y_proba
    }

    /// Number of actual churners
    pub fn positives(&self) -> usize {
        self.y_true.iter().filter(|&&l| l == 1).count()
    }

    /// Rows at the given indices, in the given order
    pub fn select(&self, indices: &[usize]) -> RoiResult<Self> {
        if indices.is_empty() {
            return Err(RoiError::invalid("cannot select an empty prediction subset"));
        }
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(RoiError::invalid(format!(
                "row index {} out of bounds for {} predictions",
                i,
                self.len()
            )));
        }

        Ok(Self {
            y_true: self.y_true.select(Axis(0), indices),
            y_proba: self.y_proba.select(Axis(0), indices),
        })
    }
}

/// Business outcome of contacting every customer scored at or above one
/// threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusinessMetricsRecord {
    pub threshold: f64,
    pub customers_contacted: u64,
    pub tp: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tn: u64,
    pub precision: f64,
    pub recall: f64,
    pub retention_cost: f64,
    pub revenue_saved: f64,
    /// Value lost on missed churners. Reported, not part of `net_roi`.
    pub opportunity_cost: f64,
    pub net_roi: f64,
}

impl BusinessMetricsRecord {
    /// Total number of customers evaluated
    pub fn population(&self) -> u64 {
        self.tp + self.fp + self.fn_ + self.tn
    }
}

/// Evaluate one threshold against a prediction set.
///
/// A customer is contacted when `proba >= threshold`.
pub fn evaluate_threshold(
    predictions: &PredictionSet,
    threshold: f64,
    cost_matrix: &CostMatrix,
) -> RoiResult<BusinessMetricsRecord> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(RoiError::invalid(format!(
            "threshold must lie in [0, 1], got {}",
            threshold
        )));
    }

    let (mut tp, mut fp, mut fn_, mut tn) = (0u64, 0u64, 0u64, 0u64);
    for (&label, &proba) in predictions.y_true.iter().zip(predictions.y_proba.iter()) {
        match (label == 1, proba >= threshold) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => tn += 1,
        }
    }

    let customers_contacted = tp + fp;
    let retention_cost = customers_contacted as f64 * cost_matrix.retention_cost;
    let revenue_saved =
        tp as f64 * cost_matrix.retention_success_rate * cost_matrix.clv;
    let opportunity_cost =
        fn_ as f64 * cost_matrix.retention_success_rate * cost_matrix.clv;

    let precision = if customers_contacted > 0 {
        tp as f64 / customers_contacted as f64
    } else {
        0.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };

    Ok(BusinessMetricsRecord {
        threshold,
        customers_contacted,
        tp,
        fp,
        fn_,
        tn,
        precision,
        recall,
        retention_cost,
        revenue_saved,
        opportunity_cost,
        net_roi: revenue_saved - retention_cost,
    })
}

/// Convenience wrapper over raw label and probability slices
pub fn calculate_business_metrics(
    y_true: &[u8],
    y_proba: &[f64],
    threshold: f64,
    cost_matrix: &CostMatrix,
) -> RoiResult<BusinessMetricsRecord> {
    let predictions = PredictionSet::new(y_true.to_vec(), y_proba.to_vec())?;
    evaluate_threshold(&predictions, threshold, cost_matrix)
}
