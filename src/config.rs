//! Analysis configuration: threshold grid and business assumptions
//!
//! Every operation that needs a grid, a horizon or a cost assumption takes it
//! from an explicit [`AnalysisConfig`] value. Values can come from a TOML file
//! and are overridden field by field from the command line.

use crate::error::{RoiError, RoiResult};
use serde::Deserialize;
use std::path::Path;

/// Slack used when counting grid points, so that `(end - start) / step`
/// landing a hair above an integer does not add a point at `end`.
const GRID_EPSILON: f64 = 1e-9;

/// Upper bound on the number of thresholds in one sweep
pub const MAX_GRID_POINTS: usize = 10_000;

/// Half-open threshold grid `[start, end)` stepped by `step`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThresholdGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self {
            start: 0.1,
            end: 0.95,
            step: 0.05,
        }
    }
}

impl ThresholdGrid {
    pub fn new(start: f64, end: f64, step: f64) -> RoiResult<Self> {
        let grid = Self { start, end, step };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> RoiResult<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(RoiError::invalid(format!(
                "grid step must be positive, got {}",
                self.step
            )));
        }
        if !(0.0..=1.0).contains(&self.start) {
            return Err(RoiError::invalid(format!(
                "grid start must lie in [0, 1], got {}",
                self.start
            )));
        }
        if !(self.end.is_finite() && self.end > self.start) {
            return Err(RoiError::invalid(format!(
                "grid end ({}) must be greater than start ({})",
                self.end, self.start
            )));
        }

        let points = (self.end - self.start) / self.step;
        if points > MAX_GRID_POINTS as f64 {
            return Err(RoiError::invalid(format!(
                "grid step {} gives more than {} thresholds",
                self.step, MAX_GRID_POINTS
            )));
        }
        let n = self.len();
        if n == 0 {
            return Err(RoiError::invalid(format!(
                "grid [{}, {}) with step {} has no thresholds",
                self.start, self.end, self.step
            )));
        }
        let last = self.threshold_at(n - 1);
        if last > 1.0 {
            return Err(RoiError::invalid(format!(
                "last grid threshold {} lies above 1",
                last
            )));
        }
        Ok(())
    }

    /// Number of grid points in `[start, end)`.
    pub fn len(&self) -> usize {
        let raw = (self.end - self.start) / self.step;
        (raw - GRID_EPSILON).ceil().max(0.0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Threshold at grid index `i`, computed as `start + i * step`.
    pub fn threshold_at(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }

    /// All thresholds, ascending.
    pub fn thresholds(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.threshold_at(i)).collect()
    }
}

/// Business assumptions plus the threshold grid for one analysis run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub grid: ThresholdGrid,
    /// Assumed remaining customer lifetime in months
    pub horizon_months: u32,
    /// Cost per contacted customer
    pub retention_cost: f64,
    /// Probability that an offer saves an at-risk customer
    pub retention_success_rate: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid: ThresholdGrid::default(),
            horizon_months: 24,
            retention_cost: 50.0,
            retention_success_rate: 0.25,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> RoiResult<()> {
        self.grid.validate()?;
        if self.horizon_months == 0 {
            return Err(RoiError::invalid("horizon_months must be positive"));
        }
        if !(self.retention_cost.is_finite() && self.retention_cost >= 0.0) {
            return Err(RoiError::invalid(format!(
                "retention_cost must be non-negative, got {}",
                self.retention_cost
            )));
        }
        if !(0.0..=1.0).contains(&self.retention_success_rate) {
            return Err(RoiError::invalid(format!(
                "retention_success_rate must lie in [0, 1], got {}",
                self.retention_success_rate
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let config: AnalysisConfig = toml::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse analysis config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded analysis config from {}", path.display());
        Ok(config)
    }
}
