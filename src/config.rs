//! Evaluation configuration.

use serde::{Deserialize, Serialize};

use crate::matching::MatchingStrategy;
use crate::{Error, Result};

/// Default minimum IoU (exclusive) for an optimal-strategy match.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// Default `(x, y, w, h)` distance tolerance for the nearest-key strategy.
pub const DEFAULT_KEY_TOLERANCE: f64 = 1e-6;

/// Configuration for an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// A pair is viable only when its IoU is strictly greater than this.
    pub iou_threshold: f64,

    /// Matching policy.
    pub strategy: MatchingStrategy,

    /// Maximum `(x, y, w, h)` Euclidean distance for a nearest-key match.
    pub key_tolerance: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            strategy: MatchingStrategy::default(),
            key_tolerance: DEFAULT_KEY_TOLERANCE,
        }
    }
}

impl EvalConfig {
    /// Create a configuration with the given IoU threshold and default
    /// strategy.
    pub fn new(iou_threshold: f64) -> Self {
        Self {
            iou_threshold,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_key_tolerance(mut self, key_tolerance: f64) -> Self {
        self.key_tolerance = key_tolerance;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.iou_threshold) {
            return Err(Error::InvalidConfig(format!(
                "iou_threshold must be in [0, 1), got {}",
                self.iou_threshold
            )));
        }

        if !self.key_tolerance.is_finite() || self.key_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "key_tolerance must be finite and non-negative, got {}",
                self.key_tolerance
            )));
        }

        Ok(())
    }
}
