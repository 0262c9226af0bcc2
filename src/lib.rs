//! # trackeval - Identity-preserving tracker evaluation
//!
//! Compares a predicted multi-object tracking sequence against ground truth
//! and reports how well object identities were preserved.
//!
//! ## Pipeline
//!
//! - Per frame, ground-truth and predicted boxes are paired by an explicitly
//!   chosen [`MatchingStrategy`]: optimal IoU assignment (Hungarian) or
//!   nearest-key lookup for frozen fixtures
//! - Accepted matches feed a write-once [`IdentityMap`]; a ground-truth object
//!   later matched to a different predicted id is an identity switch
//! - Misses, false positives and switches are accumulated into a
//!   [`RunSummary`] with a zero-defect PASS/FAIL verdict
//!
//! ## Example
//!
//! ```rust
//! use trackeval::{EvalConfig, Evaluator, FrameRecord, TrackRecord};
//!
//! let gt: Vec<FrameRecord> = [5, 5, 7]
//!     .iter()
//!     .map(|_| FrameRecord::new(vec![TrackRecord::new(1, 0.1, 0.1, 0.1, 0.1)]))
//!     .collect();
//! let pred: Vec<FrameRecord> = [5, 5, 7]
//!     .iter()
//!     .map(|&id| FrameRecord::new(vec![TrackRecord::new(id, 0.1, 0.1, 0.1, 0.1)]))
//!     .collect();
//!
//! let evaluator = Evaluator::new(EvalConfig::default()).unwrap();
//! let summary = evaluator.evaluate(&gt, &pred).unwrap();
//! assert_eq!(summary.num_switches, 1);
//! assert!(!summary.passed());
//! ```

// Internal modules (ports of scipy)
pub(crate) mod internal;

// Public modules
pub mod config;
pub mod geometry;
pub mod identity;
pub mod matching;
pub mod metrics;

// Re-exports for convenience
pub use config::EvalConfig;
pub use geometry::{overlap, BoundingBox};
pub use identity::{IdentityMap, IdentityTracker, Observation, TrackId};
pub use internal::scipy::{assignment_cost, linear_sum_assignment, Assignment};
pub use matching::{strategy_by_name, FrameMatch, FrameMatcher, Match, MatchingStrategy};
pub use metrics::{
    evaluate_files, load_frames, Evaluator, FrameRecord, MOTAccumulator, RunSummary,
    TrackRecord, Verdict,
};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while evaluating tracks
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid input: {0}")]
        InvalidInput(String),

        #[error("Frame count mismatch: ground truth has {ground_truth} frames, predictions have {predicted}")]
        FrameCountMismatch { ground_truth: usize, predicted: usize },

        #[error("Invalid cost matrix: {0}")]
        InvalidCostMatrix(String),

        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for trackeval operations
    pub type Result<T> = std::result::Result<T, Error>;
}
