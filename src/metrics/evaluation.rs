//! Sequence evaluation and reporting.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::accumulator::{FrameStats, MOTAccumulator};
use super::frames::{load_frames, validate_frames, FrameRecord};
use crate::config::EvalConfig;
use crate::matching::{FrameMatcher, MatchingStrategy};
use crate::{Error, Result};

/// Zero-defect verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

/// Result of evaluating one prediction sequence against ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub strategy: MatchingStrategy,
    pub frames_compared: usize,
    pub num_matches: usize,
    pub num_misses: usize,
    pub num_false_positives: usize,
    pub num_switches: usize,
    /// Distinct ground-truth objects matched at least once
    pub num_gt_ids_matched: usize,
    /// Multi-Object Tracking Accuracy
    pub mota: f64,
    /// Multi-Object Tracking Precision (mean IoU of matches)
    pub motp: f64,
    pub precision: f64,
    pub recall: f64,
    /// Per-frame breakdown
    pub frames: Vec<FrameStats>,
}

impl RunSummary {
    /// PASS iff there are no misses, no false positives and no switches.
    pub fn verdict(&self) -> Verdict {
        if self.num_misses == 0 && self.num_false_positives == 0 && self.num_switches == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    /// Frames with at least one miss, false positive or switch.
    pub fn defect_frames(&self) -> Vec<&FrameStats> {
        self.frames.iter().filter(|f| !f.is_clean()).collect()
    }

    /// Human-readable report. `verbose` appends the defective frames.
    pub fn report(&self, verbose: bool) -> String {
        let mut out = String::new();
        out.push_str("Comparison Results:\n");
        out.push_str(&format!("  strategy:          {}\n", self.strategy));
        out.push_str(&format!("  frames_compared:   {}\n", self.frames_compared));
        out.push_str(&format!("  matches:           {}\n", self.num_matches));
        out.push_str(&format!("  misses:            {}\n", self.num_misses));
        out.push_str(&format!("  false_positives:   {}\n", self.num_false_positives));
        out.push_str(&format!("  id_switches:       {}\n", self.num_switches));
        out.push_str(&format!("  gt_ids_matched:    {}\n", self.num_gt_ids_matched));
        out.push_str(&format!(
            "  mota: {:.4}  motp: {:.4}  precision: {:.4}  recall: {:.4}\n",
            self.mota, self.motp, self.precision, self.recall
        ));

        if verbose {
            let defects = self.defect_frames();
            if !defects.is_empty() {
                out.push_str("Defective frames:\n");
                for f in defects {
                    out.push_str(&format!(
                        "  frame {:>5}: matches={} misses={} false_positives={} switches={}\n",
                        f.frame, f.matches, f.misses, f.false_positives, f.switches
                    ));
                }
            }
        }

        out.push_str(&format!("TEST {}\n", self.verdict()));
        out
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report(false))
    }
}

/// Runs frame matching, identity tracking and aggregation over a pair of
/// sequences.
///
/// Each call to [`Evaluator::evaluate`] starts from fresh state, so repeated
/// runs on identical inputs give identical summaries.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvalConfig,
    matcher: FrameMatcher,
}

impl Evaluator {
    /// Create an evaluator after validating the configuration.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        let matcher = FrameMatcher::new(&config);
        Ok(Self { config, matcher })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate `predicted` against `ground_truth`, frame by frame.
    ///
    /// All input checks (frame counts, box geometry, ground-truth ids) run
    /// before the first frame is compared, so an input error never yields a
    /// partial summary.
    pub fn evaluate(
        &self,
        ground_truth: &[FrameRecord],
        predicted: &[FrameRecord],
    ) -> Result<RunSummary> {
        if ground_truth.len() != predicted.len() {
            return Err(Error::FrameCountMismatch {
                ground_truth: ground_truth.len(),
                predicted: predicted.len(),
            });
        }
        validate_frames(ground_truth, "ground truth", true)?;
        validate_frames(predicted, "predicted", false)?;

        let anonymous = predicted
            .iter()
            .flat_map(|f| f.tracks.iter())
            .filter(|t| t.id.is_none())
            .count();
        if anonymous > 0 {
            warn!(
                anonymous,
                "predicted tracks without id are scored for detection only"
            );
        }

        let mut acc = MOTAccumulator::new();
        for (frame_idx, (gt, pred)) in ground_truth.iter().zip(predicted).enumerate() {
            if let (Some(gt_ts), Some(pred_ts)) = (&gt.timestamp, &pred.timestamp) {
                if gt_ts != pred_ts {
                    warn!(frame = frame_idx, %gt_ts, %pred_ts, "timestamps differ; frames are paired by position");
                }
            }

            let frame_match = self.matcher.match_frame(&gt.boxes(), &pred.boxes())?;
            let stats = acc.update(&gt.ids(), &pred.ids(), &frame_match);
            debug!(
                frame = frame_idx,
                matches = stats.matches,
                misses = stats.misses,
                false_positives = stats.false_positives,
                switches = stats.switches,
                "frame compared"
            );
        }

        let summary = acc.summary(self.config.strategy);
        info!(
            strategy = %summary.strategy,
            frames = summary.frames_compared,
            matches = summary.num_matches,
            misses = summary.num_misses,
            false_positives = summary.num_false_positives,
            switches = summary.num_switches,
            verdict = %summary.verdict(),
            "evaluation complete"
        );
        Ok(summary)
    }
}

/// Load two sequence files and evaluate them.
///
/// # Arguments
/// * `gt_path` - Path to the ground-truth JSON file
/// * `predictions_path` - Path to the predicted JSON file
/// * `config` - Evaluation configuration
pub fn evaluate_files<P1: AsRef<Path>, P2: AsRef<Path>>(
    gt_path: P1,
    predictions_path: P2,
    config: EvalConfig,
) -> Result<RunSummary> {
    let evaluator = Evaluator::new(config)?;

    let ground_truth = load_frames(gt_path.as_ref())?;
    let predicted = load_frames(predictions_path.as_ref())?;
    info!(
        ground_truth = %gt_path.as_ref().display(),
        gt_frames = ground_truth.len(),
        predicted = %predictions_path.as_ref().display(),
        pred_frames = predicted.len(),
        "loaded sequences"
    );

    evaluator.evaluate(&ground_truth, &predicted)
}
