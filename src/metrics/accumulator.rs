//! MOT metrics accumulator.

use std::collections::HashSet;

use serde::Serialize;

use crate::identity::{IdentityTracker, Observation, TrackId};
use crate::matching::{FrameMatch, MatchingStrategy};

use super::evaluation::RunSummary;

/// Types of MOT events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MOTEventType {
    /// Accepted match consistent with the canonical identity (or first seen)
    Match,
    /// Accepted match to a non-canonical predicted identity
    Switch,
    /// Ground truth without an accepted prediction
    Miss,
    /// Prediction without an accepted ground truth
    FalsePositive,
}

/// A single MOT event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MOTEvent {
    /// Frame index (0-based sequence position)
    pub frame: usize,
    pub event_type: MOTEventType,
    pub gt_id: Option<TrackId>,
    pub pred_id: Option<TrackId>,
    /// `1 - IoU` for matches and switches
    pub distance: Option<f64>,
}

/// Per-frame counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frame: usize,
    pub matches: usize,
    pub misses: usize,
    pub false_positives: usize,
    pub switches: usize,
}

impl FrameStats {
    pub fn is_clean(&self) -> bool {
        self.misses == 0 && self.false_positives == 0 && self.switches == 0
    }
}

/// Accumulator for MOT (Multi-Object Tracking) metrics.
///
/// Consumes matched frames strictly in sequence order. Identity state lives
/// in an [`IdentityTracker`], so one accumulator covers exactly one run.
#[derive(Debug, Default)]
pub struct MOTAccumulator {
    events: Vec<MOTEvent>,
    frames: Vec<FrameStats>,
    identities: IdentityTracker,
    /// Distinct ground-truth ids that were matched at least once
    gt_ids_matched: HashSet<TrackId>,
    total_iou: f64,
}

impl MOTAccumulator {
    /// Create a new accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the accumulator with the next frame.
    ///
    /// # Arguments
    /// * `gt_ids` - Ground truth ids, indexed like the frame's ground-truth boxes
    /// * `pred_ids` - Predicted ids, indexed like the frame's predicted boxes
    /// * `frame_match` - Accepted matches for this frame
    ///
    /// A match whose predicted track has no id still counts as a match but
    /// is not fed to the identity tracker.
    pub fn update(
        &mut self,
        gt_ids: &[Option<TrackId>],
        pred_ids: &[Option<TrackId>],
        frame_match: &FrameMatch,
    ) -> FrameStats {
        let frame = self.frames.len();
        let mut stats = FrameStats { frame, ..FrameStats::default() };

        for m in &frame_match.matches {
            let gt_id = gt_ids.get(m.gt_idx).cloned().flatten();
            let pred_id = pred_ids.get(m.pred_idx).cloned().flatten();

            let event_type = match (&gt_id, &pred_id) {
                (Some(g), Some(p)) => match self.identities.observe(frame, g, p) {
                    Observation::Switch { .. } => MOTEventType::Switch,
                    Observation::First | Observation::Consistent => MOTEventType::Match,
                },
                _ => MOTEventType::Match,
            };

            if let Some(g) = &gt_id {
                self.gt_ids_matched.insert(g.clone());
            }

            stats.matches += 1;
            if event_type == MOTEventType::Switch {
                stats.switches += 1;
            }
            self.total_iou += m.score;

            self.events.push(MOTEvent {
                frame,
                event_type,
                gt_id,
                pred_id,
                distance: Some(1.0 - m.score),
            });
        }

        // Unmatched ground truths are misses
        for gt_idx in frame_match.unmatched_gt() {
            stats.misses += 1;
            self.events.push(MOTEvent {
                frame,
                event_type: MOTEventType::Miss,
                gt_id: gt_ids.get(gt_idx).cloned().flatten(),
                pred_id: None,
                distance: None,
            });
        }

        // Unmatched hypotheses are false positives
        for pred_idx in frame_match.unmatched_pred() {
            stats.false_positives += 1;
            self.events.push(MOTEvent {
                frame,
                event_type: MOTEventType::FalsePositive,
                gt_id: None,
                pred_id: pred_ids.get(pred_idx).cloned().flatten(),
                distance: None,
            });
        }

        self.frames.push(stats);
        stats
    }

    /// Get all events.
    pub fn events(&self) -> &[MOTEvent] {
        &self.events
    }

    /// Per-frame counts in sequence order.
    pub fn frames(&self) -> &[FrameStats] {
        &self.frames
    }

    pub fn identities(&self) -> &IdentityTracker {
        &self.identities
    }

    /// Count events by type.
    pub fn count_events(&self, event_type: MOTEventType) -> usize {
        self.events.iter().filter(|e| e.event_type == event_type).count()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Accepted matches, switches included.
    pub fn num_matches(&self) -> usize {
        self.count_events(MOTEventType::Match) + self.count_events(MOTEventType::Switch)
    }

    pub fn num_false_positives(&self) -> usize {
        self.count_events(MOTEventType::FalsePositive)
    }

    pub fn num_misses(&self) -> usize {
        self.count_events(MOTEventType::Miss)
    }

    pub fn num_switches(&self) -> usize {
        self.identities.num_switches()
    }

    /// Number of distinct ground-truth objects matched at least once.
    pub fn num_gt_ids_matched(&self) -> usize {
        self.gt_ids_matched.len()
    }

    /// Frames in which at least one identity switch happened.
    pub fn switch_frames(&self) -> Vec<usize> {
        self.frames
            .iter()
            .filter(|f| f.switches > 0)
            .map(|f| f.frame)
            .collect()
    }

    /// Compute MOTA (Multi-Object Tracking Accuracy).
    ///
    /// MOTA = 1 - (FN + FP + IDSW) / num_gt
    pub fn mota(&self) -> f64 {
        let num_gt = self.num_matches() + self.num_misses();
        if num_gt == 0 {
            return 0.0;
        }

        let errors = self.num_misses() + self.num_false_positives() + self.num_switches();
        1.0 - errors as f64 / num_gt as f64
    }

    /// Compute MOTP (Multi-Object Tracking Precision).
    ///
    /// MOTP = sum(IoU) / num_matches
    pub fn motp(&self) -> f64 {
        let matches = self.num_matches();
        if matches == 0 {
            return 0.0;
        }
        self.total_iou / matches as f64
    }

    pub fn precision(&self) -> f64 {
        let matches = self.num_matches();
        let denom = matches + self.num_false_positives();
        if denom == 0 {
            0.0
        } else {
            matches as f64 / denom as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let matches = self.num_matches();
        let denom = matches + self.num_misses();
        if denom == 0 {
            0.0
        } else {
            matches as f64 / denom as f64
        }
    }

    /// Freeze the accumulated counts into a summary.
    pub fn summary(&self, strategy: MatchingStrategy) -> RunSummary {
        RunSummary {
            strategy,
            frames_compared: self.num_frames(),
            num_matches: self.num_matches(),
            num_misses: self.num_misses(),
            num_false_positives: self.num_false_positives(),
            num_switches: self.num_switches(),
            num_gt_ids_matched: self.num_gt_ids_matched(),
            mota: self.mota(),
            motp: self.motp(),
            precision: self.precision(),
            recall: self.recall(),
            frames: self.frames.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Match;
    use approx::assert_relative_eq;

    fn ids(values: &[i64]) -> Vec<Option<TrackId>> {
        values.iter().map(|&v| Some(TrackId::Int(v))).collect()
    }

    fn frame_match(pairs: &[(usize, usize, f64)], num_gt: usize, num_pred: usize) -> FrameMatch {
        FrameMatch {
            matches: pairs
                .iter()
                .map(|&(gt_idx, pred_idx, score)| Match { gt_idx, pred_idx, score })
                .collect(),
            num_gt,
            num_pred,
        }
    }

    // ===== Basic Accumulator Tests =====

    #[test]
    fn test_accumulator_empty() {
        let acc = MOTAccumulator::new();
        assert_eq!(acc.num_matches(), 0);
        assert_eq!(acc.num_false_positives(), 0);
        assert_eq!(acc.num_misses(), 0);
        assert_eq!(acc.num_frames(), 0);
        assert_eq!(acc.mota(), 0.0);
    }

    #[test]
    fn test_accumulator_empty_frame() {
        let mut acc = MOTAccumulator::new();
        let stats = acc.update(&[], &[], &frame_match(&[], 0, 0));

        assert!(stats.is_clean());
        assert_eq!(acc.num_frames(), 1);
        assert!(acc.events().is_empty());
        assert!(acc.identities().identity_map().is_empty());
    }

    #[test]
    fn test_accumulator_only_predictions() {
        let mut acc = MOTAccumulator::new();
        let stats = acc.update(&[], &ids(&[1, 2, 3]), &frame_match(&[], 0, 3));

        assert_eq!(stats.false_positives, 3);
        assert_eq!(acc.num_false_positives(), 3);
        assert_eq!(acc.num_matches(), 0);
        assert_eq!(acc.num_misses(), 0);
    }

    #[test]
    fn test_accumulator_only_gt() {
        let mut acc = MOTAccumulator::new();
        acc.update(&ids(&[1, 2]), &[], &frame_match(&[], 2, 0));

        assert_eq!(acc.num_misses(), 2);
        assert_eq!(acc.num_matches(), 0);
        assert_eq!(acc.num_false_positives(), 0);
    }

    #[test]
    fn test_accumulator_partial_match() {
        let mut acc = MOTAccumulator::new();
        let stats = acc.update(&ids(&[1, 2]), &ids(&[1, 2]), &frame_match(&[(0, 0, 0.9)], 2, 2));

        assert_eq!(stats.matches, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.false_positives, 1);
        let miss = acc
            .events()
            .iter()
            .find(|e| e.event_type == MOTEventType::Miss)
            .unwrap();
        assert_eq!(miss.gt_id, Some(TrackId::Int(2)));
    }

    // ===== ID Switch Detection Tests =====

    #[test]
    fn test_accumulator_id_switch_at_frame_two() {
        let mut acc = MOTAccumulator::new();
        let fm = frame_match(&[(0, 0, 1.0)], 1, 1);

        for pred in [5, 5, 7] {
            acc.update(&ids(&[1]), &ids(&[pred]), &fm);
        }

        assert_eq!(acc.num_matches(), 3);
        assert_eq!(acc.num_switches(), 1);
        assert_eq!(acc.count_events(MOTEventType::Switch), 1);
        assert_eq!(acc.switch_frames(), vec![2]);
        assert_eq!(acc.num_gt_ids_matched(), 1);
    }

    #[test]
    fn test_accumulator_switch_back_is_not_rewarded() {
        let mut acc = MOTAccumulator::new();
        let fm = frame_match(&[(0, 0, 1.0)], 1, 1);

        // 1 -> 2 (switch), -> 1 (canonical again), -> 3 (switch)
        for pred in [1, 2, 1, 3] {
            acc.update(&ids(&[1]), &ids(&[pred]), &fm);
        }

        assert_eq!(acc.num_switches(), 2);
        assert_eq!(acc.num_matches(), 4);
        assert_eq!(acc.switch_frames(), vec![1, 3]);
    }

    #[test]
    fn test_accumulator_anonymous_predictions_skip_identity() {
        let mut acc = MOTAccumulator::new();
        let fm = frame_match(&[(0, 0, 1.0)], 1, 1);

        acc.update(&ids(&[1]), &[None], &fm);
        acc.update(&ids(&[1]), &[None], &fm);

        assert_eq!(acc.num_matches(), 2);
        assert_eq!(acc.num_switches(), 0);
        assert!(acc.identities().identity_map().is_empty());
        assert_eq!(acc.num_gt_ids_matched(), 1);
    }

    // ===== Metric Computation Tests =====

    #[test]
    fn test_metrics_recall_precision() {
        let mut acc = MOTAccumulator::new();
        let hit = frame_match(&[(0, 0, 1.0)], 1, 1);
        for _ in 0..3 {
            acc.update(&ids(&[1]), &ids(&[1]), &hit);
        }
        acc.update(&ids(&[1]), &[], &frame_match(&[], 1, 0));
        acc.update(&ids(&[1]), &[], &frame_match(&[], 1, 0));
        acc.update(&[], &ids(&[9]), &frame_match(&[], 0, 1));

        // 3 matches, 2 misses, 1 FP
        assert_relative_eq!(acc.recall(), 0.6, epsilon = 1e-10);
        assert_relative_eq!(acc.precision(), 0.75, epsilon = 1e-10);
        assert_relative_eq!(acc.mota(), 1.0 - 3.0 / 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_metrics_motp() {
        let mut acc = MOTAccumulator::new();
        for score in [0.9, 0.8, 0.7] {
            acc.update(&ids(&[1]), &ids(&[1]), &frame_match(&[(0, 0, score)], 1, 1));
        }
        assert_relative_eq!(acc.motp(), 0.8, epsilon = 1e-10);
        assert_relative_eq!(acc.events()[0].distance.unwrap(), 0.1, epsilon = 1e-10);
    }

    #[test]
    fn test_summary_copies_counts() {
        let mut acc = MOTAccumulator::new();
        acc.update(&ids(&[1, 2]), &ids(&[4]), &frame_match(&[(1, 0, 0.5)], 2, 1));

        let summary = acc.summary(MatchingStrategy::Optimal);
        assert_eq!(summary.frames_compared, 1);
        assert_eq!(summary.num_matches, 1);
        assert_eq!(summary.num_misses, 1);
        assert_eq!(summary.num_false_positives, 0);
        assert_eq!(summary.frames, acc.frames().to_vec());
    }
}
