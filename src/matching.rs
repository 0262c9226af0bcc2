//! Per-frame matching of ground-truth boxes to predicted boxes.
//!
//! Two strategies are available and must be chosen explicitly:
//!
//! - [`MatchingStrategy::Optimal`] - globally optimal IoU assignment (Hungarian)
//!   with a minimum-overlap threshold.
//! - [`MatchingStrategy::NearestKey`] - per ground-truth box, the nearest
//!   predicted box in `(x, y, w, h)` space within a tight tolerance. Intended
//!   for regression tests against frozen fixtures where boxes coincide.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::config::EvalConfig;
use crate::geometry::{iou_matrix, overlap, BoundingBox};
use crate::internal::scipy::linear_sum_assignment;
use crate::{Error, Result};

/// Matching policy used by the [`FrameMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchingStrategy {
    /// Minimum-cost assignment on `1 - IoU`, gated by the IoU threshold.
    #[default]
    Optimal,
    /// Nearest predicted box by Euclidean `(x, y, w, h)` distance, first found
    /// wins on ties, predicted boxes may be claimed more than once.
    NearestKey,
}

impl MatchingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MatchingStrategy::Optimal => "optimal",
            MatchingStrategy::NearestKey => "nearest-key",
        }
    }
}

impl fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        strategy_by_name(s)
    }
}

/// Get a matching strategy by name.
///
/// Supported names:
/// - "optimal", "hungarian", "iou"
/// - "nearest-key", "nearest_key", "key"
pub fn strategy_by_name(name: &str) -> Result<MatchingStrategy> {
    match name.trim().to_ascii_lowercase().as_str() {
        "optimal" | "hungarian" | "iou" => Ok(MatchingStrategy::Optimal),
        "nearest-key" | "nearest_key" | "key" => Ok(MatchingStrategy::NearestKey),
        other => Err(Error::InvalidConfig(format!(
            "unknown matching strategy: {}",
            other
        ))),
    }
}

/// An accepted pairing of one ground-truth box with one predicted box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Index into the frame's ground-truth list.
    pub gt_idx: usize,
    /// Index into the frame's predicted list.
    pub pred_idx: usize,
    /// IoU of the pair.
    pub score: f64,
}

/// Result of matching one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMatch {
    /// Accepted matches, ordered by ground-truth index.
    pub matches: Vec<Match>,
    /// Number of ground-truth boxes in the frame.
    pub num_gt: usize,
    /// Number of predicted boxes in the frame.
    pub num_pred: usize,
}

impl FrameMatch {
    /// Ground-truth boxes without an accepted counterpart.
    pub fn misses(&self) -> usize {
        self.num_gt - self.matched_gt().len()
    }

    /// Predicted boxes without an accepted counterpart.
    pub fn false_positives(&self) -> usize {
        self.num_pred - self.matched_pred().len()
    }

    pub fn unmatched_gt(&self) -> Vec<usize> {
        get_unmatched(self.num_gt, &self.matched_gt())
    }

    pub fn unmatched_pred(&self) -> Vec<usize> {
        get_unmatched(self.num_pred, &self.matched_pred())
    }

    fn matched_gt(&self) -> Vec<usize> {
        distinct(self.matches.iter().map(|m| m.gt_idx))
    }

    fn matched_pred(&self) -> Vec<usize> {
        distinct(self.matches.iter().map(|m| m.pred_idx))
    }
}

fn distinct(indices: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut v: Vec<usize> = indices.collect();
    v.sort_unstable();
    v.dedup();
    v
}

/// Get unmatched indices from a match result.
pub fn get_unmatched(total: usize, matched: &[usize]) -> Vec<usize> {
    let mut is_matched = vec![false; total];
    for &idx in matched {
        is_matched[idx] = true;
    }
    (0..total).filter(|&i| !is_matched[i]).collect()
}

/// Matches the ground-truth and predicted boxes of a single frame.
#[derive(Debug, Clone)]
pub struct FrameMatcher {
    pub strategy: MatchingStrategy,
    pub iou_threshold: f64,
    pub key_tolerance: f64,
}

impl FrameMatcher {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            strategy: config.strategy,
            iou_threshold: config.iou_threshold,
            key_tolerance: config.key_tolerance,
        }
    }

    /// Match one frame.
    ///
    /// Empty inputs on either side short-circuit to zero matches without
    /// touching the solver.
    pub fn match_frame(&self, gt: &[BoundingBox], pred: &[BoundingBox]) -> Result<FrameMatch> {
        let matches = if gt.is_empty() || pred.is_empty() {
            Vec::new()
        } else {
            match self.strategy {
                MatchingStrategy::Optimal => match_optimal(gt, pred, self.iou_threshold)?,
                MatchingStrategy::NearestKey => match_nearest_key(gt, pred, self.key_tolerance),
            }
        };

        Ok(FrameMatch {
            matches,
            num_gt: gt.len(),
            num_pred: pred.len(),
        })
    }
}

/// Cost assigned to pairs that do not clear the overlap threshold.
///
/// Real costs lie in `[0, 1)`, so any `k + 1` real pairs cost less than `k + 1`.
/// A sentinel above the largest possible number of pairs therefore makes the
/// solver prefer every additional viable pair over any saving in IoU.
pub fn unmatchable_cost(num_gt: usize, num_pred: usize) -> f64 {
    (num_gt.min(num_pred) + 1) as f64
}

/// Build the `(num_gt x num_pred)` cost matrix.
///
/// `C[i][j] = 1 - IoU` when `IoU > iou_threshold`, otherwise the sentinel
/// returned alongside the matrix.
pub fn build_cost_matrix(
    gt: &[BoundingBox],
    pred: &[BoundingBox],
    iou_threshold: f64,
) -> (DMatrix<f64>, f64) {
    let sentinel = unmatchable_cost(gt.len(), pred.len());
    let cost = iou_matrix(gt, pred).map(|iou| {
        if iou > iou_threshold {
            1.0 - iou
        } else {
            sentinel
        }
    });
    (cost, sentinel)
}

/// Optimal IoU matching.
///
/// Pairs returned by the solver that carry the sentinel cost are rejected.
pub fn match_optimal(
    gt: &[BoundingBox],
    pred: &[BoundingBox],
    iou_threshold: f64,
) -> Result<Vec<Match>> {
    let (cost, sentinel) = build_cost_matrix(gt, pred, iou_threshold);

    let matches = linear_sum_assignment(&cost)?
        .into_iter()
        .filter(|a| cost[(a.row_idx, a.col_idx)] < sentinel)
        .map(|a| Match {
            gt_idx: a.row_idx,
            pred_idx: a.col_idx,
            score: 1.0 - cost[(a.row_idx, a.col_idx)],
        })
        .collect();

    Ok(matches)
}

/// Nearest-key matching.
///
/// For every ground-truth box, picks the predicted box with the smallest
/// `(x, y, w, h)` distance that is within `tolerance`. On equal distances the
/// lowest predicted index wins. A predicted box may serve several
/// ground-truth boxes.
pub fn match_nearest_key(gt: &[BoundingBox], pred: &[BoundingBox], tolerance: f64) -> Vec<Match> {
    let mut matches = Vec::new();

    for (gt_idx, g) in gt.iter().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for (pred_idx, p) in pred.iter().enumerate() {
            let dist = g.key_distance(p);
            if dist > tolerance {
                continue;
            }
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((pred_idx, dist));
            }
        }

        if let Some((pred_idx, _)) = best {
            matches.push(Match {
                gt_idx,
                pred_idx,
                score: overlap(g, &pred[pred_idx]),
            });
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bbox(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(x, y, w, h)
    }

    fn matcher(strategy: MatchingStrategy) -> FrameMatcher {
        FrameMatcher::new(&EvalConfig::default().with_strategy(strategy))
    }

    // ===== Strategy Selection =====

    #[test]
    fn test_strategy_by_name() {
        assert_eq!(strategy_by_name("optimal").unwrap(), MatchingStrategy::Optimal);
        assert_eq!(strategy_by_name("Hungarian").unwrap(), MatchingStrategy::Optimal);
        assert_eq!(strategy_by_name("nearest-key").unwrap(), MatchingStrategy::NearestKey);
        assert_eq!("key".parse::<MatchingStrategy>().unwrap(), MatchingStrategy::NearestKey);
        assert!(matches!(strategy_by_name("greedy"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_strategy_name_round_trip() {
        for s in [MatchingStrategy::Optimal, MatchingStrategy::NearestKey] {
            assert_eq!(strategy_by_name(s.name()).unwrap(), s);
        }
    }

    // ===== Cost Matrix =====

    #[test]
    fn test_cost_matrix_threshold_and_sentinel() {
        let gt = [bbox(0.0, 0.0, 10.0, 10.0), bbox(50.0, 50.0, 10.0, 10.0)];
        let pred = [bbox(0.0, 0.0, 10.0, 10.0), bbox(5.0, 5.0, 10.0, 10.0)];
        let (cost, sentinel) = build_cost_matrix(&gt, &pred, 0.3);

        assert!(sentinel > 1.0);
        assert_relative_eq!(cost[(0, 0)], 0.0, epsilon = 1e-12);
        // IoU 25/175 ~ 0.14 is under the threshold
        assert_eq!(cost[(0, 1)], sentinel);
        assert_eq!(cost[(1, 0)], sentinel);
        assert_eq!(cost[(1, 1)], sentinel);
    }

    #[test]
    fn test_iou_equal_to_threshold_is_rejected() {
        // IoU is exactly 0.5: [0,10) vs [0,5) on x, same y
        let gt = [bbox(0.0, 0.0, 10.0, 10.0)];
        let pred = [bbox(0.0, 0.0, 5.0, 10.0)];
        assert!(match_optimal(&gt, &pred, 0.5).unwrap().is_empty());
        assert_eq!(match_optimal(&gt, &pred, 0.49).unwrap().len(), 1);
    }

    #[test]
    fn test_sentinel_prefers_more_matches() {
        // gt1 can only pair with pred1 (IoU 1/3). Taking the perfect
        // gt0/pred1 pair would strand gt1, so the two weaker pairs must win.
        let gt = [bbox(0.0, 0.0, 10.0, 10.0), bbox(-5.0, 0.0, 10.0, 10.0)];
        let pred = [bbox(3.0, 0.0, 10.0, 10.0), bbox(0.0, 0.0, 10.0, 10.0)];
        let matches = match_optimal(&gt, &pred, 0.3).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].gt_idx, matches[0].pred_idx), (0, 0));
        assert_eq!((matches[1].gt_idx, matches[1].pred_idx), (1, 1));
    }

    // ===== Optimal Matching =====

    #[test]
    fn test_optimal_perfect_matches() {
        let gt = [bbox(0.0, 0.0, 1.0, 1.0), bbox(5.0, 5.0, 1.0, 1.0)];
        let pred = [bbox(5.0, 5.0, 1.0, 1.0), bbox(0.0, 0.0, 1.0, 1.0)];
        let fm = matcher(MatchingStrategy::Optimal).match_frame(&gt, &pred).unwrap();

        assert_eq!(fm.matches.len(), 2);
        assert_eq!((fm.matches[0].gt_idx, fm.matches[0].pred_idx), (0, 1));
        assert_eq!((fm.matches[1].gt_idx, fm.matches[1].pred_idx), (1, 0));
        assert_relative_eq!(fm.matches[0].score, 1.0, epsilon = 1e-12);
        assert_eq!(fm.misses(), 0);
        assert_eq!(fm.false_positives(), 0);
    }

    #[test]
    fn test_optimal_one_miss() {
        let gt = [bbox(0.0, 0.0, 1.0, 1.0), bbox(5.0, 5.0, 1.0, 1.0)];
        let pred = [bbox(0.0, 0.0, 1.0, 1.0)];
        let fm = matcher(MatchingStrategy::Optimal).match_frame(&gt, &pred).unwrap();

        assert_eq!(fm.matches.len(), 1);
        assert_eq!(fm.misses(), 1);
        assert_eq!(fm.false_positives(), 0);
        assert_eq!(fm.unmatched_gt(), vec![1]);
    }

    #[test]
    fn test_optimal_extra_prediction_is_false_positive() {
        let gt = [bbox(0.0, 0.0, 1.0, 1.0)];
        let pred = [bbox(0.0, 0.0, 1.0, 1.0), bbox(10.0, 10.0, 1.0, 1.0)];
        let fm = matcher(MatchingStrategy::Optimal).match_frame(&gt, &pred).unwrap();

        assert_eq!(fm.matches.len(), 1);
        assert_eq!(fm.misses(), 0);
        assert_eq!(fm.false_positives(), 1);
        assert_eq!(fm.unmatched_pred(), vec![1]);
    }

    #[test]
    fn test_degenerate_box_becomes_miss_and_false_positive() {
        let gt = [bbox(0.0, 0.0, 0.0, 0.0)];
        let pred = [bbox(0.0, 0.0, 0.0, 0.0)];
        let fm = matcher(MatchingStrategy::Optimal).match_frame(&gt, &pred).unwrap();

        assert!(fm.matches.is_empty());
        assert_eq!(fm.misses(), 1);
        assert_eq!(fm.false_positives(), 1);
    }

    // ===== Empty/Minimal Inputs =====

    #[test]
    fn test_empty_sides() {
        for strategy in [MatchingStrategy::Optimal, MatchingStrategy::NearestKey] {
            let m = matcher(strategy);
            let boxes = [bbox(0.0, 0.0, 1.0, 1.0), bbox(2.0, 2.0, 1.0, 1.0)];

            let fm = m.match_frame(&[], &[]).unwrap();
            assert_eq!((fm.misses(), fm.false_positives()), (0, 0));

            let fm = m.match_frame(&boxes, &[]).unwrap();
            assert_eq!((fm.misses(), fm.false_positives()), (2, 0));

            let fm = m.match_frame(&[], &boxes).unwrap();
            assert_eq!((fm.misses(), fm.false_positives()), (0, 2));
        }
    }

    // ===== Nearest-Key Matching =====

    #[test]
    fn test_nearest_key_exact() {
        let gt = [bbox(0.1, 0.1, 0.1, 0.1), bbox(0.5, 0.5, 0.2, 0.2)];
        let pred = [bbox(0.5, 0.5, 0.2, 0.2), bbox(0.1, 0.1, 0.1, 0.1)];
        let matches = match_nearest_key(&gt, &pred, 1e-6);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].pred_idx, 1);
        assert_eq!(matches[1].pred_idx, 0);
    }

    #[test]
    fn test_nearest_key_outside_tolerance() {
        let gt = [bbox(0.1, 0.1, 0.1, 0.1)];
        let pred = [bbox(0.1001, 0.1, 0.1, 0.1)];
        assert!(match_nearest_key(&gt, &pred, 1e-6).is_empty());
        assert_eq!(match_nearest_key(&gt, &pred, 1e-3).len(), 1);
    }

    #[test]
    fn test_nearest_key_first_found_wins() {
        let gt = [bbox(0.0, 0.0, 1.0, 1.0)];
        let pred = [bbox(0.0, 0.0, 1.0, 1.0), bbox(0.0, 0.0, 1.0, 1.0)];
        let matches = match_nearest_key(&gt, &pred, 1e-6);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pred_idx, 0);
    }

    #[test]
    fn test_nearest_key_allows_reuse() {
        let gt = [bbox(0.0, 0.0, 1.0, 1.0), bbox(0.0, 0.0, 1.0, 1.0)];
        let pred = [bbox(0.0, 0.0, 1.0, 1.0)];
        let fm = matcher(MatchingStrategy::NearestKey).match_frame(&gt, &pred).unwrap();

        assert_eq!(fm.matches.len(), 2);
        assert_eq!(fm.misses(), 0);
        assert_eq!(fm.false_positives(), 0);

        // The optimal matcher pairs one-to-one instead.
        let fm = matcher(MatchingStrategy::Optimal).match_frame(&gt, &pred).unwrap();
        assert_eq!(fm.matches.len(), 1);
        assert_eq!(fm.misses(), 1);
    }

    #[test]
    fn test_get_unmatched() {
        assert_eq!(get_unmatched(4, &[0, 2]), vec![1, 3]);
        assert_eq!(get_unmatched(2, &[]), vec![0, 1]);
        assert!(get_unmatched(0, &[]).is_empty());
    }
}
