//! Axis-aligned box geometry: overlap (IoU) and box equality.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in `[x, y, w, h]` form.
///
/// `(x, y)` is the top-left corner. The box spans `[x, x + w)` horizontally
/// and `[y, y + h)` vertically. Units are whatever the input uses
/// (normalized or pixels); both sides of a comparison must agree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// True when every coordinate is finite and `w`, `h` are non-negative.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite())
            && self.w >= 0.0
            && self.h >= 0.0
    }

    /// Coordinates as an `[x, y, w, h]` array.
    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }

    /// Approximate equality: every coordinate within `tolerance` (absolute).
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Euclidean distance between the two boxes viewed as points in
    /// `(x, y, w, h)` space.
    pub fn key_distance(&self, other: &BoundingBox) -> f64 {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

/// Intersection over union of two boxes, in `[0, 1]`.
///
/// Degenerate inputs (zero union area) score `0.0` rather than erroring, so
/// they naturally end up as misses / false positives downstream.
pub fn overlap(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter_w = (a.right().min(b.right()) - a.x.max(b.x)).max(0.0);
    let inter_h = (a.bottom().min(b.bottom()) - a.y.max(b.y)).max(0.0);
    let inter_area = inter_w * inter_h;

    let union_area = a.area() + b.area() - inter_area;
    if union_area > 0.0 {
        // clamp guards against rounding pushing identical boxes past 1.0
        (inter_area / union_area).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Compute the IoU matrix between two sets of boxes.
///
/// # Returns
/// Matrix of shape `(boxes_a.len(), boxes_b.len())`.
pub fn iou_matrix(boxes_a: &[BoundingBox], boxes_b: &[BoundingBox]) -> DMatrix<f64> {
    DMatrix::from_fn(boxes_a.len(), boxes_b.len(), |i, j| {
        overlap(&boxes_a[i], &boxes_b[j])
    })
}
