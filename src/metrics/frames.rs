//! Frame-record files.
//!
//! A sequence file is a JSON array of frame records:
//!
//! ```json
//! [
//!   { "timestamp": "2025-03-24T18:00:00.000000",
//!     "tracks": [ { "x": 0.1, "y": 0.1, "w": 0.1, "h": 0.1, "id": 1 } ] }
//! ]
//! ```
//!
//! `"detections"` is accepted in place of `"tracks"`, and `id` may be an
//! integer, a string, or absent.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;
use crate::identity::TrackId;
use crate::{Error, Result};

/// One box in one frame, optionally carrying an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TrackId>,
}

impl TrackRecord {
    pub fn new(id: impl Into<TrackId>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h, id: Some(id.into()) }
    }

    /// A track without identity (plain detection).
    pub fn anonymous(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h, id: None }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.w, self.h)
    }
}

/// All tracks of one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Informational only; frames are paired by position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, alias = "detections")]
    pub tracks: Vec<TrackRecord>,
}

impl FrameRecord {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { timestamp: None, tracks }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.tracks.iter().map(TrackRecord::bbox).collect()
    }

    pub fn ids(&self) -> Vec<Option<TrackId>> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }
}

/// Parse a JSON array of frame records.
pub fn parse_frames(json: &str) -> Result<Vec<FrameRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a sequence file.
pub fn load_frames<P: AsRef<Path>>(path: P) -> Result<Vec<FrameRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::IoError(std::io::Error::new(
            e.kind(),
            format!("failed to open frame file '{}': {}", path.display(), e),
        ))
    })?;

    parse_frames(&content).map_err(|e| match e {
        Error::Json(err) => Error::InvalidInput(format!(
            "malformed frame file '{}': {}",
            path.display(),
            err
        )),
        other => other,
    })
}

/// Check every box for valid geometry and, when `require_ids` is set, that
/// every track carries an id.
///
/// `label` names the sequence in error messages.
pub fn validate_frames(frames: &[FrameRecord], label: &str, require_ids: bool) -> Result<()> {
    for (frame_idx, frame) in frames.iter().enumerate() {
        for (track_idx, track) in frame.tracks.iter().enumerate() {
            if !track.bbox().is_valid() {
                return Err(Error::InvalidInput(format!(
                    "{} frame {}, track {}: box must have finite coordinates and non-negative size, got ({}, {}, {}, {})",
                    label, frame_idx, track_idx, track.x, track.y, track.w, track.h
                )));
            }
            if require_ids && track.id.is_none() {
                return Err(Error::InvalidInput(format!(
                    "{} frame {}, track {}: missing id",
                    label, frame_idx, track_idx
                )));
            }
        }
    }
    Ok(())
}
