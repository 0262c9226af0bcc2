//! Tracking-accuracy evaluation.
//!
//! This module ties the pieces together:
//!
//! - `FrameRecord` / `load_frames` - Read ground-truth and predicted sequences
//! - `MOTAccumulator` - Per-frame events, identity switches and counters
//! - `Evaluator` - Run a full comparison and produce a `RunSummary`
//! - MOT metrics computation (MOTA, MOTP, precision, recall)

mod accumulator;
mod evaluation;
mod frames;

pub use accumulator::{FrameStats, MOTAccumulator, MOTEvent, MOTEventType};
pub use evaluation::{evaluate_files, Evaluator, RunSummary, Verdict};
pub use frames::{load_frames, parse_frames, validate_frames, FrameRecord, TrackRecord};
