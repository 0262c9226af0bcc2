//! Cross-frame identity bookkeeping.
//!
//! The first predicted id a ground-truth object is matched to becomes its
//! canonical id. Every later match to a different predicted id counts as an
//! identity switch, and the canonical id is never replaced, so flip-flopping
//! back to the original id does not erase earlier switches.
//!
//! Frames must be fed in sequence order: reordering changes which match is
//! "first" and therefore the switch count.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Object identity as found in input files: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Int(i64),
    Str(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackId::Int(id) => write!(f, "{}", id),
            TrackId::Str(id) => write!(f, "{:?}", id),
        }
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        TrackId::Int(id)
    }
}

impl From<i32> for TrackId {
    fn from(id: i32) -> Self {
        TrackId::Int(i64::from(id))
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        TrackId::Str(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        TrackId::Str(id)
    }
}

/// Outcome of observing one (ground truth, prediction) id pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First time this ground-truth id was matched; mapping recorded.
    First,
    /// Matched to its canonical predicted id.
    Consistent,
    /// Matched to a predicted id other than the canonical one.
    Switch { canonical: TrackId },
}

/// Write-once map from ground-truth id to canonical predicted id.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    canonical: HashMap<TrackId, TrackId>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `pred` as canonical for `gt` if absent, otherwise compare.
    pub fn observe(&mut self, gt: &TrackId, pred: &TrackId) -> Observation {
        match self.canonical.entry(gt.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(pred.clone());
                Observation::First
            }
            Entry::Occupied(slot) if slot.get() == pred => Observation::Consistent,
            Entry::Occupied(slot) => Observation::Switch {
                canonical: slot.get().clone(),
            },
        }
    }

    /// Canonical predicted id for a ground-truth id.
    pub fn get(&self, gt: &TrackId) -> Option<&TrackId> {
        self.canonical.get(gt)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Entries sorted by ground-truth id.
    pub fn entries(&self) -> Vec<(&TrackId, &TrackId)> {
        let mut entries: Vec<_> = self.canonical.iter().collect();
        entries.sort();
        entries
    }
}

/// Stateful identity-switch counter over an ordered frame sequence.
#[derive(Debug, Clone, Default)]
pub struct IdentityTracker {
    map: IdentityMap,
    num_switches: usize,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted match in `frame`.
    pub fn observe(&mut self, frame: usize, gt: &TrackId, pred: &TrackId) -> Observation {
        let observation = self.map.observe(gt, pred);
        if let Observation::Switch { canonical } = &observation {
            self.num_switches += 1;
            debug!(frame, gt_id = %gt, canonical = %canonical, observed = %pred, "identity switch");
        }
        observation
    }

    pub fn num_switches(&self) -> usize {
        self.num_switches
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.map
    }
}
