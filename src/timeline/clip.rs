use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::asset::AudioAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        ClipId(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One placement of an asset on the timeline.
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: ClipId,
    pub asset: Arc<AudioAsset>,
    /// Offset in seconds, never negative.
    pub start: f64,
    /// Copied from the asset once known; fixed from then on.
    pub duration: Option<f64>,
    /// Insertion order, breaks ties between equal starts.
    pub(crate) seq: u64,
}

impl Clip {
    /// Duration with unresolved clips counting as zero.
    pub fn length(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.start + self.length()
    }

    pub fn is_resolved(&self) -> bool {
        self.duration.is_some()
    }

    /// Whether `[start, end)` intersects `[from, to)`.
    pub fn intersects(&self, from: f64, to: f64) -> bool {
        self.start < to && self.end() > from
    }
}

/// Serializable view of a clip for display layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSummary {
    pub id: ClipId,
    pub start: f64,
    pub duration: Option<f64>,
    pub text: String,
    pub voice: String,
}

impl From<&Clip> for ClipSummary {
    fn from(clip: &Clip) -> Self {
        Self {
            id: clip.id,
            start: clip.start,
            duration: clip.duration,
            text: clip.asset.text.clone(),
            voice: clip.asset.voice.clone(),
        }
    }
}

pub(crate) fn clamp_offset(offset: f64) -> f64 {
    if offset.is_finite() && offset > 0.0 {
        offset
    } else {
        0.0
    }
}
