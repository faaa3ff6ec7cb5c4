use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        AssetId(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A finished unit of synthesized speech handed to the editor.
///
/// Immutable once created: the bytes are shared, never copied, and the
/// descriptive fields only travel along for display.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub id: AssetId,
    pub bytes: Arc<[u8]>,
    /// Nominal length in seconds. `None` until probed.
    pub duration: Option<f64>,
    pub text: String,
    pub voice: String,
}

impl AudioAsset {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        duration: Option<f64>,
        text: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            id: AssetId::new(),
            bytes: bytes.into(),
            duration: duration.filter(|d| d.is_finite() && *d >= 0.0),
            text: text.into(),
            voice: voice.into(),
        }
    }
}
