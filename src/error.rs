use crate::asset::AssetId;

/// Every failure the editor core can surface.
///
/// Clip placement never fails (offsets are clamped) and playback degrades to a
/// no-op, so the variants below are the only observable error paths.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Asset bytes are not decodable audio. The cache entry is left empty so a
    /// retry is possible.
    #[error("failed to decode asset {asset}: {reason}")]
    Decode { asset: AssetId, reason: String },

    #[error("timeline has no clips")]
    EmptyTimeline,

    /// The timeline ends further out than a mixdown can hold.
    #[error("timeline is {seconds} s long, more than a mixdown can hold")]
    MixdownTooLong { seconds: f64 },

    /// Raised inside the exporter only; it always triggers the WAV fallback.
    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("audio output error: {0}")]
    Output(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("editor is no longer running")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn decode(asset: AssetId, reason: impl ToString) -> Self {
        Error::Decode { asset, reason: reason.to_string() }
    }

    /// Identity of the asset that failed, if this is a decode failure.
    pub fn asset(&self) -> Option<AssetId> {
        match self {
            Error::Decode { asset, .. } => Some(*asset),
            _ => None,
        }
    }
}
