use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::wav::WavEncoder;
use crate::audio::DecodedBuffer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Mp3,
    Wav,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp3 => "mp3",
            ExportFormat::Wav => "wav",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Mp3 => "audio/mpeg",
            ExportFormat::Wav => "audio/wav",
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, ExportFormat::Mp3)
    }
}

/// Serializes a sample buffer into a container.
pub trait AudioEncoder: Send + Sync {
    fn format(&self) -> ExportFormat;
    fn encode(&self, buffer: &DecodedBuffer) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedAudio {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
}

impl ExportedAudio {
    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }
}

/// Tries the preferred encoder and falls back to WAV on any failure,
/// including a panic or an empty result. `export` itself cannot fail.
pub struct Exporter {
    primary: Box<dyn AudioEncoder>,
}

impl Exporter {
    pub fn new(primary: Box<dyn AudioEncoder>) -> Self {
        Self { primary }
    }

    pub fn export(&self, buffer: &DecodedBuffer) -> ExportedAudio {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.primary.encode(buffer)))
            .unwrap_or_else(|_| Err(Error::EncoderUnavailable("encoder panicked".into())));

        match attempt {
            Ok(bytes) if !bytes.is_empty() => {
                info!(format = ?self.primary.format(), bytes = bytes.len(), "Export encoded");
                ExportedAudio { bytes, format: self.primary.format() }
            }
            Ok(_) => self.fallback(buffer, "encoder produced no output"),
            Err(e) => self.fallback(buffer, &e.to_string()),
        }
    }

    fn fallback(&self, buffer: &DecodedBuffer, reason: &str) -> ExportedAudio {
        warn!(reason, "Primary encoder failed, writing WAV");
        ExportedAudio { bytes: WavEncoder::write_wav(buffer), format: ExportFormat::Wav }
    }
}
