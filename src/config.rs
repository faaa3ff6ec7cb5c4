use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Highest engine rate accepted; keeps WAV byte rates well inside 32 bits.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Engine-wide settings, passed into `Editor::new` the same way every
/// component receives its config struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Fixed rate of every decoded buffer and of the mixdown output.
    pub sample_rate: u32,
    pub mp3_bitrate_kbps: u32,
    /// Samples fed to the compressed encoder per call.
    pub encode_block_frames: usize,
    /// Cadence of the playback position loop.
    pub poll_interval_ms: u64,
    /// Capacity of the editor command channel.
    pub command_buffer: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            mp3_bitrate_kbps: 128,
            encode_block_frames: 1152, // one MPEG-1 layer III frame
            poll_interval_ms: 50,
            command_buffer: 64,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(Error::Config(format!(
                "sample_rate must be between 1 and {MAX_SAMPLE_RATE}"
            )));
        }
        if self.encode_block_frames == 0 {
            return Err(Error::Config("encode_block_frames must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        if self.command_buffer == 0 {
            return Err(Error::Config("command_buffer must be positive".into()));
        }
        Ok(())
    }
}
