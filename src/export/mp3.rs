//! MP3 export through LAME, compiled in with the `mp3` feature.
//!
//! Samples are clamped and quantized to 16 bits, then fed to the encoder in
//! fixed blocks with a final flush. Any LAME error, or a stream that comes out
//! empty, is reported as `EncoderUnavailable` so the exporter can fall back.

use super::encoder::{AudioEncoder, ExportFormat};
use crate::audio::DecodedBuffer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct Mp3Encoder {
    pub bitrate_kbps: u32,
    pub block_frames: usize,
}

impl Mp3Encoder {
    pub fn new(bitrate_kbps: u32, block_frames: usize) -> Self {
        Self { bitrate_kbps, block_frames: block_frames.max(1) }
    }

    /// Whether LAME was compiled into this build.
    pub fn is_available() -> bool {
        cfg!(feature = "mp3")
    }
}

impl AudioEncoder for Mp3Encoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Mp3
    }

    #[cfg(feature = "mp3")]
    fn encode(&self, buffer: &DecodedBuffer) -> Result<Vec<u8>> {
        lame::encode(self, buffer)
    }

    #[cfg(not(feature = "mp3"))]
    fn encode(&self, _buffer: &DecodedBuffer) -> Result<Vec<u8>> {
        Err(Error::EncoderUnavailable("built without the `mp3` feature".into()))
    }
}

#[cfg(feature = "mp3")]
mod lame {
    use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

    use super::{Error, Mp3Encoder, Result};
    use crate::audio::DecodedBuffer;
    use crate::export::wav::quantize;

    fn bitrate(kbps: u32) -> Bitrate {
        match kbps {
            0..=47 => Bitrate::Kbps32,
            48..=63 => Bitrate::Kbps48,
            64..=95 => Bitrate::Kbps64,
            96..=127 => Bitrate::Kbps96,
            128..=159 => Bitrate::Kbps128,
            160..=191 => Bitrate::Kbps160,
            192..=255 => Bitrate::Kbps192,
            256..=319 => Bitrate::Kbps256,
            _ => Bitrate::Kbps320,
        }
    }

    fn unavailable(stage: &str, detail: impl std::fmt::Debug) -> Error {
        Error::EncoderUnavailable(format!("{stage}: {detail:?}"))
    }

    pub(super) fn encode(settings: &Mp3Encoder, buffer: &DecodedBuffer) -> Result<Vec<u8>> {
        let mut builder = Builder::new().ok_or_else(|| unavailable("init", "LAME builder"))?;
        builder.set_num_channels(1).map_err(|e| unavailable("channels", e))?;
        builder.set_sample_rate(buffer.sample_rate).map_err(|e| unavailable("sample rate", e))?;
        builder.set_brate(bitrate(settings.bitrate_kbps)).map_err(|e| unavailable("bitrate", e))?;
        builder.set_quality(Quality::Good).map_err(|e| unavailable("quality", e))?;
        let mut encoder = builder.build().map_err(|e| unavailable("build", e))?;

        let pcm: Vec<i16> = buffer.to_mono().into_iter().map(quantize).collect();
        let mut out: Vec<u8> = Vec::new();

        for block in pcm.chunks(settings.block_frames) {
            out.reserve(max_required_buffer_size(block.len()));
            let written = encoder
                .encode(MonoPcm(block), out.spare_capacity_mut())
                .map_err(|e| unavailable("encode", e))?;
            // SAFETY: LAME initialised `written` bytes of the spare capacity.
            unsafe { out.set_len(out.len() + written) };
        }

        out.reserve(max_required_buffer_size(settings.block_frames));
        let flushed = encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(|e| unavailable("flush", e))?;
        // SAFETY: as above, for the flushed tail.
        unsafe { out.set_len(out.len() + flushed) };

        if out.is_empty() {
            return Err(Error::EncoderUnavailable("encoder produced no output".into()));
        }
        Ok(out)
    }
}
