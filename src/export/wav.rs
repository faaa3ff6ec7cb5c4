//! RIFF/WAVE writer used as the export fallback.
//!
//! Always the canonical 44-byte header followed by interleaved 16-bit
//! little-endian PCM. Writing into a `Vec` cannot fail. RIFF sizes are 32-bit,
//! so frames past the 4 GiB limit are dropped and the header stays valid.

use tracing::warn;

use super::encoder::{AudioEncoder, ExportFormat};
use crate::audio::DecodedBuffer;
use crate::error::Result;

pub const HEADER_LEN: usize = 44;

/// Largest `data` chunk the RIFF size field can still describe.
const MAX_DATA_BYTES: u64 = u32::MAX as u64 - 36;

/// Block alignment is a u16 of `channels * 2`.
const MAX_CHANNELS: usize = (u16::MAX / 2) as usize;

#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn write_wav(buffer: &DecodedBuffer) -> Vec<u8> {
        let channels = buffer.channel_count().clamp(1, MAX_CHANNELS);
        let block_align = channels * 2;
        let frames = writable_frames(buffer.frames(), block_align);
        if frames < buffer.frames() {
            warn!(dropped = buffer.frames() - frames, "Mixdown exceeds the WAV size limit, truncating");
        }
        let data_bytes = frames * block_align;

        let mut out = Vec::with_capacity(HEADER_LEN + data_bytes);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data_bytes) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&(channels as u16).to_le_bytes());
        out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
        out.extend_from_slice(&buffer.sample_rate.saturating_mul(block_align as u32).to_le_bytes());
        out.extend_from_slice(&(block_align as u16).to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_bytes as u32).to_le_bytes());

        for frame in 0..frames {
            for channel in 0..channels {
                out.extend_from_slice(&quantize(buffer.sample(channel, frame)).to_le_bytes());
            }
        }
        out
    }
}

impl AudioEncoder for WavEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Wav
    }

    fn encode(&self, buffer: &DecodedBuffer) -> Result<Vec<u8>> {
        Ok(Self::write_wav(buffer))
    }
}

fn writable_frames(frames: usize, block_align: usize) -> usize {
    let limit = MAX_DATA_BYTES / block_align.max(1) as u64;
    usize::try_from(limit).map_or(frames, |limit| frames.min(limit))
}

/// Clamp to [-1, 1] and scale to i16. NaN maps to silence.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
    }

    #[test]
    fn header_fields_match_buffer() {
        let buf = DecodedBuffer::new(22_050, vec![vec![0.0; 3], vec![0.0; 3]]);
        let bytes = WavEncoder::write_wav(&buf);
        assert_eq!(bytes.len(), HEADER_LEN + 12);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + 12);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 22_050);
        assert_eq!(u32_at(&bytes, 28), 22_050 * 4);
        assert_eq!(u16_at(&bytes, 32), 4);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 12);
    }

    #[test]
    fn samples_are_clamped_and_interleaved() {
        let buf = DecodedBuffer::new(8000, vec![vec![2.0, 0.5], vec![-3.0, f32::NAN]]);
        let bytes = WavEncoder::write_wav(&buf);
        let samples: Vec<i16> = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32767, 16384, 0]);
    }

    #[test]
    fn oversized_data_is_cut_to_the_riff_limit() {
        assert_eq!(writable_frames(1000, 2), 1000);
        let mono = writable_frames(usize::MAX, 2);
        assert_eq!(mono as u64, (u32::MAX as u64 - 36) / 2);
        assert!(36 + mono as u64 * 2 <= u32::MAX as u64);
        let stereo = writable_frames(usize::MAX, 4);
        assert!(36 + stereo as u64 * 4 <= u32::MAX as u64);
    }

    #[test]
    fn byte_rate_saturates_at_extreme_rates() {
        let buf = DecodedBuffer::new(u32::MAX, vec![vec![0.0], vec![0.0]]);
        let bytes = WavEncoder::write_wav(&buf);
        assert_eq!(u32_at(&bytes, 24), u32::MAX);
        assert_eq!(u32_at(&bytes, 28), u32::MAX);
        assert_eq!(u16_at(&bytes, 32), 4);
    }

    #[test]
    fn empty_buffer_is_a_bare_header() {
        let bytes = WavEncoder::write_wav(&DecodedBuffer::new(44_100, vec![]));
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(u16_at(&bytes, 22), 1);
        assert_eq!(u32_at(&bytes, 40), 0);
    }
}
