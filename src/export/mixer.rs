//! Offline mixdown of the whole timeline into one mono buffer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{AudioSourceCache, DecodedBuffer};
use crate::error::{Error, Result};
use crate::timeline::Clip;

/// Tolerance absorbed before rounding a duration up to whole samples, so a
/// duration that came from `frames / rate` maps back to exactly `frames`.
const FRAME_EPSILON: f64 = 1e-9;

/// Longest mixdown in frames: a mono 16-bit WAV at the RIFF size limit.
pub const MAX_MIX_FRAMES: u64 = (u32::MAX as u64 - 36) / 2;

fn frame_count(total_duration: f64, rate: f64) -> f64 {
    (total_duration.max(0.0) * rate - FRAME_EPSILON).ceil().max(0.0)
}

/// One clip's samples at its timeline offset.
#[derive(Debug, Clone, Copy)]
pub struct MixSource<'a> {
    pub start: f64,
    pub samples: &'a [f32],
}

/// Sum `sources` into a zeroed buffer `ceil(total_duration * sample_rate)`
/// samples long. Samples landing past the end are dropped; sums are not
/// clamped. Callers bound `total_duration` first; `Mixer::render` checks it
/// against `MAX_MIX_FRAMES`.
pub fn mix(sources: &[MixSource<'_>], total_duration: f64, sample_rate: u32) -> DecodedBuffer {
    let rate = sample_rate as f64;
    let length = frame_count(total_duration, rate) as usize;
    let mut output = vec![0.0f32; length];

    for source in sources {
        let start_index = (source.start.max(0.0) * rate).round() as usize;
        if start_index >= length {
            continue;
        }
        for (out, &sample) in output[start_index..].iter_mut().zip(source.samples) {
            *out += sample;
        }
    }

    DecodedBuffer::mono(sample_rate, output)
}

pub struct Mixer {
    cache: Arc<AudioSourceCache>,
}

impl Mixer {
    pub fn new(cache: Arc<AudioSourceCache>) -> Self {
        Self { cache }
    }

    /// Render a frozen clip set. Any clip that fails to decode fails the
    /// render, naming its asset.
    pub async fn render(&self, clips: &[Clip]) -> Result<DecodedBuffer> {
        if clips.is_empty() {
            return Err(Error::EmptyTimeline);
        }
        let sample_rate = self.cache.sample_rate();

        let mut decoded = Vec::with_capacity(clips.len());
        for clip in clips {
            let buffer = self.cache.resolve(&clip.asset).await?;
            let duration = clip.duration.unwrap_or_else(|| buffer.duration());
            decoded.push((clip.start, duration, buffer.to_mono()));
        }

        let total_duration = decoded
            .iter()
            .map(|(start, duration, _)| start + duration)
            .fold(0.0, f64::max);
        if frame_count(total_duration, sample_rate as f64) > MAX_MIX_FRAMES as f64 {
            return Err(Error::MixdownTooLong { seconds: total_duration });
        }
        let sources: Vec<MixSource<'_>> = decoded
            .iter()
            .map(|(start, _, samples)| MixSource { start: *start, samples })
            .collect();

        debug!(clips = clips.len(), total = total_duration, "Mixing timeline");
        let output = mix(&sources, total_duration, sample_rate);
        info!(frames = output.frames(), sample_rate, "Mixdown complete");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_ceil_of_duration() {
        assert_eq!(mix(&[], 1.05, 10).frames(), 11);
        assert_eq!(mix(&[], 1.0, 10).frames(), 10);
        assert_eq!(mix(&[], 0.0, 10).frames(), 0);
    }

    #[test]
    fn non_overlapping_sources_are_copied_verbatim() {
        let a = [0.1, 0.2];
        let b = [0.3, 0.4];
        let out = mix(
            &[MixSource { start: 0.0, samples: &a }, MixSource { start: 0.4, samples: &b }],
            0.6,
            10,
        );
        assert_eq!(out.channels[0], vec![0.1, 0.2, 0.0, 0.0, 0.3, 0.4]);
    }

    #[test]
    fn overlapping_sources_sum_without_clamping() {
        let a = [0.75; 4];
        let b = [0.5; 4];
        let out = mix(
            &[MixSource { start: 0.0, samples: &a }, MixSource { start: 0.0, samples: &b }],
            0.4,
            10,
        );
        assert_eq!(out.channels[0], vec![1.25; 4]);
    }

    #[test]
    fn samples_past_the_end_are_truncated() {
        let a = [1.0; 8];
        let out = mix(&[MixSource { start: 0.2, samples: &a }], 0.5, 10);
        assert_eq!(out.channels[0], vec![0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
