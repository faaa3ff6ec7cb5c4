//! Compressed bytes to planar PCM via Symphonia.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::buffer::DecodedBuffer;
use crate::asset::AudioAsset;
use crate::error::{Error, Result};

/// Decode every packet of the asset's first audio track.
///
/// Blocking; callers on the async side go through `spawn_blocking`.
pub fn decode_asset(asset: &AudioAsset) -> Result<DecodedBuffer> {
    let source = Cursor::new(asset.bytes.clone());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::decode(asset.id, e))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::decode(asset.id, "no audio track"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| Error::decode(asset.id, e))?;

    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channel_count = params.channels.map(|c| c.count()).unwrap_or(0);
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::decode(asset.id, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(asset = %asset.id, error = %msg, "Skipping corrupted packet");
                continue;
            }
            Err(e) => return Err(Error::decode(asset.id, e)),
        };

        let spec = *decoded.spec();
        if decoded.frames() == 0 {
            continue;
        }
        sample_rate = spec.rate;
        channel_count = spec.channels.count();

        let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        samples.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(samples.samples());
    }

    if sample_rate == 0 || channel_count == 0 {
        return Err(Error::decode(asset.id, "stream reports no sample rate or channels"));
    }

    let buffer = DecodedBuffer::from_interleaved(sample_rate, channel_count, &interleaved);
    debug!(
        asset = %asset.id,
        sample_rate,
        channels = channel_count,
        frames = buffer.frames(),
        "Decoded asset"
    );
    Ok(buffer)
}
