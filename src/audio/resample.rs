use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::buffer::DecodedBuffer;
use crate::error::{Error, Result};

/// Bring a buffer to `to_rate`, keeping its channel layout.
///
/// The output length is trimmed or padded to `round(frames * to_rate / from_rate)`
/// so the buffer's duration survives the conversion.
pub fn resample(buffer: DecodedBuffer, to_rate: u32) -> Result<DecodedBuffer> {
    if buffer.sample_rate == to_rate || buffer.is_empty() {
        return Ok(DecodedBuffer::new(to_rate, buffer.channels));
    }
    if buffer.sample_rate == 0 {
        return Err(Error::Resample("source sample rate is zero".into()));
    }

    let input_len = buffer.frames();
    let ratio = to_rate as f64 / buffer.sample_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_len, buffer.channel_count())
        .map_err(|e| Error::Resample(e.to_string()))?;
    let mut output = resampler
        .process(&buffer.channels, None)
        .map_err(|e| Error::Resample(e.to_string()))?;
    // The last input frames are still in the filter's delay line.
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| Error::Resample(e.to_string()))?;
    for (channel, rest) in output.iter_mut().zip(tail) {
        channel.extend(rest);
    }

    let expected = (input_len as f64 * ratio).round() as usize;
    for channel in &mut output {
        channel.resize(expected, 0.0);
    }
    Ok(DecodedBuffer::new(to_rate, output))
}
