#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use voxline::playback::HeadlessSink;
use voxline::{AudioAsset, Editor, EditorConfig};

pub const RATE: u32 = 8_000;

/// 32-bit float WAV so decoded samples match exactly.
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).expect("wav writer");
        for &s in samples {
            writer.write_sample(s).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    bytes
}

/// Mono asset of constant `value` lasting `seconds` at `RATE`.
pub fn tone(value: f32, seconds: f64, known_duration: bool) -> AudioAsset {
    let frames = (seconds * RATE as f64).round() as usize;
    let samples = vec![value; frames];
    asset_from(&samples, known_duration)
}

pub fn asset_from(samples: &[f32], known_duration: bool) -> AudioAsset {
    let duration = known_duration.then(|| samples.len() as f64 / RATE as f64);
    AudioAsset::new(wav_bytes(samples, RATE, 1), duration, "line", "narrator")
}

pub fn garbage(duration: Option<f64>) -> AudioAsset {
    AudioAsset::new(b"definitely not audio".to_vec(), duration, "bad", "narrator")
}

pub fn config() -> EditorConfig {
    EditorConfig { sample_rate: RATE, ..EditorConfig::default() }
}

pub fn editor() -> (Editor<HeadlessSink>, Arc<HeadlessSink>) {
    let sink = Arc::new(HeadlessSink::new());
    (Editor::new(config(), sink.clone()), sink)
}
