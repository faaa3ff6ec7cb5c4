/// Planar PCM held in memory: one `Vec<f32>` per channel, all the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self { sample_rate, channels }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { sample_rate, channels: vec![samples] }
    }

    pub fn silence(sample_rate: u32, frames: usize) -> Self {
        Self::mono(sample_rate, vec![0.0; frames])
    }

    /// Split interleaved samples into planar channels. Trailing samples that do
    /// not fill a whole frame are dropped.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, data: &[f32]) -> Self {
        let channel_count = channel_count.max(1);
        let frames = data.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in data.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self { sample_rate, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Average of all channels. A mono buffer comes back unmodified.
    pub fn to_mono(&self) -> Vec<f32> {
        match self.channels.len() {
            0 => Vec::new(),
            1 => self.channels[0].clone(),
            n => {
                let scale = 1.0 / n as f32;
                (0..self.frames())
                    .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                    .collect()
            }
        }
    }

    /// Sample `frame` of `channel`, or silence when out of range. Channels past
    /// the last one repeat the last channel so mono sources fill stereo outputs.
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        let Some(last) = self.channels.len().checked_sub(1) else {
            return 0.0;
        };
        self.channels[channel.min(last)].get(frame).copied().unwrap_or(0.0)
    }
}
