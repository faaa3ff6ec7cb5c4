use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{error, info, warn};

use super::sink::{AudioSink, ScheduledVoice, VoiceHandle};
use crate::audio::DecodedBuffer;
use crate::error::{Error, Result};

/// Voices that can be queued between two audio callbacks.
const QUEUE_CAPACITY: usize = 256;

/// A voice as the audio thread sees it.
struct Voice {
    handle: VoiceHandle,
    buffer: Arc<DecodedBuffer>,
    /// Device frame at which the voice's `offset` sample plays.
    start_frame: u64,
    /// First source frame to emit.
    offset_frames: f64,
    /// Source frames advanced per device frame.
    step: f64,
}

impl Voice {
    fn source_index(&self, frame: u64) -> Option<usize> {
        if frame < self.start_frame {
            return None;
        }
        let position = self.offset_frames + (frame - self.start_frame) as f64 * self.step;
        Some(position as usize)
    }

    fn finished_at(&self, frame: u64) -> bool {
        self.handle.is_stopped()
            || self.source_index(frame).is_some_and(|i| i >= self.buffer.frames())
    }
}

/// Default output device through cpal.
///
/// The stream lives on its own thread because cpal streams are not `Send` on
/// every host. New voices cross over on a lock-free queue; the clock is the
/// count of frames the device has consumed.
pub struct CpalSink {
    frames: Arc<AtomicU64>,
    device_rate: u32,
    queue: Mutex<HeapProd<Voice>>,
    shutdown: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device, preferring `preferred_rate`.
    pub fn open(preferred_rate: u32) -> anyhow::Result<Self> {
        let frames = Arc::new(AtomicU64::new(0));
        let (producer, consumer) = HeapRb::<Voice>::new(QUEUE_CAPACITY).split();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        let thread_frames = frames.clone();
        let thread = std::thread::Builder::new()
            .name("voxline-output".into())
            .spawn(move || {
                match build_stream(preferred_rate, consumer, thread_frames) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        // Keep the stream alive until the sink is dropped.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("audio output thread exited during setup"))??;

        Ok(Self {
            frames,
            device_rate,
            queue: Mutex::new(producer),
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl AudioSink for CpalSink {
    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.device_rate as f64
    }

    fn schedule(&self, voice: ScheduledVoice) -> Result<VoiceHandle> {
        let handle = VoiceHandle::new(voice.clip);
        let source_rate = voice.buffer.sample_rate.max(1) as f64;
        let device_rate = self.device_rate as f64;
        let queued = Voice {
            handle: handle.clone(),
            start_frame: (voice.start_at.max(0.0) * device_rate).round() as u64,
            offset_frames: voice.offset.max(0.0) * source_rate,
            step: source_rate / device_rate,
            buffer: voice.buffer,
        };

        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        queue
            .try_push(queued)
            .map_err(|_| Error::Output("voice queue is full".into()))?;
        Ok(handle)
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

fn build_stream(
    preferred_rate: u32,
    mut incoming: HeapCons<Voice>,
    frames: Arc<AtomicU64>,
) -> anyhow::Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("No output device available"))?;

    info!("Audio Output Device: {}", device.name().unwrap_or_default());

    let matching = device.supported_output_configs()?.find(|range| {
        range.sample_format() == cpal::SampleFormat::F32
            && range.min_sample_rate().0 <= preferred_rate
            && range.max_sample_rate().0 >= preferred_rate
    });
    let config = match matching {
        Some(range) => range.with_sample_rate(cpal::SampleRate(preferred_rate)),
        None => device.default_output_config()?,
    };
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(anyhow::anyhow!("Unsupported output sample format: {:?}", config.sample_format()));
    }

    let rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    info!("Audio Output Config: Rate={}Hz, Channels={}", rate, channels);

    let mut voices: Vec<Voice> = Vec::with_capacity(QUEUE_CAPACITY);
    let err_fn = |err| error!("an error occurred on output stream: {}", err);

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            while let Some(voice) = incoming.try_pop() {
                voices.push(voice);
            }
            let base = frames.load(Ordering::Relaxed);
            render(data, channels, base, &voices);
            let rendered = (data.len() / channels.max(1)) as u64;
            frames.store(base + rendered, Ordering::Release);
            voices.retain(|v| !v.finished_at(base + rendered));
        },
        err_fn,
        None,
    )?;
    stream.play()?;

    Ok((stream, rate))
}

/// Sum every active voice into one interleaved device block.
fn render(data: &mut [f32], channels: usize, base: u64, voices: &[Voice]) {
    data.fill(0.0);
    let channels = channels.max(1);
    for voice in voices.iter().filter(|v| !v.handle.is_stopped()) {
        for (i, frame) in data.chunks_exact_mut(channels).enumerate() {
            let Some(index) = voice.source_index(base + i as u64) else {
                continue;
            };
            if index >= voice.buffer.frames() {
                break;
            }
            for (channel, out) in frame.iter_mut().enumerate() {
                *out += voice.buffer.sample(channel, index);
            }
        }
    }
}
