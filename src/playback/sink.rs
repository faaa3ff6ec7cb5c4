use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::DecodedBuffer;
use crate::error::Result;
use crate::timeline::ClipId;

/// An output backend. It owns the clock every scheduled start refers to.
pub trait AudioSink: Send + Sync + 'static {
    /// Monotonic seconds on the sink's own clock.
    fn current_time(&self) -> f64;

    /// Queue `voice` to start at `voice.start_at` on the sink clock.
    fn schedule(&self, voice: ScheduledVoice) -> Result<VoiceHandle>;

    /// Silence a voice. Once this returns no further samples of it are emitted.
    fn stop(&self, handle: &VoiceHandle) {
        handle.silence();
    }
}

/// One clip's samples, anchored on the sink clock.
#[derive(Debug, Clone)]
pub struct ScheduledVoice {
    pub clip: ClipId,
    pub buffer: Arc<DecodedBuffer>,
    /// Sink time of the first emitted sample.
    pub start_at: f64,
    /// Seconds into `buffer` where emission begins.
    pub offset: f64,
}

#[derive(Debug, Clone)]
pub struct VoiceHandle {
    pub clip: ClipId,
    stopped: Arc<AtomicBool>,
}

impl VoiceHandle {
    pub fn new(clip: ClipId) -> Self {
        Self { clip, stopped: Arc::new(AtomicBool::new(false)) }
    }

    pub fn silence(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Sink with no device behind it: a monotonic clock and a log of what was
/// scheduled. Used for headless export and for driving playback under a
/// paused tokio clock.
#[derive(Debug)]
pub struct HeadlessSink {
    epoch: tokio::time::Instant,
    log: std::sync::Mutex<Vec<(ScheduledVoice, VoiceHandle)>>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self { epoch: tokio::time::Instant::now(), log: std::sync::Mutex::new(Vec::new()) }
    }

    /// Every voice scheduled so far, oldest first.
    pub fn scheduled(&self) -> Vec<(ScheduledVoice, VoiceHandle)> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }
}

impl Default for HeadlessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for HeadlessSink {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn schedule(&self, voice: ScheduledVoice) -> Result<VoiceHandle> {
        let handle = VoiceHandle::new(voice.clip);
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((voice, handle.clone()));
        Ok(handle)
    }
}
