use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::asset::AudioAsset;
use crate::audio::{AudioSourceCache, DecodedBuffer};
use crate::config::EditorConfig;
use crate::error::Result;
use crate::export::{AudioEncoder, ExportedAudio, Exporter, Mixer, Mp3Encoder};
use crate::playback::{AudioSink, PlaybackEvent, PlaybackScheduler, PlaybackState, SessionStart};
use crate::timeline::{Clip, ClipId, SharedTimeline};

/// One editing session: the timeline plus everything that reads it.
pub struct Editor<S: AudioSink> {
    config: EditorConfig,
    timeline: SharedTimeline,
    cache: Arc<AudioSourceCache>,
    scheduler: PlaybackScheduler<S>,
    mixer: Mixer,
    exporter: Exporter,
}

impl<S: AudioSink> Editor<S> {
    /// MP3 export when compiled in, WAV otherwise.
    pub fn new(config: EditorConfig, sink: Arc<S>) -> Self {
        let encoder = Mp3Encoder::new(config.mp3_bitrate_kbps, config.encode_block_frames);
        Self::with_encoder(config, sink, Box::new(encoder))
    }

    pub fn with_encoder(config: EditorConfig, sink: Arc<S>, encoder: Box<dyn AudioEncoder>) -> Self {
        let timeline = SharedTimeline::default();
        let cache = Arc::new(AudioSourceCache::new(config.sample_rate));
        let scheduler =
            PlaybackScheduler::new(sink, timeline.clone(), cache.clone(), config.poll_interval());
        Self {
            mixer: Mixer::new(cache.clone()),
            exporter: Exporter::new(encoder),
            config,
            timeline,
            cache,
            scheduler,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }

    pub fn cache(&self) -> &Arc<AudioSourceCache> {
        &self.cache
    }

    /// Place `asset` at the end of the timeline.
    ///
    /// An unknown duration is resolved first, and the clip lands at the end
    /// of the timeline as it stands once that finishes. Two appends racing
    /// on undecoded assets therefore never overlap each other.
    pub async fn append(&self, asset: AudioAsset) -> Result<Clip> {
        let duration = self.cache.probe_duration(&asset).await?;
        let clip = self.timeline.write().append_resolved(Arc::new(asset), duration);
        info!(clip = %clip.id, start = clip.start, duration, "Appended clip");
        Ok(clip)
    }

    /// Place `asset` at an explicit offset (clamped to zero).
    ///
    /// The clip exists as soon as this is called; an unknown duration is
    /// filled in once decoded. If decoding fails the clip is taken back out.
    pub async fn insert_at(&self, asset: AudioAsset, start: f64) -> Result<Clip> {
        let asset = Arc::new(asset);
        let clip = self.timeline.write().insert_at(asset.clone(), start);
        if clip.is_resolved() {
            return Ok(clip);
        }

        match self.cache.probe_duration(&asset).await {
            Ok(duration) => Ok(self.timeline.write().resolve_duration(clip.id, duration).unwrap_or(clip)),
            Err(e) => {
                warn!(clip = %clip.id, error = %e, "Removing clip whose asset failed to decode");
                self.timeline.write().remove(&[clip.id]);
                Err(e)
            }
        }
    }

    pub fn reposition(&self, clip: ClipId, start: f64) -> Option<Clip> {
        self.timeline.write().reposition(clip, start)
    }

    pub fn remove(&self, clips: &[ClipId]) -> usize {
        self.timeline.write().remove(clips)
    }

    pub fn redistribute(&self, clips: &[ClipId], gap: f64) {
        self.timeline.write().redistribute(clips, gap);
    }

    pub fn clips(&self) -> Vec<Clip> {
        self.timeline.snapshot()
    }

    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    pub fn overlaps(&self) -> Vec<(ClipId, ClipId)> {
        self.timeline.read().overlaps()
    }

    pub async fn play(&self, from: f64) -> Option<SessionStart> {
        self.scheduler.play(from).await
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub async fn seek(&self, to: f64) -> Option<SessionStart> {
        self.scheduler.seek(to).await
    }

    pub fn position(&self) -> f64 {
        self.scheduler.position()
    }

    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.scheduler.subscribe()
    }

    /// Mix the clip set as it is right now; later edits do not affect it.
    pub async fn render(&self) -> Result<DecodedBuffer> {
        let snapshot = self.timeline.snapshot();
        self.mixer.render(&snapshot).await
    }

    pub async fn export(&self) -> Result<ExportedAudio> {
        let mixdown = self.render().await?;
        Ok(self.exporter.export(&mixdown))
    }
}
