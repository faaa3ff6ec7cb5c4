//! Real-time playback of the whole timeline from any offset.
//!
//! Every clip in a session is anchored to one zero-time captured on the sink
//! clock when the session starts. Clips starting later are queued at
//! `zero + start`; clips already running are started now, `from - start`
//! seconds into their samples. Nothing is ever scheduled against a fresh
//! reading of the clock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sink::{AudioSink, ScheduledVoice, VoiceHandle};
use crate::audio::AudioSourceCache;
use crate::timeline::{Clip, ClipId, SharedTimeline};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started { from: f64, total_duration: f64 },
    Position(f64),
    /// Halted by `stop` (or by a seek restarting the session).
    Stopped,
    /// Reached the end of the timeline on its own.
    Finished,
}

/// What a successful `play` put on the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStart {
    pub from: f64,
    pub total_duration: f64,
    pub scheduled: Vec<ClipId>,
    /// Clips that intersect the range but could not be decoded.
    pub skipped: Vec<ClipId>,
}

struct Session {
    id: u64,
    zero_time: f64,
    total_duration: f64,
    voices: Vec<VoiceHandle>,
    cancel: CancellationToken,
}

impl Session {
    fn position(&self, now: f64) -> f64 {
        (now - self.zero_time).clamp(0.0, self.total_duration)
    }
}

#[derive(Default)]
struct Transport {
    session: Option<Session>,
    idle_position: f64,
    /// Bumped by every play and stop; a play whose ticket is stale by the
    /// time its decodes finish gives up.
    generation: u64,
    /// Ticket of a play still resolving its clips.
    pending: Option<u64>,
}

impl Transport {
    fn settle(&mut self, ticket: u64) {
        if self.pending == Some(ticket) {
            self.pending = None;
        }
    }
}

struct Shared<S> {
    sink: Arc<S>,
    transport: Mutex<Transport>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl<S: AudioSink> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn halt(&self, session: Session) {
        session.cancel.cancel();
        for voice in &session.voices {
            self.sink.stop(voice);
        }
    }

    /// End `session_id` if it is still the active one.
    fn finish(&self, session_id: u64) {
        let mut transport = self.lock();
        if transport.session.as_ref().map(|s| s.id) != Some(session_id) {
            return;
        }
        let Some(session) = transport.session.take() else {
            return;
        };
        transport.idle_position = 0.0;
        drop(transport);

        info!(session = session_id, total = session.total_duration, "Playback finished");
        self.halt(session);
        self.emit(PlaybackEvent::Finished);
    }
}

pub struct PlaybackScheduler<S: AudioSink> {
    shared: Arc<Shared<S>>,
    timeline: SharedTimeline,
    cache: Arc<AudioSourceCache>,
    poll_interval: Duration,
}

impl<S: AudioSink> PlaybackScheduler<S> {
    pub fn new(
        sink: Arc<S>,
        timeline: SharedTimeline,
        cache: Arc<AudioSourceCache>,
        poll_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared { sink, transport: Mutex::new(Transport::default()), events }),
            timeline,
            cache,
            poll_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        if self.shared.lock().session.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Derived from the sink clock while playing, capped at the session's
    /// total duration.
    pub fn position(&self) -> f64 {
        let transport = self.shared.lock();
        match &transport.session {
            Some(session) => session.position(self.shared.sink.current_time()),
            None => transport.idle_position,
        }
    }

    /// Start a new session at `from` seconds. Returns `None` when there is
    /// nothing to play (empty timeline, or superseded by a later call).
    pub async fn play(&self, from: f64) -> Option<SessionStart> {
        let (ticket, previous) = {
            let mut transport = self.shared.lock();
            transport.generation += 1;
            transport.pending = Some(transport.generation);
            (transport.generation, transport.session.take())
        };
        if let Some(session) = previous {
            self.shared.halt(session);
            self.shared.emit(PlaybackEvent::Stopped);
        }

        let clips = self.timeline.snapshot();
        if clips.is_empty() {
            self.shared.lock().settle(ticket);
            debug!("Play requested on an empty timeline");
            return None;
        }
        let total_duration = clips.iter().map(Clip::end).fold(0.0, f64::max);
        let from = if from.is_finite() { from.clamp(0.0, total_duration) } else { 0.0 };

        let mut ready = Vec::new();
        let mut skipped = Vec::new();
        for clip in clips.into_iter().filter(|c| c.is_resolved() && c.intersects(from, total_duration)) {
            match self.cache.resolve(&clip.asset).await {
                Ok(buffer) => ready.push((clip, buffer)),
                Err(e) => {
                    warn!(clip = %clip.id, error = %e, "Skipping clip that failed to decode");
                    skipped.push(clip.id);
                }
            }
        }

        let mut transport = self.shared.lock();
        transport.settle(ticket);
        if transport.generation != ticket {
            debug!("Play superseded while decoding");
            return None;
        }

        let now = self.shared.sink.current_time();
        let zero_time = now - from;
        let mut voices = Vec::with_capacity(ready.len());
        let mut scheduled = Vec::with_capacity(ready.len());
        for (clip, buffer) in ready {
            let voice = if clip.start >= from {
                ScheduledVoice { clip: clip.id, buffer, start_at: zero_time + clip.start, offset: 0.0 }
            } else {
                ScheduledVoice { clip: clip.id, buffer, start_at: now, offset: from - clip.start }
            };
            debug!(clip = %clip.id, start_at = voice.start_at, offset = voice.offset, "Scheduling clip");
            match self.shared.sink.schedule(voice) {
                Ok(handle) => {
                    voices.push(handle);
                    scheduled.push(clip.id);
                }
                Err(e) => {
                    warn!(clip = %clip.id, error = %e, "Sink rejected clip");
                    skipped.push(clip.id);
                }
            }
        }

        let cancel = CancellationToken::new();
        let session = Session { id: ticket, zero_time, total_duration, voices, cancel: cancel.clone() };
        transport.session = Some(session);
        drop(transport);

        info!(from, total = total_duration, clips = scheduled.len(), "Playback started");
        self.shared.emit(PlaybackEvent::Started { from, total_duration });
        tokio::spawn(track_position(
            self.shared.clone(),
            ticket,
            zero_time,
            total_duration,
            self.poll_interval,
            cancel,
        ));

        Some(SessionStart { from, total_duration, scheduled, skipped })
    }

    /// Halt every voice and reset the position. Safe to call at any time.
    pub fn stop(&self) {
        let mut transport = self.shared.lock();
        transport.generation += 1;
        transport.idle_position = 0.0;
        transport.pending = None;
        let Some(session) = transport.session.take() else {
            return;
        };
        drop(transport);

        info!(session = session.id, "Playback stopped");
        self.shared.halt(session);
        self.shared.emit(PlaybackEvent::Stopped);
    }

    /// Restart at `to` while playing or while a play is still decoding;
    /// otherwise just move the idle cursor.
    pub async fn seek(&self, to: f64) -> Option<SessionStart> {
        let active = {
            let transport = self.shared.lock();
            transport.session.is_some() || transport.pending.is_some()
        };
        if active {
            return self.play(to).await;
        }
        let total = self.timeline.total_duration();
        let to = if to.is_finite() { to.clamp(0.0, total) } else { 0.0 };
        self.shared.lock().idle_position = to;
        self.shared.emit(PlaybackEvent::Position(to));
        None
    }
}

impl<S: AudioSink> Drop for PlaybackScheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn track_position<S: AudioSink>(
    shared: Arc<Shared<S>>,
    session_id: u64,
    zero_time: f64,
    total_duration: f64,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let elapsed = shared.sink.current_time() - zero_time;
                let position = elapsed.clamp(0.0, total_duration);
                shared.emit(PlaybackEvent::Position(position));
                if position >= total_duration {
                    shared.finish(session_id);
                    break;
                }
            }
        }
    }
}
