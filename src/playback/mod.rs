pub mod output;
pub mod scheduler;
pub mod sink;

pub use output::CpalSink;
pub use scheduler::{PlaybackEvent, PlaybackScheduler, PlaybackState, SessionStart};
pub use sink::{AudioSink, HeadlessSink, ScheduledVoice, VoiceHandle};
