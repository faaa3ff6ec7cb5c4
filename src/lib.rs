pub mod asset;
pub mod audio;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod playback;
pub mod timeline;

// Re-export the types most callers need
pub use asset::{AssetId, AudioAsset};
pub use audio::{AudioSourceCache, DecodedBuffer};
pub use config::EditorConfig;
pub use editor::{Editor, EditorHandle};
pub use error::{Error, Result};
pub use export::{ExportFormat, ExportedAudio};
pub use playback::{AudioSink, PlaybackEvent, PlaybackState};
pub use timeline::{Clip, ClipId, Timeline};
