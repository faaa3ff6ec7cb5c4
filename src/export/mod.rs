pub mod encoder;
pub mod mixer;
pub mod mp3;
pub mod wav;

pub use encoder::{AudioEncoder, ExportFormat, ExportedAudio, Exporter};
pub use mixer::{mix, MixSource, Mixer};
pub use mp3::Mp3Encoder;
pub use wav::WavEncoder;
