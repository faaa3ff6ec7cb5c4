pub mod buffer;
pub mod cache;
pub mod decode;
pub mod resample;

pub use buffer::DecodedBuffer;
pub use cache::AudioSourceCache;
