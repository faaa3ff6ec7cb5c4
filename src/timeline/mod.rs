pub mod clip;
pub mod shared;
pub mod store;

pub use clip::{Clip, ClipId, ClipSummary};
pub use shared::SharedTimeline;
pub use store::Timeline;
