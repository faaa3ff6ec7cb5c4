use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::clip::Clip;
use super::store::Timeline;

/// Cloneable handle to the session's timeline.
///
/// Locks are held for a single store call and never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedTimeline {
    inner: Arc<RwLock<Timeline>>,
}

impl SharedTimeline {
    pub fn new(timeline: Timeline) -> Self {
        Self { inner: Arc::new(RwLock::new(timeline)) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Timeline> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Timeline> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Frozen, start-ordered copy of the clip set.
    pub fn snapshot(&self) -> Vec<Clip> {
        self.read().clips()
    }

    pub fn total_duration(&self) -> f64 {
        self.read().total_duration()
    }
}
