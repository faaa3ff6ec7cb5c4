use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::buffer::DecodedBuffer;
use super::{decode, resample};
use crate::asset::{AssetId, AudioAsset};
use crate::error::{Error, Result};

type Slot = Arc<OnceCell<Arc<DecodedBuffer>>>;

/// Decode-once store of PCM buffers keyed by asset.
///
/// Every buffer is normalized to the engine rate on the way in. Concurrent
/// `resolve` calls for the same asset share one slot, so only one decode is
/// ever in flight per asset; the others wait on it. A failed decode leaves the
/// slot empty and the next caller tries again.
pub struct AudioSourceCache {
    sample_rate: u32,
    slots: Mutex<HashMap<AssetId, Slot>>,
    decodes: AtomicUsize,
}

impl AudioSourceCache {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            slots: Mutex::new(HashMap::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub async fn resolve(&self, asset: &AudioAsset) -> Result<Arc<DecodedBuffer>> {
        let slot = self.slot(asset.id);
        if let Some(buffer) = slot.get() {
            debug!(asset = %asset.id, "Decode cache hit");
            return Ok(buffer.clone());
        }

        let buffer = slot
            .get_or_try_init(|| async {
                self.decodes.fetch_add(1, Ordering::SeqCst);
                let owned = asset.clone();
                let rate = self.sample_rate;
                info!(asset = %asset.id, bytes = asset.bytes.len(), "Decoding asset");
                let decoded = tokio::task::spawn_blocking(move || {
                    let buffer = decode::decode_asset(&owned)?;
                    resample::resample(buffer, rate).map_err(|e| Error::decode(owned.id, e))
                })
                .await
                .map_err(|e| Error::decode(asset.id, format!("decode task failed: {e}")))??;
                Ok::<_, Error>(Arc::new(decoded))
            })
            .await?;
        Ok(buffer.clone())
    }

    /// Known duration of the asset, decoding it if the creator did not supply one.
    pub async fn probe_duration(&self, asset: &AudioAsset) -> Result<f64> {
        if let Some(duration) = asset.duration {
            return Ok(duration);
        }
        Ok(self.resolve(asset).await?.duration())
    }

    pub fn cached(&self, id: AssetId) -> Option<Arc<DecodedBuffer>> {
        self.lock().get(&id).and_then(|slot| slot.get().cloned())
    }

    /// Number of decodes started since creation, successful or not.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: AssetId) -> Slot {
        self.lock().entry(id).or_default().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AssetId, Slot>> {
        // Slots are only ever inserted, so a poisoned map is still consistent.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
