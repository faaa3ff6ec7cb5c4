use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::clip::{clamp_offset, Clip, ClipId};
use crate::asset::AudioAsset;

/// The clip set of one editing session.
///
/// Clips are kept in insertion order; start-offset order is computed on
/// demand. This is the only place a `Clip` is ever mutated.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    clips: Vec<Clip>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place at the current end of the timeline. The asset's duration is
    /// taken as resolved by the caller.
    pub fn append_resolved(&mut self, asset: Arc<AudioAsset>, duration: f64) -> Clip {
        let start = self.total_duration();
        self.place(asset, start, Some(duration))
    }

    pub fn insert_at(&mut self, asset: Arc<AudioAsset>, start: f64) -> Clip {
        let duration = asset.duration;
        self.place(asset, start, duration)
    }

    pub fn place(&mut self, asset: Arc<AudioAsset>, start: f64, duration: Option<f64>) -> Clip {
        let clip = Clip {
            id: ClipId::new(),
            asset,
            start: clamp_offset(start),
            duration: duration.map(clamp_offset),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        debug!(clip = %clip.id, start = clip.start, duration = ?clip.duration, "Placed clip");
        self.clips.push(clip.clone());
        clip
    }

    /// Move a clip. No collision checks; overlap is legal.
    pub fn reposition(&mut self, id: ClipId, start: f64) -> Option<Clip> {
        let clip = self.clips.iter_mut().find(|c| c.id == id)?;
        clip.start = clamp_offset(start);
        Some(clip.clone())
    }

    /// Fill in a duration that was unknown at placement. A resolved duration
    /// never changes.
    pub fn resolve_duration(&mut self, id: ClipId, duration: f64) -> Option<Clip> {
        let clip = self.clips.iter_mut().find(|c| c.id == id)?;
        if clip.duration.is_none() {
            clip.duration = Some(clamp_offset(duration));
        }
        Some(clip.clone())
    }

    /// Returns how many clips were actually removed.
    pub fn remove(&mut self, ids: &[ClipId]) -> usize {
        let ids: HashSet<&ClipId> = ids.iter().collect();
        let before = self.clips.len();
        self.clips.retain(|c| !ids.contains(&c.id));
        before - self.clips.len()
    }

    /// Lay the selected clips out back to back, `gap` seconds apart, anchored
    /// at the earliest selected start. Unselected clips stay where they are.
    pub fn redistribute(&mut self, ids: &[ClipId], gap: f64) {
        let gap = clamp_offset(gap);
        let selected: HashSet<&ClipId> = ids.iter().collect();
        let mut order: Vec<(f64, u64, usize)> = self
            .clips
            .iter()
            .enumerate()
            .filter(|(_, c)| selected.contains(&c.id))
            .map(|(i, c)| (c.start, c.seq, i))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let Some(&(anchor, _, _)) = order.first() else {
            return;
        };
        let mut cursor = anchor;
        for (_, _, index) in order {
            let clip = &mut self.clips[index];
            clip.start = cursor;
            cursor = clip.end() + gap;
        }
    }

    /// Latest clip end; unresolved clips contribute their start only.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(Clip::end).fold(0.0, f64::max)
    }

    /// Clips ordered by start offset, ties in insertion order.
    pub fn clips(&self) -> Vec<Clip> {
        let mut clips = self.clips.clone();
        clips.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.seq.cmp(&b.seq)));
        clips
    }

    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Pairs of clips whose intervals share a positive stretch of time,
    /// earlier-starting clip first.
    pub fn overlaps(&self) -> Vec<(ClipId, ClipId)> {
        let ordered = self.clips();
        let mut pairs = Vec::new();
        for (i, a) in ordered.iter().enumerate() {
            for b in &ordered[i + 1..] {
                if a.end().min(b.end()) - b.start > 0.0 {
                    pairs.push((a.id, b.id));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(duration: Option<f64>) -> Arc<AudioAsset> {
        Arc::new(AudioAsset::new(Vec::<u8>::new(), duration, "text", "voice"))
    }

    #[test]
    fn empty_timeline_has_zero_duration() {
        assert_eq!(Timeline::new().total_duration(), 0.0);
    }

    #[test]
    fn append_after_append_is_contiguous() {
        let mut t = Timeline::new();
        let a = t.append_resolved(asset(Some(3.0)), 3.0);
        let b = t.append_resolved(asset(Some(2.0)), 2.0);
        assert_eq!(a.start, 0.0);
        assert_eq!(b.start, a.end());
        assert_eq!(t.total_duration(), 5.0);
    }

    #[test]
    fn total_duration_is_max_end_not_last_clip() {
        let mut t = Timeline::new();
        t.insert_at(asset(Some(10.0)), 0.0);
        t.insert_at(asset(Some(1.0)), 4.0);
        assert_eq!(t.total_duration(), 10.0);
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        let mut t = Timeline::new();
        let c = t.insert_at(asset(Some(1.0)), -4.0);
        assert_eq!(c.start, 0.0);
        let moved = t.reposition(c.id, f64::NAN).unwrap();
        assert_eq!(moved.start, 0.0);
    }

    #[test]
    fn unresolved_clip_counts_start_only() {
        let mut t = Timeline::new();
        let c = t.insert_at(asset(None), 2.0);
        assert_eq!(t.total_duration(), 2.0);
        t.resolve_duration(c.id, 1.5);
        assert_eq!(t.total_duration(), 3.5);
        t.resolve_duration(c.id, 9.0);
        assert_eq!(t.get(c.id).unwrap().duration, Some(1.5));
    }

    #[test]
    fn remove_ignores_unknown_ids() {
        let mut t = Timeline::new();
        let c = t.insert_at(asset(Some(1.0)), 0.0);
        assert_eq!(t.remove(&[ClipId::new()]), 0);
        assert_eq!(t.remove(&[c.id, c.id]), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn ordering_is_stable_for_equal_starts() {
        let mut t = Timeline::new();
        let a = t.insert_at(asset(Some(1.0)), 1.0);
        let b = t.insert_at(asset(Some(1.0)), 0.0);
        let c = t.insert_at(asset(Some(1.0)), 1.0);
        let ids: Vec<ClipId> = t.clips().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);
    }

    #[test]
    fn redistribute_anchors_on_earliest_selected() {
        let mut t = Timeline::new();
        let a = t.insert_at(asset(Some(2.0)), 7.0);
        let b = t.insert_at(asset(Some(1.0)), 3.0);
        let untouched = t.insert_at(asset(Some(1.0)), 4.0);
        let c = t.insert_at(asset(Some(0.5)), 20.0);

        t.redistribute(&[a.id, b.id, c.id], 0.25);

        assert_eq!(t.get(b.id).unwrap().start, 3.0);
        assert_eq!(t.get(a.id).unwrap().start, 4.25);
        assert_eq!(t.get(c.id).unwrap().start, 6.5);
        assert_eq!(t.get(untouched.id).unwrap().start, 4.0);
    }

    #[test]
    fn redistribute_clamps_negative_gap() {
        let mut t = Timeline::new();
        let a = t.insert_at(asset(Some(1.0)), 0.0);
        let b = t.insert_at(asset(Some(1.0)), 5.0);
        t.redistribute(&[a.id, b.id], -3.0);
        assert_eq!(t.get(b.id).unwrap().start, 1.0);
    }

    #[test]
    fn overlaps_report_intersecting_pairs() {
        let mut t = Timeline::new();
        let a = t.insert_at(asset(Some(3.0)), 0.0);
        let b = t.insert_at(asset(Some(2.0)), 3.0);
        let c = t.insert_at(asset(Some(2.0)), 2.5);
        let pairs = t.overlaps();
        assert_eq!(pairs, vec![(a.id, c.id), (c.id, b.id)]);
    }
}
