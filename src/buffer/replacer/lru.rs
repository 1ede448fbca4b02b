//! LRU (Least-Recently-Used) replacement policy.

use std::collections::{BTreeMap, HashMap};

use crate::common::FrameId;

#[derive(Debug, Clone, Copy)]
struct LruEntry {
    /// Logical time of the most recent access.
    last_access: u64,
    evictable: bool,
}

/// Evicts the least recently used evictable frame.
///
/// Every tracked frame carries the logical timestamp of its last access.
/// Evictable frames are additionally indexed by that timestamp, so picking
/// a victim is a pop from the front of an ordered map. Timestamps are
/// unique, so the victim is always well defined.
///
/// Pinned frames are never candidates: the pool marks a frame
/// non-evictable when it is pinned and evictable when its pin count drops
/// back to zero.
#[derive(Debug, Default)]
pub struct LruReplacer {
    clock: u64,
    entries: HashMap<FrameId, LruEntry>,
    /// last_access -> frame, evictable frames only.
    candidates: BTreeMap<u64, FrameId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a frame was accessed, making it the most recently used.
    ///
    /// Starts tracking the frame (as non-evictable) if it is new.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        let now = self.clock;

        match self.entries.get_mut(&frame_id) {
            Some(entry) => {
                if entry.evictable {
                    self.candidates.remove(&entry.last_access);
                    self.candidates.insert(now, frame_id);
                }
                entry.last_access = now;
            }
            None => {
                self.entries.insert(
                    frame_id,
                    LruEntry {
                        last_access: now,
                        evictable: false,
                    },
                );
            }
        }
    }

    /// Mark a tracked frame as evictable or not. Untracked frames are ignored.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let Some(entry) = self.entries.get_mut(&frame_id) else {
            return;
        };
        if entry.evictable == evictable {
            return;
        }
        entry.evictable = evictable;
        if evictable {
            self.candidates.insert(entry.last_access, frame_id);
        } else {
            self.candidates.remove(&entry.last_access);
        }
    }

    /// Pick and stop tracking the least recently used evictable frame.
    ///
    /// Returns `None` if every tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let (_, frame_id) = self.candidates.pop_first()?;
        self.entries.remove(&frame_id);
        Some(frame_id)
    }

    /// Stop tracking a frame entirely.
    pub fn remove(&mut self, frame_id: FrameId) {
        if let Some(entry) = self.entries.remove(&frame_id) {
            if entry.evictable {
                self.candidates.remove(&entry.last_access);
            }
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.candidates.len()
    }

    /// Number of tracked frames, evictable or not.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.entries.len()
    }
}
