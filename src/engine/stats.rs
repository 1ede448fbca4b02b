//! Aggregate engine statistics.

use std::fmt;

use serde::Serialize;

/// A snapshot of engine-wide counters.
///
/// `buffer_hits` and `buffer_misses` are cumulative since the engine was
/// opened; the page counts reflect the allocation state at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Highest allocated extent.
    pub total_pages: u32,
    /// Size of the free list.
    pub free_pages: usize,
    pub buffer_hits: u64,
    pub buffer_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    /// Frames currently holding a page. Never exceeds the buffer size.
    pub resident_frames: usize,
}

impl StorageStats {
    /// Buffer hit rate in `[0, 1]`; 0 before any page request.
    pub fn hit_rate(&self) -> f64 {
        let total = self.buffer_hits + self.buffer_misses;
        if total == 0 {
            0.0
        } else {
            self.buffer_hits as f64 / total as f64
        }
    }

    /// Pages that are allocated and not on the free list.
    pub fn live_pages(&self) -> usize {
        (self.total_pages as usize).saturating_sub(self.free_pages)
    }
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages: {} ({} free), hits: {}, misses: {}, evictions: {}, resident: {}, hit_rate: {:.2}%",
            self.total_pages,
            self.free_pages,
            self.buffer_hits,
            self.buffer_misses,
            self.evictions,
            self.resident_frames,
            self.hit_rate() * 100.0
        )
    }
}
