//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - A bounded cache of page frames between callers and disk
//! - Pin-based reference counting
//! - LRU eviction among unpinned frames, with dirty write-back
//! - Invalidation of frames whose page was deallocated

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

/// Frame-table state, guarded by the pool's structural lock.
struct PoolState {
    /// Maps resident page IDs to their frames.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page.
    free_frames: Vec<FrameId>,
    replacer: LruReplacer,
}

/// How a newly installed frame gets its bytes.
#[derive(Clone, Copy)]
enum Fill<'d> {
    /// Read the block from disk.
    Disk,
    /// Take these bytes; the frame starts dirty.
    Bytes(&'d [u8]),
    /// Zero the frame; it starts dirty.
    Zeroed,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────────────────┐  ┌─────────────────────────┐  │
/// │  │ state: Mutex<PoolState>  │  │   frames: Vec<Frame>    │  │
/// │  │  page_table PageId→Fid   │─▶│ [F0] [F1] [F2] ...      │  │
/// │  │  free_frames             │  │ each: RwLock<bytes>,    │  │
/// │  │  replacer (LRU)          │  │ pin count, dirty flag   │  │
/// │  └──────────────────────────┘  └─────────────────────────┘  │
/// │  ┌──────────────────────────┐  ┌─────────────────────────┐  │
/// │  │ disk_manager: Mutex      │  │ stats: atomics          │  │
/// │  └──────────────────────────┘  └─────────────────────────┘  │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - `state` serializes every structural change: lookup + pin, installing a
///   page on a miss (including its disk read and any victim write-back),
///   unpin, and invalidation.
/// - Each frame's `RwLock` guards its bytes. Copies in and out of a pinned
///   frame happen under that latch only, so unrelated pages don't contend.
/// - A latch is only ever awaited under `state` for an unpinned frame,
///   which nobody else can be holding.
///
/// # Saturation
/// When every frame is pinned, requests that need a new frame fail fast
/// with [`Error::PoolSaturated`] rather than block.
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    state: Mutex<PoolState>,

    disk_manager: Mutex<DiskManager>,

    stats: BufferPoolStats,

    pool_size: usize,

    page_size: usize,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let page_size = disk_manager.page_size();
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new(page_size)).collect();
        // Reversed so that frame 0 is handed out first.
        let free_frames: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_frames,
                replacer: LruReplacer::new(),
            }),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
            page_size,
        }
    }

    // ========================================================================
    // Public API: pinned views
    // ========================================================================

    /// Pin a page for shared reading.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page is neither resident nor on disk
    /// - `Error::PoolSaturated` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let (frame_id, _) = self.pin_page(page_id, Fill::Disk)?;
        let lock = self.frames[frame_id.index()].data();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for exclusive writing. The frame is marked dirty on drop.
    ///
    /// # Errors
    /// Same as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let (frame_id, _) = self.pin_page(page_id, Fill::Disk)?;
        let lock = self.frames[frame_id.index()].data_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: copy-in / copy-out
    // ========================================================================

    /// Read path: return a copy of the page's bytes.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        let guard = self.fetch_page_read(page_id)?;
        Ok(guard.to_page())
    }

    /// Write path: overwrite the page's cached bytes and mark it dirty.
    ///
    /// Nothing is written through to disk. On a miss the new bytes are
    /// installed directly without reading the old block.
    ///
    /// # Errors
    /// - `Error::PageSizeMismatch` if `data` is not exactly one page
    /// - `Error::PoolSaturated` if all frames are pinned
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() != self.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.page_size,
                actual: data.len(),
            });
        }

        let (frame_id, hit) = self.pin_page(page_id, Fill::Bytes(data))?;
        if hit {
            let mut guard =
                PageWriteGuard::new(self, frame_id, page_id, self.frames[frame_id.index()].data_mut());
            guard.copy_from_slice(data);
        } else {
            self.unpin_frame(frame_id);
        }
        Ok(())
    }

    // ========================================================================
    // Public API: page lifecycle
    // ========================================================================

    /// Install a zeroed, dirty, unpinned frame for a freshly allocated page.
    ///
    /// An existing frame for the page is zeroed in place.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is resident and pinned
    /// - `Error::PoolSaturated` if all frames are pinned
    pub fn new_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.index()];
            if frame.is_pinned() {
                return Err(Error::PagePinned(page_id));
            }
            frame.data_mut().fill(0);
            frame.mark_dirty();
            state.replacer.record_access(frame_id);
            return Ok(());
        }

        let frame_id = self.install(&mut state, page_id, Fill::Zeroed)?;
        state.replacer.set_evictable(frame_id, true);
        trace!(%page_id, %frame_id, "installed zeroed frame");
        Ok(())
    }

    /// Drop any cached frame for `page_id` without writing it back.
    ///
    /// Returns whether a frame was dropped.
    ///
    /// # Errors
    /// `Error::PagePinned` if the frame is pinned.
    pub fn invalidate(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.index()];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id));
        }

        state.page_table.remove(&page_id);
        state.replacer.remove(frame_id);
        frame.reset();
        state.free_frames.push(frame_id);
        self.stats.record_invalidation();

        trace!(%page_id, %frame_id, "invalidated frame");
        Ok(true)
    }

    // ========================================================================
    // Public API: flushing
    // ========================================================================

    /// Write a resident page back to disk if it is dirty.
    ///
    /// Returns whether anything was written.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let mut state = self.state.lock();
            let Some(&frame_id) = state.page_table.get(&page_id) else {
                return Ok(false);
            };
            self.pin_locked(&mut state, frame_id);
            frame_id
        };

        let result = self.write_back(frame_id, page_id);
        self.unpin_frame(frame_id);
        result
    }

    /// Write every dirty frame back to disk.
    ///
    /// The dirty set is snapshotted and pinned under the pool lock, then
    /// flushed frame by frame under each frame's latch. Stops at the first
    /// failure; frames not yet written stay dirty.
    ///
    /// Returns the number of pages written.
    pub fn flush_all(&self) -> Result<usize> {
        let dirty: Vec<(PageId, FrameId)> = {
            let mut state = self.state.lock();
            let dirty: Vec<(PageId, FrameId)> = state
                .page_table
                .iter()
                .filter(|(_, fid)| self.frames[fid.index()].is_dirty())
                .map(|(&pid, &fid)| (pid, fid))
                .collect();
            for &(_, frame_id) in &dirty {
                self.pin_locked(&mut state, frame_id);
            }
            dirty
        };

        let mut written = 0;
        let mut failure = None;
        for &(page_id, frame_id) in &dirty {
            if failure.is_none() {
                match self.write_back(frame_id, page_id) {
                    Ok(true) => written += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!(%page_id, error = %e, "flush failed");
                        failure = Some(e);
                    }
                }
            }
            self.unpin_frame(frame_id);
        }

        match failure {
            Some(e) => Err(e),
            None => {
                debug!(written, "flushed dirty frames");
                Ok(written)
            }
        }
    }

    /// Flush OS buffers of the backing file.
    pub fn sync_disk(&self) -> Result<()> {
        self.disk_manager.lock().sync()
    }

    /// Release the backing file handle.
    pub fn close_disk(&self) -> Result<()> {
        self.disk_manager.lock().close()
    }

    // ========================================================================
    // Public API: stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_frames.len()
    }

    /// Number of resident pages. Never exceeds [`pool_size`](Self::pool_size).
    pub fn resident_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Pin count of a resident page, `None` if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.index()].pin_count())
    }

    /// Number of whole pages in the backing file.
    pub fn disk_block_count(&self) -> u32 {
        self.disk_manager.lock().block_count()
    }

    // ========================================================================
    // Internal: called by page guards
    // ========================================================================

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.index()]
    }

    /// Drop one pin; the frame becomes evictable when the count reaches 0.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if self.frames[frame_id.index()].unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: core fetch logic
    // ========================================================================

    /// Pin the frame holding `page_id`, installing the page on a miss.
    ///
    /// Returns the frame and whether the request was a hit.
    fn pin_page(&self, page_id: PageId, fill: Fill<'_>) -> Result<(FrameId, bool)> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.pin_locked(&mut state, frame_id);
            state.replacer.record_access(frame_id);
            self.stats.record_hit();
            trace!(%page_id, %frame_id, "buffer hit");
            return Ok((frame_id, true));
        }

        self.stats.record_miss();
        trace!(%page_id, "buffer miss");

        let frame_id = self.install(&mut state, page_id, fill)?;
        self.pin_locked(&mut state, frame_id);
        Ok((frame_id, false))
    }

    /// Claim a frame and load `page_id` into it. The frame is left unpinned
    /// and tracked as non-evictable.
    fn install(&self, state: &mut PoolState, page_id: PageId, fill: Fill<'_>) -> Result<FrameId> {
        let frame_id = self.acquire_frame(state)?;
        let frame = &self.frames[frame_id.index()];

        let loaded = {
            let mut data = frame.data_mut();
            match fill {
                Fill::Disk => self.load_block(page_id, &mut data),
                Fill::Bytes(bytes) => {
                    data.copy_from_slice(bytes);
                    Ok(())
                }
                Fill::Zeroed => {
                    data.fill(0);
                    Ok(())
                }
            }
        };
        if let Err(e) = loaded {
            frame.reset();
            state.free_frames.push(frame_id);
            return Err(e);
        }

        if !matches!(fill, Fill::Disk) {
            frame.mark_dirty();
        }
        frame.set_page_id(Some(page_id));
        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id);

        Ok(frame_id)
    }

    fn load_block(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let mut dm = self.disk_manager.lock();
        if page_id.0 >= dm.block_count() {
            return Err(Error::PageNotFound(page_id));
        }
        dm.read_block(page_id, buf)?;
        self.stats.record_read();
        Ok(())
    }

    /// Take a free frame, evicting the LRU unpinned page if necessary.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_frames.pop() {
            return Ok(frame_id);
        }

        let frame_id = state.replacer.evict().ok_or(Error::PoolSaturated {
            pool_size: self.pool_size,
        })?;
        let frame = &self.frames[frame_id.index()];

        if let Some(victim) = frame.page_id() {
            if let Err(e) = self.write_back(frame_id, victim) {
                // Keep the victim resident; its data was never written out.
                state.replacer.record_access(frame_id);
                state.replacer.set_evictable(frame_id, true);
                error!(page_id = %victim, error = %e, "write-back on eviction failed");
                return Err(e);
            }
            state.page_table.remove(&victim);
            trace!(page_id = %victim, %frame_id, "evicted");
        }

        frame.reset();
        self.stats.record_eviction();
        Ok(frame_id)
    }

    /// Write a frame's bytes to disk if dirty. Returns whether it wrote.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<bool> {
        let frame = &self.frames[frame_id.index()];
        let data = frame.data();
        if !frame.is_dirty() {
            return Ok(false);
        }

        self.disk_manager.lock().write_block(page_id, &data)?;
        frame.clear_dirty();
        self.stats.record_write();
        Ok(true)
    }

    fn pin_locked(&self, state: &mut PoolState, frame_id: FrameId) {
        self.frames[frame_id.index()].pin();
        state.replacer.set_evictable(frame_id, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const PS: usize = 512;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager, TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db"), PS, 1 << 20).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    /// A pool whose file may only grow to `max_pages` pages, so a dirty
    /// frame for any page at or past that limit cannot be written back.
    fn create_bounded_bpm(pool_size: usize, max_pages: u64) -> (BufferPoolManager, TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db"), PS, max_pages * PS as u64)
            .unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    fn is_dirty(bpm: &BufferPoolManager, page_id: PageId) -> bool {
        let frame_id = bpm.state.lock().page_table[&page_id];
        bpm.frames[frame_id.index()].is_dirty()
    }

    fn pid(i: u32) -> PageId {
        PageId::new(i)
    }

    #[test]
    fn test_new_page_is_zeroed_and_dirty() {
        let (bpm, _dir) = create_test_bpm(4);

        bpm.new_page(pid(0)).unwrap();

        assert!(bpm.is_resident(pid(0)));
        assert_eq!(bpm.pin_count(pid(0)), Some(0));
        let page = bpm.read_page(pid(0)).unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));
        assert!(bpm.frames[0].is_dirty());
    }

    #[test]
    fn test_write_then_read() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        bpm.write_page(pid(0), &[0xABu8; PS]).unwrap();

        let page = bpm.read_page(pid(0)).unwrap();
        assert_eq!(page.id(), pid(0));
        assert_eq!(page.as_slice(), &[0xABu8; PS][..]);
    }

    #[test]
    fn test_write_wrong_size_rejected() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        let result = bpm.write_page(pid(0), &[1u8; 10]);
        assert!(matches!(result, Err(Error::PageSizeMismatch { .. })));
        assert!(bpm.read_page(pid(0)).unwrap().as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_cache_hit_and_miss_counters() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        bpm.read_page(pid(0)).unwrap();
        bpm.read_page(pid(0)).unwrap();

        let snapshot = bpm.stats().snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 0);
    }

    #[test]
    fn test_eviction_is_lru() {
        let (bpm, _dir) = create_test_bpm(3);
        for i in 0..3 {
            bpm.new_page(pid(i)).unwrap();
        }

        // Touch 0 so that 1 becomes least recently used.
        bpm.read_page(pid(0)).unwrap();
        bpm.new_page(pid(3)).unwrap();

        assert!(bpm.is_resident(pid(0)));
        assert!(!bpm.is_resident(pid(1)));
        assert!(bpm.is_resident(pid(2)));
        assert_eq!(bpm.stats().snapshot().evictions, 1);
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let (bpm, _dir) = create_test_bpm(1);

        bpm.new_page(pid(0)).unwrap();
        bpm.write_page(pid(0), &[0x42u8; PS]).unwrap();

        // Installing page 1 evicts page 0, which must be written first.
        bpm.new_page(pid(1)).unwrap();
        assert_eq!(bpm.disk_block_count(), 1);

        let page = bpm.read_page(pid(0)).unwrap();
        assert_eq!(page.as_slice()[0], 0x42);
        assert_eq!(bpm.stats().snapshot().cache_misses, 1);
    }

    #[test]
    fn test_clean_eviction_does_not_write() {
        let (bpm, _dir) = create_test_bpm(1);
        bpm.new_page(pid(0)).unwrap();
        bpm.flush_all().unwrap();
        let written = bpm.stats().snapshot().pages_written;

        bpm.new_page(pid(1)).unwrap();
        assert_eq!(bpm.stats().snapshot().pages_written, written);
    }

    #[test]
    fn test_write_miss_skips_disk_read() {
        let (bpm, _dir) = create_test_bpm(1);
        bpm.new_page(pid(0)).unwrap();
        bpm.new_page(pid(1)).unwrap();

        bpm.write_page(pid(0), &[5u8; PS]).unwrap();

        let snapshot = bpm.stats().snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.pages_read, 0);
        assert_eq!(bpm.read_page(pid(0)).unwrap().as_slice()[0], 5);
    }

    #[test]
    fn test_invalidate_drops_without_flush() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();
        bpm.write_page(pid(0), &[9u8; PS]).unwrap();

        assert!(bpm.invalidate(pid(0)).unwrap());
        assert!(!bpm.is_resident(pid(0)));
        assert_eq!(bpm.free_frame_count(), 4);
        assert_eq!(bpm.stats().snapshot().pages_written, 0);

        // Nothing on disk, so the page is gone.
        assert!(matches!(bpm.read_page(pid(0)), Err(Error::PageNotFound(_))));
        assert!(!bpm.invalidate(pid(0)).unwrap());
    }

    #[test]
    fn test_invalidate_pinned_fails() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        let _guard = bpm.fetch_page_read(pid(0)).unwrap();
        assert!(matches!(bpm.invalidate(pid(0)), Err(Error::PagePinned(_))));
    }

    #[test]
    fn test_flush_page() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        assert!(bpm.flush_page(pid(0)).unwrap());
        assert!(!bpm.flush_page(pid(0)).unwrap());
        assert!(!bpm.flush_page(pid(7)).unwrap());
        assert_eq!(bpm.stats().snapshot().pages_written, 1);
        assert_eq!(bpm.pin_count(pid(0)), Some(0));
    }

    #[test]
    fn test_flush_all() {
        let (bpm, _dir) = create_test_bpm(8);
        for i in 0..5 {
            bpm.new_page(pid(i)).unwrap();
            bpm.write_page(pid(i), &[i as u8; PS]).unwrap();
        }

        assert_eq!(bpm.flush_all().unwrap(), 5);
        assert_eq!(bpm.flush_all().unwrap(), 0);
        assert_eq!(bpm.disk_block_count(), 5);
        assert!((0..5).all(|i| bpm.pin_count(pid(i)) == Some(0)));
    }

    #[test]
    fn test_write_guard_marks_dirty() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();
        bpm.flush_all().unwrap();

        {
            let mut guard = bpm.fetch_page_write(pid(0)).unwrap();
            guard[0] = 0xCD;
        }

        assert!(bpm.frames[0].is_dirty());
        assert_eq!(bpm.read_page(pid(0)).unwrap().as_slice()[0], 0xCD);
    }

    #[test]
    fn test_multiple_read_guards() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        let guard1 = bpm.fetch_page_read(pid(0)).unwrap();
        let guard2 = bpm.fetch_page_read(pid(0)).unwrap();
        assert_eq!(bpm.pin_count(pid(0)), Some(2));
        assert_eq!(guard1.page_id(), guard2.page_id());

        drop(guard1);
        drop(guard2);
        assert_eq!(bpm.pin_count(pid(0)), Some(0));
    }

    #[test]
    fn test_page_not_found() {
        let (bpm, _dir) = create_test_bpm(4);
        assert!(matches!(
            bpm.fetch_page_read(pid(999)),
            Err(Error::PageNotFound(_))
        ));
        // The claimed frame went back to the free list.
        assert_eq!(bpm.free_frame_count(), 4);
    }

    #[test]
    fn test_saturated_pool_fails_fast() {
        let (bpm, _dir) = create_test_bpm(2);
        bpm.new_page(pid(0)).unwrap();
        bpm.new_page(pid(1)).unwrap();
        bpm.new_page(pid(2)).unwrap(); // evicts 0

        let _guard1 = bpm.fetch_page_read(pid(1)).unwrap();
        let _guard2 = bpm.fetch_page_read(pid(2)).unwrap();

        assert!(matches!(
            bpm.fetch_page_read(pid(0)),
            Err(Error::PoolSaturated { pool_size: 2 })
        ));
        assert!(matches!(
            bpm.new_page(pid(3)),
            Err(Error::PoolSaturated { .. })
        ));
        assert!(bpm.resident_count() <= 2);
    }

    #[test]
    fn test_pin_count_tracking() {
        let (bpm, _dir) = create_test_bpm(4);
        bpm.new_page(pid(0)).unwrap();

        let frame = &bpm.frames[0];
        assert_eq!(frame.pin_count(), 0);

        let guard = bpm.fetch_page_read(pid(0)).unwrap();
        assert_eq!(frame.pin_count(), 1);
        assert_eq!(bpm.state.lock().replacer.size(), 0);

        drop(guard);
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(bpm.state.lock().replacer.size(), 1);
    }

    #[test]
    fn test_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let (bpm, _dir) = create_test_bpm(4);
        let bpm = Arc::new(bpm);
        bpm.new_page(pid(0)).unwrap();
        bpm.write_page(pid(0), &[0x42u8; PS]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bpm = Arc::clone(&bpm);
                thread::spawn(move || {
                    let page = bpm.read_page(pid(0)).unwrap();
                    assert_eq!(page.as_slice()[0], 0x42);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bpm.pin_count(pid(0)), Some(0));
    }

    #[test]
    fn test_failed_eviction_write_back_keeps_victim() {
        let (bpm, _dir) = create_bounded_bpm(1, 2);
        bpm.new_page(pid(5)).unwrap();

        let result = bpm.new_page(pid(0));
        assert!(matches!(result, Err(Error::AllocationExhausted { .. })));

        assert!(bpm.is_resident(pid(5)));
        assert!(!bpm.is_resident(pid(0)));
        assert!(is_dirty(&bpm, pid(5)));
        assert_eq!(bpm.pin_count(pid(5)), Some(0));
        assert_eq!(bpm.free_frame_count(), 0);
        assert_eq!(bpm.stats().snapshot().evictions, 0);

        // The victim is still a candidate once the obstacle is gone.
        assert!(bpm.invalidate(pid(5)).unwrap());
        bpm.new_page(pid(0)).unwrap();
        assert!(bpm.is_resident(pid(0)));
    }

    #[test]
    fn test_flush_all_failure_unpins_and_keeps_dirty() {
        let (bpm, _dir) = create_bounded_bpm(3, 2);
        for i in [0, 1, 5] {
            bpm.new_page(pid(i)).unwrap();
        }

        assert!(matches!(
            bpm.flush_all(),
            Err(Error::AllocationExhausted { .. })
        ));
        for i in [0, 1, 5] {
            assert!(bpm.is_resident(pid(i)));
            assert_eq!(bpm.pin_count(pid(i)), Some(0));
        }
        assert!(is_dirty(&bpm, pid(5)));

        // A retry hits the same page again.
        assert!(bpm.flush_all().is_err());
        assert!(is_dirty(&bpm, pid(5)));

        bpm.invalidate(pid(5)).unwrap();
        bpm.flush_all().unwrap();
        assert!(!is_dirty(&bpm, pid(0)));
        assert!(!is_dirty(&bpm, pid(1)));
        assert_eq!(bpm.disk_block_count(), 2);
    }
}
