//! RAII guards for pinned page access.
//!
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (marks the frame dirty)
//!
//! A guard pins its frame for as long as it lives. On drop the frame latch
//! is released first and the frame unpinned second, so unpinning never
//! waits on the pool lock while holding a frame latch.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only access to a resident page.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(page_id)?;
/// let first = guard[0];
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// Always `Some` until drop.
    lock: Option<RwLockReadGuard<'a, Box<[u8]>>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Copy the guarded bytes into a detached [`Page`].
    pub fn to_page(&self) -> Page {
        Page::new(self.page_id, self.to_vec())
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match &self.lock {
            Some(lock) => &lock[..],
            None => &[],
        }
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.take();
        self.bpm.unpin_frame(self.frame_id);
    }
}

/// Guard for exclusive write access to a resident page.
///
/// Only one `PageWriteGuard` can exist for a page at a time. The frame is
/// marked dirty when the guard drops.
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// Always `Some` until drop.
    lock: Option<RwLockWriteGuard<'a, Box<[u8]>>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Box<[u8]>>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match &self.lock {
            Some(lock) => &lock[..],
            None => &[],
        }
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.lock {
            Some(lock) => &mut lock[..],
            None => &mut [],
        }
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        // Must be marked under the latch: flush clears it under the same latch.
        self.bpm.frame(self.frame_id).mark_dirty();
        self.lock.take();
        self.bpm.unpin_frame(self.frame_id);
    }
}
