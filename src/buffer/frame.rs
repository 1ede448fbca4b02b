//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one page's bytes plus the metadata the pool needs:
//! - Which page is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;

/// A frame in the buffer pool.
///
/// The pool allocates all of its frames up front; a frame is reused for
/// different pages over its lifetime.
///
/// # Thread Safety
/// - `data`: `RwLock` - the per-frame latch over the page bytes
/// - `page_id`: `Mutex`
/// - `pin_count`, `is_dirty`: atomics
///
/// Pin counts are only changed while the pool's structural lock is held,
/// so eviction always sees a consistent count.
pub struct Frame {
    data: RwLock<Box<[u8]>>,
    page_id: Mutex<Option<PageId>>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create an empty frame of `page_size` bytes.
    pub fn new(page_size: usize) -> Self {
        Self {
            data: RwLock::new(vec![0u8; page_size].into_boxed_slice()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Data access (RwLock)
    // ========================================================================

    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    #[inline]
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }

    // ========================================================================
    // Page ID
    // ========================================================================

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if the pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    // ========================================================================
    // Frame state
    // ========================================================================

    /// Check if the frame is empty (no page loaded).
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Return the frame to its empty state, zeroing the bytes.
    ///
    /// Only called on unpinned frames.
    pub fn reset(&self) {
        self.data.write().fill(0);
        self.set_page_id(None);
        self.is_dirty.store(false, Ordering::Release);
    }
}
