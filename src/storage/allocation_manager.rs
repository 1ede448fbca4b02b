//! Allocation Manager - PageId lifecycle and free-space bookkeeping.
//!
//! The [`AllocationManager`] decides which page IDs are live. Deallocated
//! IDs go onto a free list and are handed out again before the file is
//! allowed to grow.

use std::collections::BTreeSet;

use tracing::debug;

use crate::common::{Error, PageId, Result};

/// Outcome of a successful [`AllocationManager::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The newly live page.
    pub page_id: PageId,
    /// `true` if the ID came off the free list rather than from growth.
    pub recycled: bool,
}

/// Tracks live and free page IDs.
///
/// Every ID below `total_pages` is either live or on the free list, never
/// both. IDs at or above `total_pages` have never been issued.
///
/// # Thread Safety
/// Not internally synchronized. The engine holds it behind a single lock so
/// allocation and deallocation are serialized against each other.
#[derive(Debug)]
pub struct AllocationManager {
    /// Highest allocated extent: IDs `0..total_pages` have been issued.
    total_pages: u32,
    /// Growth limit derived from the max file size.
    max_pages: u64,
    page_size: usize,
    /// Deallocated IDs, lowest first.
    free_list: BTreeSet<PageId>,
}

impl AllocationManager {
    /// An allocator for an empty file.
    pub fn new(page_size: usize, max_file_size: u64) -> Self {
        Self::from_existing(0, page_size, max_file_size)
    }

    /// An allocator for a file that already holds `total_pages` pages.
    ///
    /// The free list is not persisted, so every existing page starts live.
    pub fn from_existing(total_pages: u32, page_size: usize, max_file_size: u64) -> Self {
        let max_pages = (max_file_size / page_size as u64).min(u64::from(u32::MAX));
        Self {
            total_pages,
            max_pages,
            page_size,
            free_list: BTreeSet::new(),
        }
    }

    /// Hand out a page ID, reusing a free one before growing.
    ///
    /// # Errors
    /// `Error::AllocationExhausted` if the free list is empty and growth
    /// would exceed the max file size.
    pub fn allocate(&mut self) -> Result<Allocation> {
        if let Some(page_id) = self.free_list.pop_first() {
            debug!(%page_id, "reusing free page");
            return Ok(Allocation {
                page_id,
                recycled: true,
            });
        }

        if u64::from(self.total_pages) >= self.max_pages {
            let required = PageId::new(self.total_pages).end_offset(self.page_size);
            return Err(Error::AllocationExhausted {
                required,
                max_file_size: self.max_pages * self.page_size as u64,
            });
        }

        let page_id = PageId::new(self.total_pages);
        self.total_pages += 1;
        debug!(%page_id, total_pages = self.total_pages, "grew allocation extent");

        Ok(Allocation {
            page_id,
            recycled: false,
        })
    }

    /// Return a live page ID to the free list.
    ///
    /// # Errors
    /// `Error::InvalidPageId` if the ID was never issued or is already free.
    /// The free list is left unchanged on error.
    pub fn deallocate(&mut self, page_id: PageId) -> Result<()> {
        if !self.is_live(page_id) {
            return Err(Error::InvalidPageId(page_id));
        }
        self.free_list.insert(page_id);
        debug!(%page_id, free_pages = self.free_list.len(), "page deallocated");
        Ok(())
    }

    /// Undo an allocation that could not be completed.
    ///
    /// Must be called before any other allocation takes place.
    pub fn rollback(&mut self, allocation: Allocation) {
        if allocation.recycled {
            self.free_list.insert(allocation.page_id);
        } else if allocation.page_id.0 + 1 == self.total_pages {
            self.total_pages -= 1;
        }
        debug!(page_id = %allocation.page_id, "allocation rolled back");
    }

    /// Whether `page_id` is issued and not on the free list.
    pub fn is_live(&self, page_id: PageId) -> bool {
        page_id.0 < self.total_pages && !self.free_list.contains(&page_id)
    }

    /// Check that `page_id` may be read or written.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` if the ID was never issued
    /// - `Error::PageNotFound` if the ID is on the free list
    pub fn check_live(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.total_pages {
            Err(Error::InvalidPageId(page_id))
        } else if self.free_list.contains(&page_id) {
            Err(Error::PageNotFound(page_id))
        } else {
            Ok(())
        }
    }

    /// Highest allocated extent.
    #[inline]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Size of the free list.
    #[inline]
    pub fn free_pages(&self) -> usize {
        self.free_list.len()
    }

    /// Number of live pages.
    #[inline]
    pub fn live_pages(&self) -> usize {
        self.total_pages as usize - self.free_list.len()
    }

    /// Free page IDs in ascending order.
    pub fn free_list(&self) -> impl Iterator<Item = PageId> + '_ {
        self.free_list.iter().copied()
    }
}
