//! MemoryEngine - an in-memory page store for testing upper layers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::common::{EngineConfig, Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::AllocationManager;

use super::{StorageEngine, StorageStats};

struct MemoryState {
    allocator: AllocationManager,
    pages: HashMap<PageId, Box<[u8]>>,
    closed: bool,
}

/// A [`StorageEngine`] that keeps every page in memory.
///
/// Validation and error semantics match [`Engine`](super::Engine): the same
/// allocation discipline, size checks and closed-state handling. Nothing
/// survives the process, and every page request counts as a buffer hit.
pub struct MemoryEngine {
    page_size: usize,
    state: RwLock<MemoryState>,
    hits: AtomicU64,
}

impl MemoryEngine {
    /// Create an empty in-memory store. `data_directory` and
    /// `buffer_size` are ignored.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            page_size: config.page_size,
            state: RwLock::new(MemoryState {
                allocator: AllocationManager::new(config.page_size, config.max_file_size),
                pages: HashMap::new(),
                closed: false,
            }),
            hits: AtomicU64::new(0),
        })
    }
}

impl StorageEngine for MemoryEngine {
    fn allocate_page(&self) -> Result<PageId> {
        let mut state = self.state.write();
        if state.closed {
            return Err(Error::ClosedEngine);
        }

        let page_id = state.allocator.allocate()?.page_id;
        state
            .pages
            .insert(page_id, vec![0u8; self.page_size].into_boxed_slice());
        Ok(page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(Error::ClosedEngine);
        }

        state.allocator.deallocate(page_id)?;
        state.pages.remove(&page_id);
        Ok(())
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(Error::ClosedEngine);
        }
        if page.len() != self.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.page_size,
                actual: page.len(),
            });
        }
        state.allocator.check_live(page.id())?;

        let data = state
            .pages
            .get_mut(&page.id())
            .ok_or(Error::PageNotFound(page.id()))?;
        data.copy_from_slice(page.as_slice());
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let state = self.state.read();
        if state.closed {
            return Err(Error::ClosedEngine);
        }
        state.allocator.check_live(page_id)?;

        let data = state
            .pages
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Page::new(page_id, data.to_vec()))
    }

    fn sync(&self) -> Result<()> {
        if self.state.read().closed {
            return Err(Error::ClosedEngine);
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(Error::ClosedEngine);
        }
        state.closed = true;
        Ok(())
    }

    fn stats(&self) -> StorageStats {
        let state = self.state.read();
        StorageStats {
            total_pages: state.allocator.total_pages(),
            free_pages: state.allocator.free_pages(),
            buffer_hits: self.hits.load(Ordering::Relaxed),
            resident_frames: state.pages.len(),
            ..Default::default()
        }
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
