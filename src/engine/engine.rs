//! Engine - the file-backed page store.

use std::fs;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::buffer::BufferPoolManager;
use crate::common::{EngineConfig, Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::{AllocationManager, DiskManager};

use super::{StorageEngine, StorageStats};

/// State guarded by the engine lock.
struct EngineState {
    allocator: AllocationManager,
    closed: bool,
}

/// The page store façade: allocation, cached page I/O and durability over
/// a single data file.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │                    Engine                    │
/// │  RwLock<EngineState>                         │
/// │    allocator: AllocationManager (free list)  │
/// │    closed                                    │
/// │                      │                       │
/// │                      ▼                       │
/// │  BufferPoolManager (LRU over N frames)       │
/// │                      │                       │
/// │                      ▼                       │
/// │  DiskManager (<data_directory>/pages.db)     │
/// └──────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// - `read_page`, `write_page` and `stats` hold the engine lock shared, so
///   page I/O on different pages proceeds in parallel.
/// - `allocate_page`, `deallocate_page`, `sync` and `close` hold it
///   exclusively. A deallocation therefore never races a read of the same
///   page, and a sync sees every write that returned before it.
///
/// # Example
/// ```no_run
/// use pagestore::{Engine, EngineConfig, Page, StorageEngine};
///
/// let engine = Engine::open(EngineConfig::new("data")).unwrap();
/// let page_id = engine.allocate_page().unwrap();
///
/// let mut page = engine.read_page(page_id).unwrap();
/// page.as_mut_slice()[0] = 42;
/// engine.write_page(&page).unwrap();
///
/// engine.sync().unwrap();
/// engine.close().unwrap();
/// ```
pub struct Engine {
    config: EngineConfig,
    state: RwLock<EngineState>,
    pool: BufferPoolManager,
}

impl Engine {
    /// Open the data file under `config.data_directory`, creating the
    /// directory and file if needed.
    ///
    /// Every whole page already in the file is live; the free list starts
    /// empty.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration fails validation
    /// - `Error::Io` if the directory or file cannot be opened
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(config.data_directory())?;

        let disk_manager = DiskManager::open_or_create(
            config.data_file_path(),
            config.page_size,
            config.max_file_size,
        )?;
        let allocator = AllocationManager::from_existing(
            disk_manager.block_count(),
            config.page_size,
            config.max_file_size,
        );

        info!(
            path = %config.data_file_path().display(),
            page_size = config.page_size,
            buffer_size = config.buffer_size,
            total_pages = allocator.total_pages(),
            "engine opened"
        );

        Ok(Self {
            pool: BufferPoolManager::new(config.buffer_size, disk_manager),
            state: RwLock::new(EngineState {
                allocator,
                closed: false,
            }),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// The underlying buffer pool, for introspection.
    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    fn ensure_open(state: &EngineState) -> Result<()> {
        if state.closed {
            Err(Error::ClosedEngine)
        } else {
            Ok(())
        }
    }

    /// Flush and fsync. Caller holds the engine lock exclusively.
    fn sync_locked(&self) -> Result<()> {
        let written = self.pool.flush_all()?;
        self.pool.sync_disk().map_err(|e| {
            error!(error = %e, "sync failed");
            e
        })?;
        debug!(written, "engine synced");
        Ok(())
    }
}

impl StorageEngine for Engine {
    fn allocate_page(&self) -> Result<PageId> {
        let mut state = self.state.write();
        Self::ensure_open(&state)?;

        let allocation = state.allocator.allocate()?;
        if let Err(e) = self.pool.new_page(allocation.page_id) {
            state.allocator.rollback(allocation);
            return Err(e);
        }

        debug!(page_id = %allocation.page_id, recycled = allocation.recycled, "page allocated");
        Ok(allocation.page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.write();
        Self::ensure_open(&state)?;

        if !state.allocator.is_live(page_id) {
            return Err(Error::InvalidPageId(page_id));
        }
        self.pool.invalidate(page_id)?;
        state.allocator.deallocate(page_id)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let state = self.state.read();
        Self::ensure_open(&state)?;

        if page.len() != self.config.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.config.page_size,
                actual: page.len(),
            });
        }
        state.allocator.check_live(page.id())?;

        self.pool.write_page(page.id(), page.as_slice())
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let state = self.state.read();
        Self::ensure_open(&state)?;
        state.allocator.check_live(page_id)?;

        self.pool.read_page(page_id)
    }

    fn sync(&self) -> Result<()> {
        let state = self.state.write();
        Self::ensure_open(&state)?;
        self.sync_locked()
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        Self::ensure_open(&state)?;
        state.closed = true;

        let synced = self.sync_locked();
        let released = self.pool.close_disk();

        info!(
            total_pages = state.allocator.total_pages(),
            stats = %self.pool.stats().snapshot(),
            "engine closed"
        );
        synced.and(released)
    }

    fn stats(&self) -> StorageStats {
        let state = self.state.read();
        let snapshot = self.pool.stats().snapshot();

        StorageStats {
            total_pages: state.allocator.total_pages(),
            free_pages: state.allocator.free_pages(),
            buffer_hits: snapshot.cache_hits,
            buffer_misses: snapshot.cache_misses,
            evictions: snapshot.evictions,
            pages_read: snapshot.pages_read,
            pages_written: snapshot.pages_written,
            resident_frames: self.pool.resident_count(),
        }
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.state.get_mut().closed {
            warn!("engine dropped without close; closing now");
            if let Err(e) = self.close() {
                error!(error = %e, "close on drop failed");
            }
        }
    }
}
