//! pagestore - an embedded, page-oriented storage engine.
//!
//! Turns a single flat backing file into a concurrently safe, cached,
//! page-addressable store with explicit durability.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           pagestore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Engine Façade (engine/)                     │   │
//! │  │   StorageEngine trait: Engine | MemoryEngine             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Allocation (storage/allocation_manager)            │   │
//! │  │          live page IDs + free list for reuse             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │   BufferPoolManager + Frame + LruReplacer + Statistics   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Disk I/O (storage/disk_manager)                │   │
//! │  │        page i at [i × page_size, (i+1) × page_size)      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`storage`] - Disk I/O, page values and allocation
//! - [`buffer`] - Buffer pool management and LRU eviction
//! - [`engine`] - The façade upper layers program against
//!
//! # Quick Start
//! ```no_run
//! use pagestore::{Engine, EngineConfig, Page, StorageEngine};
//!
//! let config = EngineConfig::new("my_data").with_buffer_size(128);
//! let engine = Engine::open(config).unwrap();
//!
//! let page_id = engine.allocate_page().unwrap();
//! let data = vec![7u8; engine.page_size()];
//! engine.write_page(&Page::new(page_id, data)).unwrap();
//! engine.sync().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod engine;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FILE_SIZE, DEFAULT_PAGE_SIZE};
pub use common::{EngineConfig, Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use engine::{Engine, MemoryEngine, StorageEngine, StorageStats};
pub use storage::page::Page;
pub use storage::{AllocationManager, DiskManager};
