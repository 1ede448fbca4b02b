//! Buffer pool - the bounded page cache between the engine and disk.
//!
//! A fixed number of frames each cache one page. Pages are pinned while in
//! use; unpinned pages are evicted least-recently-used first, and dirty
//! ones are written back before their frame is reused.
//!
//! # Components
//! - [`BufferPoolManager`] - Page table, pinning, eviction and flushing
//! - [`Frame`] - One cached page plus pin count and dirty flag
//! - [`PageReadGuard`] / [`PageWriteGuard`] - Pinned views of a frame
//! - [`BufferPoolStats`] / [`StatsSnapshot`] - Hit, miss and I/O counters
//! - [`replacer`] - The LRU eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
