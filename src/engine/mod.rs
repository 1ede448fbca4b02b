//! Engine façade - the only surface upper layers see.
//!
//! - [`StorageEngine`] - The page-store capability trait
//! - [`Engine`] - File-backed implementation over the buffer pool
//! - [`MemoryEngine`] - In-memory implementation for tests
//! - [`StorageStats`] - Aggregate counters

#[allow(clippy::module_inception)]
mod engine;
mod memory;
mod stats;
mod traits;

pub use engine::Engine;
pub use memory::MemoryEngine;
pub use stats::StorageStats;
pub use traits::StorageEngine;
