//! Eviction policy (replacer).
//!
//! - [`LruReplacer`] - least-recently-used among unpinned frames

mod lru;

pub use lru::LruReplacer;
