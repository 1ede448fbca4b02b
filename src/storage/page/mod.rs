//! Page value type.
//!
//! A [`Page`] is what callers hand to and receive from the engine: a page
//! ID plus exactly `page_size` bytes. The buffer pool keeps its own
//! authoritative copy in a frame; callers only ever see copies.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
