//! Page - the unit of I/O and caching.

use crate::common::PageId;

/// A page of data: an ID plus its bytes.
///
/// The engine's page size is chosen at construction time, so the data is
/// heap-allocated rather than a fixed array. `Page` is a value object:
/// cloning it copies the bytes, and nothing in it aliases buffer-pool
/// memory.
///
/// # Example
/// ```
/// use pagestore::{Page, PageId};
///
/// let mut page = Page::zeroed(PageId::new(0), 512);
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// assert_eq!(page.len(), 512);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    data: Vec<u8>,
}

impl Page {
    /// Build a page from existing bytes.
    ///
    /// No length check happens here; the engine rejects pages whose length
    /// differs from its page size when they are written.
    pub fn new(id: PageId, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// A page of `page_size` zero bytes.
    pub fn zeroed(id: PageId, page_size: usize) -> Self {
        Self {
            id,
            data: vec![0u8; page_size],
        }
    }

    /// The page's ID.
    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Number of data bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the page, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
