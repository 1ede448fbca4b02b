//! Page identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a logical page slot in the backing file.
///
/// A `PageId` is stable for the lifetime of the page it names and may be
/// handed out again once that page is deallocated. The only meaning carried
/// by its numeric value is the file offset it maps to:
///
/// ```text
/// offset = page_id × page_size
/// ```
///
/// # Example
/// ```
/// use pagestore::PageId;
///
/// let page_id = PageId::new(3);
/// assert_eq!(page_id.offset(4096), 12288);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Byte offset of this page in a file of `page_size`-byte pages.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        u64::from(self.0) * page_size as u64
    }

    /// Exclusive end offset of this page (`offset + page_size`).
    #[inline]
    pub fn end_offset(&self, page_size: usize) -> u64 {
        self.offset(page_size) + page_size as u64
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}
