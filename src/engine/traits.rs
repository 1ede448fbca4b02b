//! The page-store capability that upper layers depend on.

use crate::common::{PageId, Result};
use crate::storage::page::Page;

use super::StorageStats;

/// Page-level storage primitive.
///
/// Catalog, record and query layers program against this trait only. They
/// never see file offsets, free lists or frame layout.
///
/// Implementations must be safe to share across threads. Operations after
/// [`close`](Self::close) fail with [`Error::ClosedEngine`](crate::Error::ClosedEngine).
pub trait StorageEngine: Send + Sync {
    /// Hand out a page ID that is not currently live. The page reads back
    /// as all zeroes until written.
    fn allocate_page(&self) -> Result<PageId>;

    /// Retire a live page. Its cached copy is discarded.
    fn deallocate_page(&self, page_id: PageId) -> Result<()>;

    /// Overwrite a live page. `page` must be exactly one page long.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Return a copy of a live page.
    fn read_page(&self, page_id: PageId) -> Result<Page>;

    /// Make every successful write so far durable.
    fn sync(&self) -> Result<()>;

    /// Best-effort sync, then release resources. Valid once.
    fn close(&self) -> Result<()>;

    fn stats(&self) -> StorageStats;

    fn page_size(&self) -> usize;
}
