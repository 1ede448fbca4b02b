//! Error types for the page store.

use thiserror::Error;

use super::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every error the page store can return.
///
/// All errors are returned synchronously to the immediate caller. A buffer
/// pool miss is not an error; it falls through to the disk manager.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying read, write or flush failure.
    ///
    /// The engine never retries these. Repeated I/O errors from `sync`
    /// mean durability can no longer be guaranteed for the session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page ID was never allocated, is already free, or is out of range.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// A cache miss resolved to a page that is not live (use-after-free).
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// Growing the backing file would exceed the configured maximum.
    #[error("Allocation exhausted: {required} bytes required, max file size is {max_file_size}")]
    AllocationExhausted { required: u64, max_file_size: u64 },

    /// Operation attempted after `close`.
    #[error("Engine is closed")]
    ClosedEngine,

    /// Every resident frame is pinned; nothing can be evicted.
    #[error("Buffer pool saturated: all {pool_size} frames are pinned")]
    PoolSaturated { pool_size: usize },

    /// A structural operation targeted a frame that is still pinned.
    #[error("{0} is pinned")]
    PagePinned(PageId),

    /// A page buffer did not match the configured page size.
    #[error("Page size mismatch: expected {expected} bytes, got {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    /// The engine configuration was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the caller may reasonably retry the operation.
    ///
    /// Bad input and a saturated pool are transient from the caller's point
    /// of view; everything else needs reconfiguration or signals a bug.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::InvalidPageId(_) | Error::PageSizeMismatch { .. } | Error::PoolSaturated { .. }
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}
