//! Disk Manager - fixed-block I/O against a single backing file.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing page-sized blocks
//! - Growing the file on demand, up to a configured maximum
//! - Flushing OS buffers for durability

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::{Error, PageId, Result};

/// Manages block I/O for a single data file.
///
/// # File Layout
/// Pages are laid out back to back with no header:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0       P        2P     ...      N×P
/// ```
///
/// Page N occupies `[N×P, (N+1)×P)` where P is the page size.
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The buffer pool owns it behind a mutex.
///
/// # Durability
/// `write_block` does not fsync. Writes become durable on [`sync`](Self::sync).
pub struct DiskManager {
    /// `None` once closed.
    file: Option<File>,
    path: PathBuf,
    page_size: usize,
    max_file_size: u64,
    /// Number of whole pages currently in the file.
    block_count: u32,
}

impl DiskManager {
    /// Create a new data file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize, max_file_size: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        debug!(path = %path.as_ref().display(), page_size, "created data file");

        Ok(Self {
            file: Some(file),
            path: path.as_ref().to_path_buf(),
            page_size,
            max_file_size,
            block_count: 0,
        })
    }

    /// Open an existing data file.
    ///
    /// A trailing partial page (from a torn extension) is ignored.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize, max_file_size: u64) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let whole_pages = file_size / page_size as u64;
        if file_size % page_size as u64 != 0 {
            warn!(
                path = %path.as_ref().display(),
                file_size,
                page_size,
                "data file ends with a partial page; ignoring trailing bytes"
            );
        }
        let block_count = u32::try_from(whole_pages).map_err(|_| {
            Error::InvalidConfig(format!(
                "data file holds {} pages, more than a PageId can address",
                whole_pages
            ))
        })?;

        debug!(path = %path.as_ref().display(), block_count, "opened data file");

        Ok(Self {
            file: Some(file),
            path: path.as_ref().to_path_buf(),
            page_size,
            max_file_size,
            block_count,
        })
    }

    /// Open an existing data file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        page_size: usize,
        max_file_size: u64,
    ) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, page_size, max_file_size)
        } else {
            Self::create(path, page_size, max_file_size)
        }
    }

    /// Read the block for `page_id` into `buf`.
    ///
    /// # Errors
    /// - `Error::Io` if the block lies beyond the end of the file or the read fails
    /// - `Error::PageSizeMismatch` if `buf` is not exactly one page
    /// - `Error::ClosedEngine` after [`close`](Self::close)
    pub fn read_block(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        self.check_len(buf.len())?;
        if page_id.0 >= self.block_count {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} lies beyond end of file ({} pages)",
                    page_id, self.block_count
                ),
            )));
        }

        let offset = page_id.offset(self.page_size);
        let file = self.file.as_mut().ok_or(Error::ClosedEngine)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;

        Ok(())
    }

    /// Write `data` as the block for `page_id`.
    ///
    /// Writing past the current end extends the file; any gap is left as a
    /// hole that reads back as zeros.
    ///
    /// # Errors
    /// - `Error::AllocationExhausted` if the write would grow the file past
    ///   `max_file_size`. Overwriting an existing block is never refused.
    /// - `Error::PageSizeMismatch` if `data` is not exactly one page
    /// - `Error::Io` on write failure
    pub fn write_block(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        self.check_len(data.len())?;

        let end = page_id.end_offset(self.page_size);
        // Only growth is capped; blocks already in the file stay writable.
        if page_id.0 >= self.block_count && end > self.max_file_size {
            return Err(Error::AllocationExhausted {
                required: end,
                max_file_size: self.max_file_size,
            });
        }

        let offset = page_id.offset(self.page_size);
        let file = self.file.as_mut().ok_or(Error::ClosedEngine)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        if page_id.0 >= self.block_count {
            self.block_count = page_id.0 + 1;
        }

        Ok(())
    }

    /// Flush OS buffers so every prior successful write is durable.
    pub fn sync(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::ClosedEngine)?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Flush and release the file handle.
    ///
    /// # Errors
    /// `Error::ClosedEngine` if already closed. The handle is released even
    /// when the final flush fails.
    pub fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Error::ClosedEngine)?;
        let result = file.sync_all().map_err(Error::from);
        debug!(path = %self.path.display(), "closed data file");
        result
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Number of whole pages in the file.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Size of the page-addressable part of the file in bytes.
    #[cfg(test)]
    fn file_size(&self) -> u64 {
        u64::from(self.block_count) * self.page_size as u64
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
        }
    }
}
