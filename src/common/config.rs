//! Engine configuration.
//!
//! [`EngineConfig`] carries the four options the engine recognizes. It is
//! serde-friendly so that upper layers can embed it in their own config
//! files; [`EngineConfig::from_toml_str`] parses a standalone TOML table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Default size of a page in bytes (4KB).
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of frames in the buffer pool.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Default upper bound on backing-file growth (1 GiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 30;

/// Page sizes must be a multiple of this (one disk sector).
pub const SECTOR_SIZE: usize = 512;

/// Name of the backing file inside the data directory.
pub const DATA_FILE_NAME: &str = "pages.db";

/// Construction-time options for an [`Engine`](crate::Engine).
///
/// # Example
/// ```
/// use pagestore::EngineConfig;
///
/// let config = EngineConfig::new("/tmp/pages")
///     .with_page_size(8192)
///     .with_buffer_size(128);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the backing file.
    pub data_directory: PathBuf,
    /// Bytes per page. Positive multiple of [`SECTOR_SIZE`].
    pub page_size: usize,
    /// Maximum number of resident frames in the buffer pool.
    pub buffer_size: usize,
    /// Upper bound, in bytes, on backing-file growth.
    pub max_file_size: u64,
}

impl EngineConfig {
    /// Default configuration rooted at `data_directory`.
    pub fn new<P: Into<PathBuf>>(data_directory: P) -> Self {
        Self {
            data_directory: data_directory.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from a TOML document.
    ///
    /// Missing keys take their defaults. The result is validated.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Check every option against its constraints.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size % SECTOR_SIZE != 0 {
            return Err(Error::InvalidConfig(format!(
                "page_size must be a positive multiple of {}, got {}",
                SECTOR_SIZE, self.page_size
            )));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be > 0".into()));
        }
        if self.max_file_size < self.page_size as u64 {
            return Err(Error::InvalidConfig(format!(
                "max_file_size ({}) is smaller than one page ({})",
                self.max_file_size, self.page_size
            )));
        }
        Ok(())
    }

    /// Path of the backing file.
    pub fn data_file_path(&self) -> PathBuf {
        self.data_directory.join(DATA_FILE_NAME)
    }

    /// The data directory.
    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("data"),
            page_size: DEFAULT_PAGE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}
