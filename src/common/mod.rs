//! Primitives shared by every layer of the page store.
//!
//! - [`EngineConfig`] and the default sizes
//! - [`Error`] / [`Result`]
//! - [`PageId`] and [`FrameId`]

pub mod config;
pub mod error;
mod frame_id;
mod page_id;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
