//! Storage layer - disk I/O, page values and page allocation.
//!
//! - [`DiskManager`] - Fixed-block file I/O
//! - [`AllocationManager`] - Live/free page ID bookkeeping
//! - [`page`] - The page value type

mod allocation_manager;
mod disk_manager;
pub mod page;

pub use allocation_manager::{Allocation, AllocationManager};
pub use disk_manager::DiskManager;
