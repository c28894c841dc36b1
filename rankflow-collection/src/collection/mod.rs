//! Partitioned collections

/// Defines MemoryCollection and its operators
pub mod memory;

pub use self::memory::MemoryCollection;
