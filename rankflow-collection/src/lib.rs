//! rankflow-collection
//! ---
//! Partitioned dataflow collections built on `rankflow-core`.
//!
//! A `MemoryCollection<A>` is a list of partitions, each a `Deferred<Vec<A>>`.
//! Operators only extend the task graph behind the partitions; a scheduler runs
//! them.  Keyed collections of `(K, V)` pairs get the shuffle operators:
//! `group_by_key`, `reduce_by_key` and `join`, which hash keys to partitions with a
//! fixed-key hasher so that both sides of a join agree on where a key lives.
//!
//! Example - Word Count
//! ---
//!
//! ```rust
//! use rankflow_core::scheduler::LeveledScheduler;
//! use rankflow_collection::collection::MemoryCollection;
//!
//! let lines = MemoryCollection::from_vec(vec![
//!     "the quick fox".to_owned(),
//!     "the lazy dog".to_owned(),
//! ]);
//!
//! let counts = lines
//!     .emit(|line, emitter| {
//!         for word in line.split_whitespace() {
//!             emitter((word.to_owned(), 1usize));
//!         }
//!     })
//!     .reduce_by_key(|a, b| a + b, 2)
//!     .collect_map(&LeveledScheduler::new())
//!     .unwrap();
//!
//! assert_eq!(counts["the"], 2);
//! assert_eq!(counts["fox"], 1);
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

/// Defines useful utilities, such as reading files
pub mod utils;

/// Defines the MemoryCollection primitive
pub mod collection;

mod partitioned;
