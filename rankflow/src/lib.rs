//! rankflow
//!
//! Bulk-synchronous PageRank over the partitioned collections of
//! `rankflow-collection`.
//!
//! A run loads a directed graph from lines of `<source> <neighbor>` text, seeds a rank
//! of 1.0 for every source page, and then repeats a fixed number of rounds:
//!
//! 1. `contributions` - every ranked source splits its rank evenly across its
//!    neighbors.
//! 2. `aggregator` - the shares arriving at each page are summed and damped into
//!    `0.15 + 0.85 * sum`.
//!
//! Pages that receive no share in a round drop out of the ranks.  Every round is
//! computed in full before the next begins, so a long run never carries more than one
//! round of task graph.
//!
//! ```rust
//! use rankflow::config::PageRankConfig;
//! use rankflow::driver::PageRank;
//! use rankflow_core::scheduler::LeveledScheduler;
//!
//! let s = LeveledScheduler::new();
//! let ranks = PageRank::new(&s, PageRankConfig::new(1))
//!     .run_lines(vec!["a b", "a c", "b a", "c a"])
//!     .unwrap();
//! assert!((ranks["a"] - 1.85).abs() < 1e-9);
//! assert!((ranks["b"] - 0.575).abs() < 1e-9);
//! ```

#[macro_use]
extern crate log;

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod contributions;
pub mod driver;
pub mod error;
pub mod loader;
pub mod ranks;
pub mod report;

pub use config::{PageRankConfig, SchedulerKind};
pub use driver::PageRank;
pub use error::{Error, LineError, Result};
pub use loader::{Adjacency, GraphLoader, Node};
