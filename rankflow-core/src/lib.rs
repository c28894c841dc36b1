//! rankflow-core
//!
//! `rankflow-core` provides the primitives for building and running deferred,
//! task-based computations on a single machine.
//!
//! A `Deferred<A>` is a value of type `A` that exists once its task graph has been
//! run.  Deferreds are built with three functions:
//!
//! 1. `lift` - lifts a concrete value into a Deferred.
//! 2. `apply` - applies a function to a Deferred, producing a new Deferred.
//! 3. `join` - combines two Deferreds with a function, producing a new Deferred.
//!
//! Graphs are handed to a `Scheduler`.  The `LeveledScheduler` runs one dependency
//! level at a time, which makes every level a barrier; the `GreedyScheduler` starts
//! work as soon as its inputs exist.  Both re-run a task whose function panics, so
//! task functions are expected to be pure.
//!
//! ```rust
//! use rankflow_core::deferred::Deferred;
//! use rankflow_core::scheduler::LeveledScheduler;
//!
//! let hello = Deferred::lift("Hello".to_owned(), None);
//! let world = Deferred::lift("World".to_owned(), None);
//! let world_exclaim = world.apply(|w| format!("{}!", w));
//! let hello_world = hello.join(&world_exclaim, |h, w| format!("{} {}", h, w));
//! assert_eq!(hello_world.run(&LeveledScheduler::new()), Some("Hello World!".into()));
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

/// Contains Deferred primitive and function definitions
pub mod deferred;

/// Contains Scheduler trait definition and implementations
pub mod scheduler;

/// Internal Graph implementation
mod graph;

/// Internal task definitions
mod task;

pub use graph::{Graph, Handle};
pub use task::Payload;
