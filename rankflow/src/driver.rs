//! Runs PageRank rounds one after another over a loaded graph.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rankflow_core::scheduler::Scheduler;

use crate::aggregator::aggregate;
use crate::config::PageRankConfig;
use crate::contributions::contributions;
use crate::error::{Error, Result};
use crate::loader::{Adjacency, GraphLoader, Node};
use crate::ranks::RankStore;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No graph yet
    Uninitialized,
    /// Graph loaded and ranks seeded
    Loaded,
    /// Computing the given round, counted from 1
    Round(usize),
    /// All rounds done, ranks being collected
    Materialized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Uninitialized => write!(f, "loading edges"),
            Stage::Loaded => write!(f, "graph loaded"),
            Stage::Round(round) => write!(f, "running round {}", round),
            Stage::Materialized => write!(f, "collecting ranks"),
        }
    }
}

/// One round: contributions from the current ranks, summed and damped.
pub fn step(adjacency: &Adjacency, ranks: &RankStore, partitions: usize) -> RankStore {
    aggregate(&contributions(adjacency, ranks, partitions), partitions)
}

/// Drives a PageRank computation on a scheduler.
/// ```rust
///   use rankflow::config::PageRankConfig;
///   use rankflow::driver::PageRank;
///   use rankflow_core::scheduler::LeveledScheduler;
///
///   let s = LeveledScheduler::new();
///   let ranks = PageRank::new(&s, PageRankConfig::new(1))
///       .run_lines(vec!["a b", "b a"])
///       .unwrap();
///   assert!((ranks["a"] - 1.0).abs() < 1e-9);
/// ```
pub struct PageRank<'a, S> {
    scheduler: &'a S,
    config: PageRankConfig,
}

impl <'a, S: Scheduler> PageRank<'a, S> {
    pub fn new(scheduler: &'a S, config: PageRankConfig) -> Self {
        PageRank { scheduler, config }
    }

    pub fn loader(&self) -> GraphLoader<'a, S> {
        GraphLoader::new(self.scheduler, &self.config)
    }

    /// Loads edges from in-memory lines and ranks them
    pub fn run_lines<I, T>(&self, lines: I) -> Result<HashMap<Node, f64>>
        where I: IntoIterator<Item = T>,
              T: Into<String> {
        self.rank(&self.loader().from_lines(lines)?)
    }

    /// Loads edges from a text file and ranks them
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<HashMap<Node, f64>> {
        self.rank(&self.loader().from_path(path)?)
    }

    /// Runs the configured number of rounds over `adjacency`.  Each round is fully
    /// computed before the next one starts.
    pub fn rank(&self, adjacency: &Adjacency) -> Result<HashMap<Node, f64>> {
        let rounds = self.config.rounds();
        let partitions = self.config.partitions.get();
        if self.config.iterations < 0 {
            warn!("Negative iteration count {}, running no rounds", self.config.iterations);
        }

        let mut stage = Stage::Loaded;
        info!("{}: running {} rounds over {} partitions", stage, rounds, partitions);
        let mut ranks = RankStore::initial(adjacency);
        for round in 1..=rounds {
            stage = Stage::Round(round);
            ranks = step(adjacency, &ranks, partitions)
                .materialize(self.scheduler)
                .ok_or(Error::Incomplete { stage })?;
            if log_enabled!(log::Level::Debug) {
                let ranked = ranks.ranks().count().run(self.scheduler).unwrap_or_default();
                debug!("Finished round {}/{}: {} ranked nodes", round, rounds, ranked.iter().sum::<usize>());
            }
        }

        debug!("{} -> {}", stage, Stage::Materialized);
        let ranks = ranks.collect(self.scheduler)
            .ok_or(Error::Incomplete { stage: Stage::Materialized })?;
        info!("{}: {} ranked nodes", Stage::Materialized, ranks.len());
        Ok(ranks)
    }
}
