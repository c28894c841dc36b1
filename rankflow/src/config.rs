use std::num::NonZeroUsize;

use clap::ValueEnum;

/// Input chunk size used when reading edge files
pub const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Settings for a single PageRank run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRankConfig {
    /// Requested number of rounds.  Zero or negative requests run no rounds.
    pub iterations: i64,

    /// Partition count used for every shuffle
    pub partitions: NonZeroUsize,

    /// Bytes per input chunk when reading from a file
    pub chunk_size: u64,
}

impl PageRankConfig {
    pub fn new(iterations: i64) -> Self {
        PageRankConfig {
            iterations,
            partitions: NonZeroUsize::MIN,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_partitions(mut self, partitions: NonZeroUsize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of rounds actually executed
    pub fn rounds(&self) -> usize {
        usize::try_from(self.iterations.max(0)).unwrap_or(usize::MAX)
    }
}

/// Which substrate scheduler executes the task graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SchedulerKind {
    /// One dependency level at a time on the rayon global pool
    #[default]
    Leveled,
    /// Priority-driven execution on a dedicated thread pool
    Greedy,
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_rounds_clamps_at_zero() {
        assert_eq!(PageRankConfig::new(3).rounds(), 3);
        assert_eq!(PageRankConfig::new(0).rounds(), 0);
        assert_eq!(PageRankConfig::new(-7).rounds(), 0);
    }

    #[test]
    fn test_defaults() {
        let config = PageRankConfig::new(10);
        assert_eq!(config.partitions.get(), 1);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.with_chunk_size(0).chunk_size, 1);
    }
}
