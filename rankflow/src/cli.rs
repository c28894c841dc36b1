use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use clap::Parser;

use crate::config::{PageRankConfig, SchedulerKind, DEFAULT_CHUNK_SIZE};

/// Ranks the pages of a link graph read from FILE, one `<source> <neighbor>` edge per line.
#[derive(Debug, Parser)]
#[command(name = "rankflow", version)]
pub struct Cli {
    /// Edge list to rank
    pub file: PathBuf,

    /// Number of rounds to run; zero or negative runs none
    #[arg(allow_negative_numbers = true)]
    pub iterations: i64,

    /// Partitions used for every shuffle
    #[arg(long, default_value = "1")]
    pub partitions: NonZeroUsize,

    /// Bytes per input chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u64,

    /// Scheduler that executes the task graphs
    #[arg(long, value_enum, default_value_t = SchedulerKind::Leveled)]
    pub scheduler: SchedulerKind,

    /// Worker threads for the greedy scheduler [default: available parallelism]
    #[arg(long)]
    pub threads: Option<NonZeroUsize>,

    /// Times a failing task is attempted before the run is abandoned
    #[arg(long, default_value = "3")]
    pub attempts: NonZeroUsize,
}

impl Cli {
    pub fn config(&self) -> PageRankConfig {
        PageRankConfig::new(self.iterations)
            .with_partitions(self.partitions)
            .with_chunk_size(self.chunk_size)
    }

    pub fn threads(&self) -> NonZeroUsize {
        self.threads
            .or_else(|| thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod cli_test {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["rankflow", "links.txt", "10"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("links.txt"));
        assert_eq!(cli.config(), PageRankConfig::new(10));
        assert_eq!(cli.scheduler, SchedulerKind::Leveled);
        assert_eq!(cli.attempts.get(), 3);
    }

    #[test]
    fn test_negative_iterations_parse() {
        let cli = Cli::try_parse_from(["rankflow", "links.txt", "-2"]).unwrap();
        assert_eq!(cli.iterations, -2);
        assert_eq!(cli.config().rounds(), 0);
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "rankflow", "links.txt", "5", "--partitions", "4", "--chunk-size", "128",
            "--scheduler", "greedy", "--threads", "2", "--attempts", "1",
        ]).unwrap();
        assert_eq!(cli.config().partitions.get(), 4);
        assert_eq!(cli.config().chunk_size, 128);
        assert_eq!(cli.scheduler, SchedulerKind::Greedy);
        assert_eq!(cli.threads().get(), 2);
        assert_eq!(cli.attempts.get(), 1);
    }

    #[test]
    fn test_missing_arguments() {
        assert!(Cli::try_parse_from(["rankflow"]).is_err());
        assert!(Cli::try_parse_from(["rankflow", "links.txt"]).is_err());
        assert!(Cli::try_parse_from(["rankflow", "links.txt", "ten"]).is_err());
        assert!(Cli::try_parse_from(["rankflow", "links.txt", "1", "--partitions", "0"]).is_err());
    }
}
