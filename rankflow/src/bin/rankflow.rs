use std::collections::HashMap;
use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::Parser;

use rankflow::cli::Cli;
use rankflow::report::report_lines;
use rankflow::{Node, PageRank, SchedulerKind};
use rankflow_core::scheduler::{GreedyScheduler, LeveledScheduler, Scheduler};

fn rank<S: Scheduler>(cli: &Cli, scheduler: &S) -> anyhow::Result<HashMap<Node, f64>> {
    let ranks = PageRank::new(scheduler, cli.config())
        .run_path(&cli.file)
        .with_context(|| format!("ranking {}", cli.file.display()))?;
    Ok(ranks)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let attempts = cli.attempts.get();
    let ranks = match cli.scheduler {
        SchedulerKind::Leveled => rank(cli, &LeveledScheduler::new().with_attempts(attempts))?,
        SchedulerKind::Greedy => {
            let threads = cli.threads().get();
            rank(cli, &GreedyScheduler::new(threads).with_attempts(attempts))?
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in report_lines(&ranks) {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}
