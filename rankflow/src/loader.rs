//! Turns whitespace-separated edge lines into an adjacency collection.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use rankflow_collection::collection::MemoryCollection;
use rankflow_collection::utils::{read_text, Line};
use rankflow_core::scheduler::Scheduler;

use crate::config::PageRankConfig;
use crate::driver::Stage;
use crate::error::{Error, LineError, Result};

/// Page identifier, compared by exact text
pub type Node = String;

/// A directed link from a source page to one of its neighbors
pub type Edge = (Node, Node);

/// Source pages and their distinct out-neighbors.  Built once by `GraphLoader` and
/// reused, fully computed, by every round.
#[derive(Clone)]
pub struct Adjacency {
    links: MemoryCollection<(Node, Vec<Node>)>
}

impl Adjacency {
    /// The adjacency entries, one per source node
    pub fn links(&self) -> &MemoryCollection<(Node, Vec<Node>)> {
        &self.links
    }

    /// Computes the adjacency as a map from source to neighbor set
    pub fn to_map<S: Scheduler>(&self, s: &S) -> Result<HashMap<Node, HashSet<Node>>> {
        let entries = self.links.run(s).ok_or(Error::Incomplete { stage: Stage::Loaded })?;
        Ok(entries.into_iter()
            .map(|(src, ns)| (src, ns.into_iter().collect()))
            .collect())
    }
}

/// Splits a line into a `(source, neighbor)` edge.  Leading and trailing whitespace is
/// ignored, so `"  a b"` is the edge `a -> b` rather than an edge from an empty name.
/// Tokens after the second are dropped; fewer than two tokens is an error.
/// ```rust
///   use rankflow::loader::parse_edge;
///
///   assert_eq!(parse_edge(&Ok("  a\tb c".to_owned())), Ok(("a".to_owned(), "b".to_owned())));
///   assert!(parse_edge(&Ok("a".to_owned())).is_err());
/// ```
pub fn parse_edge(line: &Line) -> std::result::Result<Edge, LineError> {
    let text = line.as_ref().map_err(|e| LineError::Read(e.clone()))?;
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(src), Some(dst)) => Ok((src.to_owned(), dst.to_owned())),
        _ => Err(LineError::Malformed { line: text.clone() })
    }
}

fn valid_edge(parsed: &std::result::Result<Edge, LineError>, emit: &mut dyn FnMut(Edge)) {
    if let Ok(edge) = parsed {
        emit(edge.clone());
    }
}

fn out_degree(entry: &(Node, Vec<Node>)) -> usize {
    entry.1.len()
}

/// Builds `Adjacency` values from in-memory lines or text files.
pub struct GraphLoader<'a, S> {
    scheduler: &'a S,
    partitions: usize,
    chunk_size: u64,
}

impl <'a, S: Scheduler> GraphLoader<'a, S> {
    pub fn new(scheduler: &'a S, config: &PageRankConfig) -> Self {
        GraphLoader {
            scheduler,
            partitions: config.partitions.get(),
            chunk_size: config.chunk_size,
        }
    }

    /// Loads edges from lines already in memory.  The lines are cut into the configured
    /// number of contiguous partitions before parsing.
    pub fn from_lines<I, T>(&self, lines: I) -> Result<Adjacency>
        where I: IntoIterator<Item = T>,
              T: Into<String> {
        let lines: Vec<Line> = lines.into_iter().map(|l| Ok(l.into())).collect();
        let (n, parts) = (lines.len().max(1), self.partitions);
        self.load(MemoryCollection::from_vec(lines).partition(parts, move |idx, _l| idx * parts / n))
    }

    /// Loads edges from a text file, read in chunks of the configured size.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Adjacency> {
        let path = path.as_ref();
        let io_error = |source| Error::Io { path: path.to_path_buf(), source };
        let name = path.to_str().ok_or_else(|| io_error(io::Error::new(
            io::ErrorKind::InvalidInput, "path is not valid UTF-8")))?;
        let lines = read_text(name, self.chunk_size).map_err(io_error)?;
        info!("Loading edges from {} in {} chunks", path.display(), lines.n_partitions());
        self.load(lines)
    }

    fn load(&self, lines: MemoryCollection<Line>) -> Result<Adjacency> {
        let incomplete = || Error::Incomplete { stage: Stage::Uninitialized };
        let parsed = lines.map(parse_edge)
            .materialize(self.scheduler)
            .ok_or_else(incomplete)?;

        // Any bad line fails the load before a graph is built.  The first one in input
        // order is reported.
        let failures = parsed.filter(|p| p.is_err())
            .run(self.scheduler)
            .ok_or_else(incomplete)?;
        if let Some(Err(e)) = failures.into_iter().next() {
            return Err(e.into());
        }

        let links = parsed.emit(valid_edge)
            .distinct(self.partitions)
            .group_by_key(self.partitions)
            .materialize(self.scheduler)
            .ok_or_else(incomplete)?;

        if log_enabled!(log::Level::Info) {
            let degrees = links.map(out_degree).run(self.scheduler).ok_or_else(incomplete)?;
            info!("Loaded {} distinct edges from {} source nodes",
                  degrees.iter().sum::<usize>(), degrees.len());
        }
        Ok(Adjacency { links })
    }
}

#[cfg(test)]
mod loader_test {
    use super::*;
    use std::num::NonZeroUsize;
    use rankflow_core::scheduler::LeveledScheduler;

    fn set(ns: &[&str]) -> HashSet<Node> {
        ns.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_parse_edge() {
        let line = |s: &str| -> Line { Ok(s.to_owned()) };
        assert_eq!(parse_edge(&line("a b")), Ok(("a".into(), "b".into())));
        assert_eq!(parse_edge(&line("a b extra tokens")), Ok(("a".into(), "b".into())));
        assert_eq!(parse_edge(&line("\t a   b ")), Ok(("a".into(), "b".into())));
        assert_eq!(parse_edge(&line("a")), Err(LineError::Malformed { line: "a".into() }));
        assert_eq!(parse_edge(&line("")), Err(LineError::Malformed { line: "".into() }));
    }

    #[test]
    fn test_duplicates_collapse() {
        let s = LeveledScheduler::new();
        let config = PageRankConfig::new(1);
        let adj = GraphLoader::new(&s, &config)
            .from_lines(vec!["a b", "a b", "a c", "b a", "a b"])
            .unwrap();
        let map = adj.to_map(&s).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], set(&["b", "c"]));
        assert_eq!(map["b"], set(&["a"]));

        let mut lists = adj.links().run(&s).unwrap();
        lists.sort();
        assert_eq!(lists[0].1.len(), 2);
    }

    #[test]
    fn test_self_loops_are_edges() {
        let s = LeveledScheduler::new();
        let adj = GraphLoader::new(&s, &PageRankConfig::new(1))
            .from_lines(vec!["a a"])
            .unwrap();
        assert_eq!(adj.to_map(&s).unwrap()["a"], set(&["a"]));
    }

    #[test]
    fn test_malformed_line_fails() {
        let s = LeveledScheduler::new();
        let config = PageRankConfig::new(1).with_partitions(NonZeroUsize::new(3).unwrap());
        let err = GraphLoader::new(&s, &config)
            .from_lines(vec!["a b", "lonely", "c d", "also"])
            .err()
            .unwrap();
        match err {
            Error::Line(LineError::Malformed { line }) => assert_eq!(line, "lonely"),
            e => panic!("unexpected error {}", e)
        }
    }

    #[test]
    fn test_empty_input() {
        let s = LeveledScheduler::new();
        let adj = GraphLoader::new(&s, &PageRankConfig::new(1))
            .from_lines(Vec::<String>::new())
            .unwrap();
        assert!(adj.to_map(&s).unwrap().is_empty());
    }
}
