use std::collections::HashMap;

use rankflow_collection::collection::MemoryCollection;
use rankflow_core::scheduler::Scheduler;

use crate::loader::{Adjacency, Node};

/// Every page starts with this rank
pub const INITIAL_RANK: f64 = 1.0;

/// Current rank of every ranked page, one entry per node.
#[derive(Clone)]
pub struct RankStore {
    ranks: MemoryCollection<(Node, f64)>
}

fn initial_rank(entry: &(Node, Vec<Node>)) -> (Node, f64) {
    (entry.0.clone(), INITIAL_RANK)
}

impl RankStore {
    /// Seeds a rank of 1.0 for each source node of the adjacency.  Pages that only
    /// appear as neighbors start unranked.
    pub fn initial(adjacency: &Adjacency) -> RankStore {
        RankStore { ranks: adjacency.links().map(initial_rank) }
    }

    /// Wraps a collection of ranks
    pub fn from_collection(ranks: MemoryCollection<(Node, f64)>) -> RankStore {
        RankStore { ranks }
    }

    pub fn ranks(&self) -> &MemoryCollection<(Node, f64)> {
        &self.ranks
    }

    /// Computes the ranks and drops the graph that produced them.
    pub fn materialize<S: Scheduler>(&self, s: &S) -> Option<RankStore> {
        self.ranks.materialize(s).map(RankStore::from_collection)
    }

    pub fn collect<S: Scheduler>(&self, s: &S) -> Option<HashMap<Node, f64>> {
        self.ranks.collect_map(s)
    }
}

#[cfg(test)]
mod ranks_test {
    use super::*;
    use rankflow_core::scheduler::LeveledScheduler;
    use crate::config::PageRankConfig;
    use crate::loader::GraphLoader;

    #[test]
    fn test_initial_ranks_cover_sources_only() {
        let s = LeveledScheduler::new();
        let adj = GraphLoader::new(&s, &PageRankConfig::new(1))
            .from_lines(vec!["a b", "a c", "b a"])
            .unwrap();
        let ranks = RankStore::initial(&adj).collect(&s).unwrap();
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks["a"], 1.0);
        assert_eq!(ranks["b"], 1.0);
        assert!(!ranks.contains_key("c"));
    }
}
