use rankflow_collection::collection::MemoryCollection;

use crate::loader::{Adjacency, Node};
use crate::ranks::RankStore;

/// A share of rank flowing into a node
pub type Contribution = (Node, f64);

/// Splits a source's rank evenly across its neighbors.
/// ```rust
///   use rankflow::contributions::spread_rank;
///
///   let entry = ("a".to_owned(), (vec!["b".to_owned(), "c".to_owned()], 1.0));
///   let mut out = Vec::new();
///   spread_rank(&entry, &mut |c: (String, f64)| out.push(c));
///   assert_eq!(out, vec![("b".to_owned(), 0.5), ("c".to_owned(), 0.5)]);
/// ```
pub fn spread_rank(entry: &(Node, (Vec<Node>, f64)), emit: &mut dyn FnMut(Contribution)) {
    let (_src, (neighbors, rank)) = entry;
    let share = rank / neighbors.len() as f64;
    for n in neighbors.iter() {
        emit((n.clone(), share));
    }
}

/// Joins adjacency with ranks and emits every neighbor's share.  Sources without a
/// rank, and ranked nodes without outgoing links, contribute nothing.
pub fn contributions(
    adjacency: &Adjacency,
    ranks: &RankStore,
    partitions: usize
) -> MemoryCollection<Contribution> {
    adjacency.links()
        .join(ranks.ranks(), partitions)
        .emit(spread_rank)
}

#[cfg(test)]
mod contributions_test {
    use super::*;
    use rankflow_core::scheduler::LeveledScheduler;
    use crate::config::PageRankConfig;
    use crate::loader::GraphLoader;

    #[test]
    fn test_unranked_sources_contribute_nothing() {
        let s = LeveledScheduler::new();
        let adj = GraphLoader::new(&s, &PageRankConfig::new(1))
            .from_lines(vec!["a b", "a c", "b c"])
            .unwrap();
        let ranks = RankStore::from_collection(MemoryCollection::from_vec(vec![
            ("a".to_owned(), 2.0),
            ("c".to_owned(), 5.0),
        ]));
        let mut out = contributions(&adj, &ranks, 2).run(&s).unwrap();
        out.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(out, vec![("b".to_owned(), 1.0), ("c".to_owned(), 1.0)]);
    }
}
