use rankflow_collection::collection::MemoryCollection;

use crate::contributions::Contribution;
use crate::ranks::RankStore;

/// Rank every contributed-to page receives regardless of its inbound links
pub const BASE_RANK: f64 = 0.15;

/// Weight of the summed contributions
pub const DAMPING: f64 = 0.85;

/// Adds two contributions.  Partial sums are combined in no particular order.
pub fn add_contributions(a: &f64, b: &f64) -> f64 {
    a + b
}

/// Turns a contribution total into a rank
pub fn damp(sum: &f64) -> f64 {
    BASE_RANK + DAMPING * sum
}

/// Sums contributions per node and damps each sum into the next round's ranks.
/// Nodes that received no contribution drop out.
pub fn aggregate(contributions: &MemoryCollection<Contribution>, partitions: usize) -> RankStore {
    RankStore::from_collection(contributions
        .reduce_by_key(add_contributions, partitions)
        .map_values(damp))
}
