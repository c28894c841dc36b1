use std::any::Any;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rankflow_core::deferred::{batch_apply, tree_reduce, Deferred};

/// Partition index for a key.  `DefaultHasher::new` uses fixed keys, so equal keys
/// land on the same index in every collection and every process.
pub fn hash_key<K: Hash>(key: &K) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() as usize
}

/// Routes every item of every block to one of `partitions` buckets.  The result holds,
/// for each bucket, the piece each input block sent to it.
pub fn split_by_key<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize
>(
    defs: &[Deferred<Vec<A>>],
    partitions: usize,
    route: F
) -> Vec<Vec<Deferred<Vec<A>>>> {

    let partitions = partitions.max(1);
    let stage1 = batch_apply(defs, move |_idx, vs| {
        let mut parts = vec![Vec::new(); partitions];
        for (idx, x) in vs.iter().enumerate() {
            parts[route(idx, x) % partitions].push(x.clone());
        }
        parts
    });

    (0..partitions).map(|p| {
        stage1.iter()
            .map(|s| s.apply(move |parts: &Vec<Vec<A>>| parts[p].clone()))
            .collect()
    }).collect()
}

/// Concatenates blocks into one.  An empty list yields an empty block.
pub fn concat<A: Any + Send + Sync + Clone>(defs: &[Deferred<Vec<A>>]) -> Deferred<Vec<A>> {
    let joined = tree_reduce(defs, |x, y| {
        let mut out = Vec::with_capacity(x.len() + y.len());
        out.extend(x.iter().cloned());
        out.extend(y.iter().cloned());
        out
    });
    joined.unwrap_or_else(|| Deferred::lift(Vec::new(), Some("empty")))
}

/// Redistributes items into `partitions` new blocks using `route`.
pub fn partition<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize
>(defs: &[Deferred<Vec<A>>], partitions: usize, route: F) -> Vec<Deferred<Vec<A>>> {
    split_by_key(defs, partitions, route).iter()
        .map(|group| concat(group))
        .collect()
}

/// Redistributes items so that all items with equal keys share a block.
pub fn partition_by_key<
    A: Any + Send + Sync + Clone,
    K: Hash,
    F: 'static + Sync + Send + Clone + Fn(&A) -> K
>(defs: &[Deferred<Vec<A>>], partitions: usize, key: F) -> Vec<Deferred<Vec<A>>> {
    partition(defs, partitions, move |_idx, v| hash_key(&key(v)))
}

fn merge_maps<
    K: Hash + Eq + Clone,
    B: Clone,
    R: Fn(&mut B, &B)
>(left: &HashMap<K, B>, right: &HashMap<K, B>, reduce: &R) -> HashMap<K, B> {
    let mut merged = left.clone();
    for (k, v) in right.iter() {
        match merged.entry(k.clone()) {
            Entry::Occupied(mut e) => reduce(e.get_mut(), v),
            Entry::Vacant(e) => { e.insert(v.clone()); }
        }
    }
    merged
}

/// Groups items by `key` and folds each group.  Every block is folded locally with
/// `binop` first; the partial results are then shuffled by key into `partitions`
/// blocks and combined with `reduce`.
pub fn fold_by<
    A: Any + Send + Sync + Clone,
    K: Any + Sync + Send + Clone + Hash + Eq,
    B: Any + Sync + Send + Clone,
    D: 'static + Sync + Send + Clone + Fn() -> B,
    F: 'static + Sync + Send + Clone + Fn(&A) -> K,
    O: 'static + Sync + Send + Clone + Fn(&mut B, &A),
    R: 'static + Sync + Send + Clone + Fn(&mut B, &B)
>(
    defs: &[Deferred<Vec<A>>],
    key: F,
    default: D,
    binop: O,
    reduce: R,
    partitions: usize
) -> Vec<Deferred<Vec<(K, B)>>> {

    // Block-local fold
    let stage1 = batch_apply(defs, move |_idx, vs| {
        let mut acc: HashMap<K, B> = HashMap::new();
        for v in vs.iter() {
            binop(acc.entry(key(v)).or_insert_with(&default), v);
        }
        acc.into_iter().collect::<Vec<_>>()
    });

    let shuffled = split_by_key(&stage1, partitions, |_idx, kv: &(K, B)| hash_key(&kv.0));

    shuffled.into_iter().map(|pieces| {
        let maps = batch_apply(&pieces, |_idx, vs| {
            vs.iter().cloned().collect::<HashMap<K, B>>()
        });
        let reduce = reduce.clone();
        match tree_reduce(&maps, move |l, r| merge_maps(l, r, &reduce)) {
            Some(merged) => merged.apply(|m| m.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>()),
            None => Deferred::lift(Vec::new(), Some("empty"))
        }
    }).collect()
}

/// Inner hash join of two blocks on their keys.  Keys missing from either side are
/// dropped; repeated keys produce every pairing.
pub fn join_on_key<
    K: Any + Send + Sync + Clone + Hash + Eq,
    V: Any + Send + Sync + Clone,
    W: Any + Send + Sync + Clone
>(
    left: &Deferred<Vec<(K, V)>>,
    right: &Deferred<Vec<(K, W)>>
) -> Deferred<Vec<(K, (V, W))>> {
    left.join(right, |left, right| {
        let mut table: HashMap<&K, Vec<&V>> = HashMap::with_capacity(left.len());
        for (k, v) in left.iter() {
            table.entry(k).or_insert_with(|| Vec::with_capacity(1)).push(v);
        }

        let mut out = Vec::new();
        for (k, w) in right.iter() {
            if let Some(vs) = table.get(k) {
                for v in vs.iter() {
                    out.push((k.clone(), ((*v).clone(), w.clone())));
                }
            }
        }
        out
    })
}

#[cfg(test)]
mod partitioned_test {
    use super::*;
    use rankflow_core::deferred::run_all;
    use rankflow_core::scheduler::LeveledScheduler;

    fn blocks(vs: Vec<Vec<usize>>) -> Vec<Deferred<Vec<usize>>> {
        vs.into_iter().map(|v| Deferred::lift(v, None)).collect()
    }

    #[test]
    fn test_partition_by_key_colocates_keys() {
        let defs = blocks(vec![vec![1, 2, 3], vec![3, 2, 1], vec![4]]);
        let parts = run_all(&partition_by_key(&defs, 3, |x| *x), &LeveledScheduler::new()).unwrap();
        assert_eq!(parts.len(), 3);
        for x in 1..5usize {
            let holders = parts.iter().filter(|p| p.contains(&x)).count();
            assert_eq!(holders, 1);
        }
        assert_eq!(parts.iter().map(|p| p.len()).sum::<usize>(), 7);
    }

    #[test]
    fn test_fold_by_counts() {
        let defs = blocks(vec![vec![1, 2, 1], vec![2, 2], vec![]]);
        for partitions in 1..4 {
            let folded = fold_by(&defs, |x| *x, || 0usize, |acc, _x| *acc += 1,
                                 |acc, other| *acc += *other, partitions);
            assert_eq!(folded.len(), partitions);
            let mut out: Vec<_> = run_all(&folded, &LeveledScheduler::new()).unwrap()
                .into_iter().flatten().collect();
            out.sort();
            assert_eq!(out, vec![(1, 2), (2, 3)]);
        }
    }

    #[test]
    fn test_join_on_key_is_inner() {
        let left = Deferred::lift(vec![(1usize, 'a'), (2, 'b'), (2, 'c')], None);
        let right = Deferred::lift(vec![(2usize, 10u32), (3, 30)], None);
        let mut out = join_on_key(&left, &right).run(&LeveledScheduler::new()).unwrap();
        out.sort();
        assert_eq!(out, vec![(2, ('b', 10)), (2, ('c', 10))]);
    }

    #[test]
    fn test_concat_empty() {
        let empty: Vec<Deferred<Vec<usize>>> = Vec::new();
        assert_eq!(concat(&empty).run(&LeveledScheduler::new()), Some(vec![]));
    }
}
