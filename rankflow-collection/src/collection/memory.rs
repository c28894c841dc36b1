//! MemoryCollection
//! ---
//! MemoryCollection provides dataflow operators over partitioned data kept in memory.
//! Every operator is lazy: it only extends the task graph behind each partition.  Work
//! happens when the collection is `run`, `materialize`d or `collect_map`ped.
//!

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;

use rankflow_core::deferred::{batch_apply, run_all, tree_reduce, Deferred};
use rankflow_core::scheduler::{LeveledScheduler, Scheduler};

use crate::partitioned::{fold_by, join_on_key, partition, partition_by_key};

/// MemoryCollection struct
pub struct MemoryCollection<A> {
    partitions: Vec<Deferred<Vec<A>>>
}

impl <A> Clone for MemoryCollection<A> {
    fn clone(&self) -> Self {
        MemoryCollection { partitions: self.partitions.clone() }
    }
}

impl <A: Any + Send + Sync + Clone> MemoryCollection<A> {

    /// Creates a MemoryCollection from a set of Deferred partitions.
    pub fn from_defs(vs: Vec<Deferred<Vec<A>>>) -> MemoryCollection<A> {
        MemoryCollection { partitions: vs }
    }

    /// Provides raw access to the underlying partitions
    pub fn to_defs(&self) -> &Vec<Deferred<Vec<A>>> {
        &self.partitions
    }

    /// Creates a single-partition MemoryCollection from a Vec of items
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   assert_eq!(col.run(&LeveledScheduler::new()), Some(vec![1,2,3usize]));
    /// ```
    pub fn from_vec(vs: Vec<A>) -> MemoryCollection<A> {
        MemoryCollection::from_partitions(vec![vs])
    }

    /// Creates a MemoryCollection with one partition per Vec
    pub fn from_partitions(parts: Vec<Vec<A>>) -> MemoryCollection<A> {
        let partitions = parts.into_iter()
            .enumerate()
            .map(|(i, vs)| Deferred::lift(vs, Some(&format!("partition-{}", i))))
            .collect();
        MemoryCollection { partitions }
    }

    /// Returns the current number of data partitions
    pub fn n_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Concatenates two collections into a single Collection
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let one = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   let two = MemoryCollection::from_vec(vec![4usize, 5, 6]);
    ///   let cat = one.concat(&two);
    ///   assert_eq!(cat.n_partitions(), 2);
    ///   assert_eq!(cat.run(&LeveledScheduler::new()), Some(vec![1,2,3,4,5,6]));
    /// ```
    pub fn concat(&self, other: &MemoryCollection<A>) -> MemoryCollection<A> {
        let mut partitions = self.partitions.clone();
        partitions.extend(other.partitions.iter().cloned());
        MemoryCollection { partitions }
    }

    /// Maps a function over the values in the collection
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let one = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   let strings = one.map(|i| format!("{}", i));
    ///   assert_eq!(strings.run(&LeveledScheduler::new()),
    ///     Some(vec!["1".into(),"2".into(),"3".into()]));
    /// ```
    pub fn map<
        B: Any + Send + Sync + Clone,
        F: 'static + Sync + Send + Clone + Fn(&A) -> B
    >(&self, f: F) -> MemoryCollection<B> {
        self.emit(move |x, emitter| emitter(f(x)))
    }

    /// Filters out items in the collection that fail the predicate.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   let odds = col.filter(|x| x % 2 == 1);
    ///   assert_eq!(odds.run(&LeveledScheduler::new()), Some(vec![1, 3usize]));
    /// ```
    pub fn filter<
        F: 'static + Sync + Send + Clone + Fn(&A) -> bool
    >(&self, f: F) -> MemoryCollection<A> {
        self.emit(move |x, emitter| {
            if f(x) {
                emitter(x.clone())
            }
        })
    }

    /// Maps over all items in a collection, emitting zero or more new values per item.
    /// It fuses map, filter and flat_map into a single method.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   let new = col.emit(|item, emitter| {
    ///     if item % 2 == 0 {
    ///         emitter(format!("{}!", item));
    ///     }
    ///   });
    ///   assert_eq!(new.run(&LeveledScheduler::new()), Some(vec!["2!".into()]));
    /// ```
    pub fn emit<
        B: Any + Send + Sync + Clone,
        F: 'static + Sync + Send + Clone + Fn(&A, &mut dyn FnMut(B))
    >(&self, f: F) -> MemoryCollection<B> {
        let partitions = batch_apply(&self.partitions, move |_idx, vs| {
            let mut out = Vec::with_capacity(vs.len());
            for v in vs.iter() {
                f(v, &mut |b| out.push(b));
            }
            out
        });
        MemoryCollection { partitions }
    }

    /// Re-partitions a collection into `n_chunks`, spreading every old partition
    /// uniformly over the new ones.
    /// ```rust
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3usize]);
    ///   assert_eq!(col.n_partitions(), 1);
    ///   assert_eq!(col.split(2).n_partitions(), 2);
    /// ```
    pub fn split(&self, n_chunks: usize) -> MemoryCollection<A> {
        self.partition(n_chunks, |idx, _x| idx)
    }

    /// Re-partitions data into `partitions` new partitions.  The returned value of `f`
    /// is taken modulo the partition count.
    pub fn partition<
        F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize
    >(&self, partitions: usize, f: F) -> MemoryCollection<A> {
        MemoryCollection { partitions: partition(&self.partitions, partitions, f) }
    }

    /// Re-partitions values so that items with equal keys share a partition.
    pub fn partition_by_key<
        K: Hash,
        F: 'static + Sync + Send + Clone + Fn(&A) -> K
    >(&self, n_chunks: usize, key: F) -> MemoryCollection<A> {
        MemoryCollection { partitions: partition_by_key(&self.partitions, n_chunks, key) }
    }

    /// Folds values sharing a key into `partitions` new partitions.
    ///
    /// Each partition is first folded locally with `binop`; the partial folds are then
    /// hashed by key to their new partition and combined with `reduce`.
    ///
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3,4,5usize]);
    ///   // Sum all odds and evens together
    ///   let group_sum = col.fold_by(|x| x % 2,
    ///                               || 0usize,
    ///                               |block_acc, item| {*block_acc += *item},
    ///                               |part_acc1, part_acc2| {*part_acc1 += *part_acc2},
    ///                               1)
    ///                   .sort_by(|x| x.0);
    ///
    ///   assert_eq!(group_sum.run(&LeveledScheduler::new()), Some(vec![(0, 6), (1, 9)]));
    /// ```
    pub fn fold_by<
        K: Any + Sync + Send + Clone + Hash + Eq,
        B: Any + Sync + Send + Clone,
        D: 'static + Sync + Send + Clone + Fn() -> B,
        F: 'static + Sync + Send + Clone + Fn(&A) -> K,
        O: 'static + Sync + Send + Clone + Fn(&mut B, &A),
        R: 'static + Sync + Send + Clone + Fn(&mut B, &B)
    >(&self, key: F, default: D, binop: O, reduce: R, partitions: usize) -> MemoryCollection<(K, B)> {
        MemoryCollection {
            partitions: fold_by(&self.partitions, key, default, binop, reduce, partitions)
        }
    }

    /// Sorts values within each partition by a key function.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1,2,3,4i32]);
    ///   assert_eq!(col.sort_by(|x| -*x).run(&LeveledScheduler::new()), Some(vec![4, 3, 2, 1]));
    /// ```
    pub fn sort_by<
        K: Ord,
        F: 'static + Sync + Send + Clone + Fn(&A) -> K
    >(&self, key: F) -> MemoryCollection<A> {
        let partitions = batch_apply(&self.partitions, move |_idx, vs| {
            let mut sorted = vs.clone();
            sorted.sort_by_key(|v| key(v));
            sorted
        });
        MemoryCollection { partitions }
    }

    /// Returns the number of items in the collection as a single-item collection.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![1usize, 2, 3, 4]).split(3);
    ///   assert_eq!(col.count().run(&LeveledScheduler::new()), Some(vec![4]));
    /// ```
    pub fn count(&self) -> MemoryCollection<usize> {
        let sizes = batch_apply(&self.partitions, |_idx, vs| vs.len());
        let total = tree_reduce(&sizes, |x, y| x + y)
            .unwrap_or_else(|| Deferred::lift(0usize, Some("empty")));
        MemoryCollection { partitions: vec![total.apply(|n| vec![*n])] }
    }

    /// Computes every partition and lifts the results back in as fresh partitions.
    /// The returned collection no longer carries the graph that produced it, so later
    /// operators never recompute it.  None if the scheduler failed to produce a partition.
    pub fn materialize<S: Scheduler>(&self, s: &S) -> Option<MemoryCollection<A>> {
        let parts = run_all(&self.partitions, s)?;
        Some(MemoryCollection::from_partitions(parts))
    }

    /// Executes the Collection, returning all items partition by partition.
    pub fn run<S: Scheduler>(&self, s: &S) -> Option<Vec<A>> {
        let parts = run_all(&self.partitions, s)?;
        Some(parts.into_iter().flatten().collect())
    }

    /// Executes the Collection on a LeveledScheduler
    pub fn eval(&self) -> Option<Vec<A>> {
        self.run(&LeveledScheduler::new())
    }
}

impl <A: Any + Send + Sync + Clone + Hash + Eq> MemoryCollection<A> {

    /// Removes duplicate items, hashing the survivors into `partitions` partitions.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![3, 1, 3, 2, 1usize]);
    ///   let mut unique = col.distinct(2).run(&LeveledScheduler::new()).unwrap();
    ///   unique.sort();
    ///   assert_eq!(unique, vec![1, 2, 3]);
    /// ```
    pub fn distinct(&self, partitions: usize) -> MemoryCollection<A> {
        self.fold_by(|x| x.clone(), || (), |_acc, _x| {}, |_acc, _other| {}, partitions)
            .map(|(x, _unit)| x.clone())
    }
}

impl <K, V> MemoryCollection<(K, V)>
        where K: Any + Send + Sync + Clone + Hash + Eq,
              V: Any + Send + Sync + Clone {

    /// Maps over the values of a keyed collection, keeping keys and partitioning.
    pub fn map_values<
        W: Any + Send + Sync + Clone,
        F: 'static + Sync + Send + Clone + Fn(&V) -> W
    >(&self, f: F) -> MemoryCollection<(K, W)> {
        self.map(move |(k, v)| (k.clone(), f(v)))
    }

    /// Drops the values of a keyed collection
    pub fn keys(&self) -> MemoryCollection<K> {
        self.map(|(k, _v)| k.clone())
    }

    /// Gathers every value of a key into one Vec.  The order of values within a group
    /// is unspecified.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![("a", 1), ("b", 2), ("a", 3)]);
    ///   let mut groups = col.group_by_key(2).run(&LeveledScheduler::new()).unwrap();
    ///   groups.iter_mut().for_each(|(_k, vs)| vs.sort());
    ///   groups.sort();
    ///   assert_eq!(groups, vec![("a", vec![1, 3]), ("b", vec![2])]);
    /// ```
    pub fn group_by_key(&self, partitions: usize) -> MemoryCollection<(K, Vec<V>)> {
        let shuffled = partition_by_key(&self.partitions, partitions, |kv: &(K, V)| kv.0.clone());
        let grouped = batch_apply(&shuffled, |_idx, vs| {
            let mut groups: HashMap<K, Vec<V>> = HashMap::new();
            for (k, v) in vs.iter() {
                groups.entry(k.clone()).or_default().push(v.clone());
            }
            groups.into_iter().collect::<Vec<_>>()
        });
        MemoryCollection { partitions: grouped }
    }

    /// Combines every value of a key with `reduce`, which must be associative and
    /// commutative: values are combined within partitions first, in no particular order.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let col = MemoryCollection::from_vec(vec![("a", 1), ("b", 2), ("a", 3)]).split(2);
    ///   let mut sums = col.reduce_by_key(|x, y| x + y, 3).run(&LeveledScheduler::new()).unwrap();
    ///   sums.sort();
    ///   assert_eq!(sums, vec![("a", 4), ("b", 2)]);
    /// ```
    pub fn reduce_by_key<
        R: 'static + Sync + Send + Clone + Fn(&V, &V) -> V
    >(&self, reduce: R, partitions: usize) -> MemoryCollection<(K, V)> {
        let fold = reduce.clone();
        self.fold_by(
            |kv: &(K, V)| kv.0.clone(),
            || None,
            move |acc: &mut Option<V>, kv: &(K, V)| {
                *acc = Some(match acc.take() {
                    Some(a) => fold(&a, &kv.1),
                    None => kv.1.clone()
                });
            },
            move |acc: &mut Option<V>, other: &Option<V>| {
                *acc = match (acc.take(), other) {
                    (Some(a), Some(b)) => Some(reduce(&a, b)),
                    (a, b) => a.or_else(|| b.clone())
                };
            },
            partitions)
        .emit(|(k, acc), emitter| {
            if let Some(v) = acc {
                emitter((k.clone(), v.clone()));
            }
        })
    }

    /// Inner joins two keyed collections.  Keys missing from either side are dropped;
    /// a key repeated on both sides yields every pairing.
    /// ```rust
    ///   use rankflow_core::scheduler::LeveledScheduler;
    ///   use rankflow_collection::collection::memory::MemoryCollection;
    ///
    ///   let ages = MemoryCollection::from_vec(vec![("Andrew".to_owned(), 33u32), ("Leah".to_owned(), 12)]);
    ///   let money = MemoryCollection::from_vec(vec![("Leah".to_owned(), 20.50f32)]);
    ///   let joined = ages.join(&money, 4).run(&LeveledScheduler::new()).unwrap();
    ///   assert_eq!(joined, vec![("Leah".to_owned(), (12, 20.50))]);
    /// ```
    pub fn join<W: Any + Send + Sync + Clone>(
        &self,
        other: &MemoryCollection<(K, W)>,
        partitions: usize
    ) -> MemoryCollection<(K, (V, W))> {
        let left = partition_by_key(&self.partitions, partitions, |kv: &(K, V)| kv.0.clone());
        let right = partition_by_key(&other.partitions, partitions, |kv: &(K, W)| kv.0.clone());

        let joined = left.iter()
            .zip(right.iter())
            .map(|(l, r)| join_on_key(l, r))
            .collect();
        MemoryCollection { partitions: joined }
    }

    /// Executes the Collection into a HashMap.  When a key repeats, the last value wins.
    pub fn collect_map<S: Scheduler>(&self, s: &S) -> Option<HashMap<K, V>> {
        self.run(s).map(|kvs| kvs.into_iter().collect())
    }
}

#[cfg(test)]
mod test_lib {
    use super::*;
    use rankflow_core::scheduler::GreedyScheduler;

    #[test]
    fn test_fold_by() {
        let col = MemoryCollection::from_vec(vec![1,2,3,1,2usize]);
        let out = col.fold_by(|x| *x, || 0, |x, _y| *x += 1, |x, y| *x += y, 1);
        let mut results = out.run(&LeveledScheduler::new()).unwrap();
        results.sort();
        assert_eq!(results, vec![(1, 2), (2, 2), (3, 1)]);
    }

    #[test]
    fn test_fold_by_parts() {
        let col = MemoryCollection::from_vec(vec![1,2,3,1,2usize]).split(3);
        let out = col.fold_by(|x| *x, || 0, |x, _y| *x += 1, |x, y| *x += y, 2);
        assert_eq!(out.n_partitions(), 2);
        let mut results = out.run(&GreedyScheduler::new(4)).unwrap();
        results.sort();
        assert_eq!(results, vec![(1, 2), (2, 2), (3, 1)]);
    }

    #[test]
    fn test_partition() {
        let col = MemoryCollection::from_vec(vec![1,2,3,1,2usize]);
        let computed = col.partition(2, |_idx, x| x % 2).sort_by(|x| *x);
        assert_eq!(computed.n_partitions(), 2);
        assert_eq!(computed.run(&LeveledScheduler::new()), Some(vec![2, 2, 1, 1, 3]));
    }

    #[test]
    fn test_count_empty() {
        let col: MemoryCollection<usize> = MemoryCollection::from_defs(Vec::new());
        assert_eq!(col.count().eval(), Some(vec![0]));
        assert_eq!(col.eval(), Some(vec![]));
    }

    #[test]
    fn test_join_drops_unmatched_keys() {
        let left = MemoryCollection::from_vec(vec![("a", 1), ("b", 2), ("b", 3)]).split(2);
        let right = MemoryCollection::from_vec(vec![("b", 'x'), ("c", 'y')]);
        for parts in 1..4 {
            let mut joined = left.join(&right, parts).run(&LeveledScheduler::new()).unwrap();
            joined.sort();
            assert_eq!(joined, vec![("b", (2, 'x')), ("b", (3, 'x'))]);
        }
    }

    #[test]
    fn test_reduce_by_key_partition_independent() {
        let pairs: Vec<(usize, u64)> = (0..200u64).map(|i| ((i % 7) as usize, i)).collect();
        let mut expected: Vec<(usize, u64)> = (0..7usize)
            .map(|k| (k, (0..200u64).filter(|i| (i % 7) as usize == k).sum()))
            .collect();
        expected.sort();

        for (splits, parts) in vec![(1, 1), (3, 2), (5, 7), (8, 3)] {
            let col = MemoryCollection::from_vec(pairs.clone()).split(splits);
            let mut sums = col.reduce_by_key(|x, y| x + y, parts).eval().unwrap();
            sums.sort();
            assert_eq!(sums, expected);
        }
    }

    #[test]
    fn test_materialize_cuts_graph() {
        let col = MemoryCollection::from_vec(vec![1usize, 2, 3])
            .split(2)
            .map(|x| x * 10)
            .filter(|x| *x > 10);
        let before = col.to_defs()[0].n_tasks();
        let fixed = col.materialize(&LeveledScheduler::new()).unwrap();
        assert!(before > 1);
        assert_eq!(fixed.n_partitions(), 2);
        assert!(fixed.to_defs().iter().all(|d| d.n_tasks() == 1));

        let mut out = fixed.eval().unwrap();
        out.sort();
        assert_eq!(out, vec![20, 30]);
    }

    #[test]
    fn test_collect_map_and_values() {
        let col = MemoryCollection::from_vec(vec![("a".to_owned(), 1.0f64), ("b".to_owned(), 2.0)])
            .map_values(|v| v * 0.5);
        let m = col.collect_map(&LeveledScheduler::new()).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m["b"], 1.0);
        let mut keys = col.keys().eval().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
    }
}
