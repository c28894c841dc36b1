use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::graph::{Deps, Graph, Handle, Input};
use crate::scheduler::Scheduler;
use crate::task::{Binary, Payload, Unary};

struct Lift<A>(A);

impl <A: Any + Send + Sync + Clone> Input for Lift<A> {
    fn read(&self) -> Payload {
        Box::new(self.0.clone())
    }
}

/// A value of type `A` which will exist once its graph has been run.
pub struct Deferred<A> {
    graph: Arc<Graph>,
    handle: Arc<Handle>,
    items: PhantomData<fn() -> A>
}

impl <A> Clone for Deferred<A> {
    fn clone(&self) -> Self {
        Deferred {
            graph: self.graph.clone(),
            handle: self.handle.clone(),
            items: PhantomData
        }
    }
}

impl <A: Any + Send + Sync> Deferred<A> {

    /// Applies `f` to the deferred value, producing a new Deferred.
    pub fn apply<
        B: Any + Send + Sync,
        F: Send + Sync + 'static + Fn(&A) -> B
    >(&self, f: F) -> Deferred<B> {
        let mut graph = (*self.graph).clone();
        let handle = graph.add_task(Deps::Single(self.handle.clone()), Unary::new(f), "apply");
        Deferred { graph: Arc::new(graph), handle, items: PhantomData }
    }

    /// Combines two deferred values with `f`.
    pub fn join<
        B: Any + Send + Sync,
        C: Any + Send + Sync,
        F: Send + Sync + 'static + Fn(&A, &B) -> C
    >(&self, other: &Deferred<B>, f: F) -> Deferred<C> {
        let mut graph = self.graph.merge(&other.graph);
        let handle = graph.add_task(
            Deps::Join(self.handle.clone(), other.handle.clone()),
            Binary::new(f), "join");
        Deferred { graph: Arc::new(graph), handle, items: PhantomData }
    }

    /// Number of tasks needed to produce this value
    pub fn n_tasks(&self) -> usize {
        self.graph.len()
    }
}

impl <A: Any + Send + Sync + Clone> Deferred<A> {

    /// Lifts a concrete value into a Deferred.
    pub fn lift(a: A, name: Option<&str>) -> Self {
        let mut graph = Graph::new();
        let handle = graph.add_input(Lift(a), name.unwrap_or("lift"));
        Deferred { graph: Arc::new(graph), handle, items: PhantomData }
    }

    /// Runs the graph on the scheduler, returning the value.  None means a task in the
    /// graph failed to produce its output.
    pub fn run<S: Scheduler>(&self, s: &S) -> Option<A> {
        s.compute(self.graph.clone(), &[self.handle.clone()])
            .and_then(|mut vs| vs.pop())
            .and_then(|v| v.downcast_ref::<A>().cloned())
    }
}

/// Runs several Deferreds within a single scheduler pass so that shared upstream tasks
/// are only computed once.  Values are returned in the order of `defs`.
pub fn run_all<A: Any + Send + Sync + Clone, S: Scheduler>(
    defs: &[Deferred<A>],
    s: &S
) -> Option<Vec<A>> {
    if defs.is_empty() {
        return Some(Vec::new());
    }

    let mut graph = (*defs[0].graph).clone();
    for d in defs[1..].iter() {
        graph.absorb(&d.graph);
    }
    let outputs: Vec<_> = defs.iter().map(|d| d.handle.clone()).collect();

    let values = s.compute(Arc::new(graph), &outputs)?;
    values.iter()
        .map(|v| v.downcast_ref::<A>().cloned())
        .collect()
}

/// Applies `f` to each Deferred along with its index.
pub fn batch_apply<
    A: Any + Send + Sync + Clone,
    B: Any + Send + Sync,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> B
>(defs: &[Deferred<A>], f: F) -> Vec<Deferred<B>> {
    defs.iter().enumerate().map(|(idx, d)| {
        let f = f.clone();
        d.apply(move |vs| f(idx, vs))
    }).collect()
}

/// Pairwise reduction of Deferreds into one.  None when `defs` is empty.
pub fn tree_reduce<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(&A, &A) -> A
>(defs: &[Deferred<A>], f: F) -> Option<Deferred<A>> {
    tree_reduce_until(defs, 1, f).map(|mut defs| defs.remove(0))
}

/// Pairwise reduction of Deferreds until at most `parts` remain.
pub fn tree_reduce_until<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(&A, &A) -> A
>(defs: &[Deferred<A>], parts: usize, f: F) -> Option<Vec<Deferred<A>>> {
    if defs.is_empty() {
        return None;
    }

    let mut level = defs.to_vec();
    while level.len() > parts.max(1) {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        for pair in level.chunks(2) {
            match pair {
                [l, r] => next.push(l.join(r, f.clone())),
                [odd] => next.push(odd.clone()),
                _ => unreachable!()
            }
        }
        level = next;
    }
    Some(level)
}

#[cfg(test)]
mod def_test {
    use super::*;
    use crate::scheduler::{GreedyScheduler, LeveledScheduler};

    #[test]
    fn test_tree_reduce() {
        let v: Vec<_> = (0..999usize)
            .map(|x| Deferred::lift(x, None))
            .collect();

        let expected = (0..999usize).sum();

        let agg = tree_reduce(&v, |x, y| x + y).unwrap();
        assert_eq!(agg.run(&LeveledScheduler::new()), Some(expected));
        assert_eq!(agg.run(&GreedyScheduler::new(4)), Some(expected));
    }

    #[test]
    fn test_tree_reduce_until() {
        let v: Vec<_> = (0..10usize).map(|x| Deferred::lift(x, None)).collect();
        let parts = tree_reduce_until(&v, 3, |x, y| x + y).unwrap();
        assert_eq!(parts.len(), 3);
        let total: usize = run_all(&parts, &LeveledScheduler::new()).unwrap().iter().sum();
        assert_eq!(total, 45);
        assert!(tree_reduce::<usize, _>(&[], |x, y| x + y).is_none());
    }

    #[test]
    fn test_run_all_shares_upstream() {
        let base = Deferred::lift(vec![1usize, 2, 3], Some("base"));
        let sum = base.apply(|xs| xs.iter().sum::<usize>());
        let outs = vec![sum.apply(|s| s + 1), sum.apply(|s| s * 2), sum.clone()];
        assert_eq!(run_all(&outs, &GreedyScheduler::new(2)), Some(vec![7, 12, 6]));
        assert_eq!(run_all::<usize, _>(&[], &LeveledScheduler::new()), Some(vec![]));
    }

    #[test]
    fn test_join() {
        let hello = Deferred::lift("Hello".to_owned(), None);
        let world = Deferred::lift("World".to_owned(), None)
            .apply(|w| format!("{}!", w));
        let both = hello.join(&world, |h, w| format!("{} {}", h, w));
        assert_eq!(both.run(&LeveledScheduler::new()), Some("Hello World!".into()));
        assert_eq!(both.n_tasks(), 4);
    }
}
