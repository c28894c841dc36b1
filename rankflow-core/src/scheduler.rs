use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use log::Level::{Debug as LDebug, Trace};
use priority_queue::PriorityQueue;
use rayon::prelude::*;

use crate::graph::{Deps, Graph, Handle, Task};
use crate::task::{Args, Payload};

type Chain = Vec<Arc<Handle>>;
type DepGraph = HashMap<Arc<Handle>, HashSet<Arc<Handle>>>;
type ChainGraph = HashMap<Chain, HashSet<Arc<Handle>>>;

/// Number of times a task chain is attempted before its output is given up on.
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Executes a Graph, returning the values of `outputs` in order.  None if any of the
/// outputs could not be produced.
pub trait Scheduler {
    /// Runs `graph` far enough to produce every handle in `outputs`
    fn compute(&self, graph: Arc<Graph>, outputs: &[Arc<Handle>]) -> Option<Vec<Arc<Payload>>>;
}

/// Reference counted store of intermediate values.  A value is dropped as soon as its
/// last consumer has read it.
struct DataStore {
    data: HashMap<Arc<Handle>, Arc<Payload>>,
    counts: HashMap<Arc<Handle>, usize>
}

impl DataStore {
    fn new(counts: HashMap<Arc<Handle>, usize>) -> Self {
        DataStore { data: HashMap::new(), counts }
    }

    fn get(&mut self, handle: &Arc<Handle>) -> Option<Arc<Payload>> {
        let remaining = match self.counts.get_mut(handle) {
            Some(c) => {
                *c = c.saturating_sub(1);
                *c
            },
            None => 0
        };

        if remaining == 0 {
            self.data.remove(handle)
        } else {
            self.data.get(handle).cloned()
        }
    }

    fn insert(&mut self, handle: Arc<Handle>, value: Arc<Payload>) {
        self.data.insert(handle, value);
    }
}

type SharedStore = Arc<Mutex<DataStore>>;

fn lock(store: &Mutex<DataStore>) -> MutexGuard<DataStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Fetched {
    One(Arc<Payload>),
    Two(Arc<Payload>, Arc<Payload>)
}

fn fetch(ds: &mut DataStore, deps: &Deps) -> Option<Fetched> {
    match deps {
        Deps::Single(h) => ds.get(h).map(Fetched::One),
        Deps::Join(l, r) => {
            let left = ds.get(l);
            let right = ds.get(r);
            Some(Fetched::Two(left?, right?))
        }
    }
}

// Inbound and outbound edges between individual tasks, plus the number of arguments
// each task takes.  A self join has one upstream task but two arguments.
fn build_dep_graph(graph: &Graph) -> (DepGraph, DepGraph, HashMap<Arc<Handle>, usize>) {
    let mut inbound: DepGraph = HashMap::new();
    let mut outbound: DepGraph = HashMap::new();
    let mut arity = HashMap::new();
    for (task, deps) in graph.dependencies.iter() {
        let args: Vec<_> = deps.iter().flat_map(|d| d.handles()).collect();
        arity.insert(task.clone(), args.len());
        let upstream: HashSet<_> = args.into_iter().cloned().collect();

        for h in upstream.iter() {
            outbound.entry(h.clone()).or_default().insert(task.clone());
        }
        inbound.insert(task.clone(), upstream);
    }
    (inbound, outbound, arity)
}

// Fuses runs of tasks where each link has exactly one consumer, and that consumer
// takes exactly one argument, into chains.  A requested output always ends its chain
// so that its value lands in the data store.
fn collapse_graph<K: Hash + Eq + Debug + Clone>(
    mut nodes: HashMap<K, HashSet<K>>,
    arity: &HashMap<K, usize>,
    outputs: &HashSet<K>
) -> HashMap<Vec<K>, HashSet<K>> {

    let mut outbound: HashMap<K, Vec<K>> = HashMap::new();
    let mut roots = Vec::new();
    for (node, deps) in nodes.iter() {
        outbound.entry(node.clone()).or_default();
        for d in deps.iter() {
            outbound.entry(d.clone()).or_default().push(node.clone());
        }
        if deps.is_empty() {
            roots.push(vec![node.clone()]);
        }
    }

    let mut chains = HashMap::new();
    let mut seen = HashSet::new();
    while let Some(mut chain) = roots.pop() {
        let next = {
            let tail = &chain[chain.len() - 1];
            match outbound[tail].as_slice() {
                [only] if arity.get(only) == Some(&1) && !outputs.contains(tail) => Some(only.clone()),
                _ => None
            }
        };

        match next {
            Some(node) => {
                chain.push(node);
                roots.push(chain);
            },
            None => {
                for node in outbound[&chain[chain.len() - 1]].iter() {
                    if seen.insert(node.clone()) {
                        roots.push(vec![node.clone()]);
                    }
                }
                if let Some(deps) = nodes.remove(&chain[0]) {
                    chains.insert(chain, deps);
                }
            }
        }
    }
    chains
}

// Groups chains into levels; every chain in a level only depends on earlier levels
fn generate_levels(collapsed: &ChainGraph) -> Vec<Vec<Chain>> {
    let mut consumers: HashMap<&Arc<Handle>, Vec<&Chain>> = HashMap::new();
    for (chain, deps) in collapsed.iter() {
        for d in deps.iter() {
            consumers.entry(d).or_default().push(chain);
        }
    }

    let mut pending: HashMap<&Chain, usize> = collapsed.iter()
        .map(|(chain, deps)| (chain, deps.len()))
        .collect();

    let mut levels = Vec::new();
    let mut current: Vec<Chain> = pending.iter()
        .filter(|(_, n)| **n == 0)
        .map(|(c, _)| (*c).clone())
        .collect();

    while !current.is_empty() {
        let mut next = Vec::new();
        for chain in current.iter() {
            let tail = &chain[chain.len() - 1];
            for consumer in consumers.get(tail).into_iter().flatten() {
                if let Some(n) = pending.get_mut(*consumer) {
                    *n -= 1;
                    if *n == 0 {
                        next.push((*consumer).clone());
                    }
                }
            }
        }
        levels.push(current);
        current = next;
    }

    if log_enabled!(LDebug) {
        let widest = levels.iter().map(|l| l.len()).max().unwrap_or(0);
        for (i, l) in levels.iter().enumerate() {
            trace!("Level: {}, Chains: {}", i, l.len());
        }
        debug!("Levels: {}, Max Concurrency: {}", levels.len(), widest);
    }
    levels
}

// How many times each handle will be read: once per consuming chain argument, plus
// once per requested output.
fn read_counts(collapsed: &ChainGraph, graph: &Graph, outputs: &[Arc<Handle>]) -> HashMap<Arc<Handle>, usize> {
    let mut counts = HashMap::new();
    for chain in collapsed.keys() {
        if let Some(Some(deps)) = graph.dependencies.get(&chain[0]) {
            for h in deps.handles() {
                *counts.entry(h.clone()).or_insert(0usize) += 1;
            }
        }
    }
    for h in outputs {
        *counts.entry(h.clone()).or_insert(0usize) += 1;
    }
    counts
}

fn eval_chain(graph: &Graph, chain: &[Arc<Handle>], args: Option<&Fetched>) -> Option<Arc<Payload>> {
    let mut current: Option<Arc<Payload>> = None;
    for (i, handle) in chain.iter().enumerate() {
        trace!("Evaluating {:?}", handle);
        let task: &Task = graph.tasks.get(handle)?;
        let out = match task {
            Task::Input(input) => input.read(),
            Task::Function(op) if i == 0 => match args? {
                Fetched::One(a) => op.eval(Args::One(&**a))?,
                Fetched::Two(a, b) => op.eval(Args::Two(&**a, &**b))?
            },
            Task::Function(op) => op.eval(Args::One(&**current.as_ref()?))?
        };
        current = Some(Arc::new(out));
    }
    current
}

// Runs a chain, re-executing it when an operator panics.  Inputs are held until the
// chain finishes, so every attempt sees the same values.  Returns whether the chain's
// output was stored.
fn run_chain(graph: &Graph, chain: &[Arc<Handle>], store: &Mutex<DataStore>, attempts: usize) -> bool {
    let args = match graph.dependencies.get(&chain[0]) {
        Some(Some(deps)) => match fetch(&mut lock(store), deps) {
            Some(fetched) => Some(fetched),
            None => {
                warn!("Missing inputs for {:?}", chain[0]);
                return false;
            }
        },
        _ => None
    };

    for attempt in 1..=attempts.max(1) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            eval_chain(graph, chain, args.as_ref())
        }));
        match result {
            Ok(Some(value)) => {
                lock(store).insert(chain[chain.len() - 1].clone(), value);
                return true;
            },
            Ok(None) => {
                warn!("Chain {:?} produced no value", chain[0]);
                return false;
            },
            Err(_) => warn!("Chain {:?} panicked, attempt {} of {}", chain[0], attempt, attempts)
        }
    }
    error!("Giving up on chain {:?}", chain[0]);
    false
}

fn prepare(graph: &Graph, outputs: &[Arc<Handle>]) -> (ChainGraph, DepGraph, SharedStore) {
    debug!("Number of Tasks Specified: {}", graph.len());

    let (inbound, outbound, arity) = build_dep_graph(graph);
    let requested: HashSet<_> = outputs.iter().cloned().collect();
    let collapsed = collapse_graph(inbound, &arity, &requested);

    debug!("Number of Chains to Run: {}", collapsed.len());

    let counts = read_counts(&collapsed, graph, outputs);
    let store = Arc::new(Mutex::new(DataStore::new(counts)));
    (collapsed, outbound, store)
}

fn collect_outputs(store: &Mutex<DataStore>, outputs: &[Arc<Handle>]) -> Option<Vec<Arc<Payload>>> {
    let mut ds = lock(store);
    outputs.iter().map(|h| ds.get(h)).collect()
}

/// Runs the graph one dependency level at a time, each level in parallel on the rayon
/// global pool.  No chain of level i+1 starts before all of level i have finished.
#[derive(Debug, Clone)]
pub struct LeveledScheduler {
    attempts: usize
}

impl LeveledScheduler {
    /// Creates a LeveledScheduler retrying failed chains `DEFAULT_ATTEMPTS` times
    pub fn new() -> Self {
        LeveledScheduler { attempts: DEFAULT_ATTEMPTS }
    }

    /// Sets the number of attempts per chain
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

impl Default for LeveledScheduler {
    fn default() -> Self {
        LeveledScheduler::new()
    }
}

impl Scheduler for LeveledScheduler {

    fn compute(&self, graph: Arc<Graph>, outputs: &[Arc<Handle>]) -> Option<Vec<Arc<Payload>>> {
        let (collapsed, _outbound, store) = prepare(&graph, outputs);

        for (i, level) in generate_levels(&collapsed).into_iter().enumerate() {
            trace!("Running level: {}", i);
            level.par_iter().for_each(|chain| {
                run_chain(&graph, chain, &store, self.attempts);
            });
        }

        debug!("Finished");
        collect_outputs(&store, outputs)
    }
}

/// Starts chains as soon as their inputs are available on a dedicated pool of worker
/// threads.  Chains with more inputs are started first to release memory early.
#[derive(Debug, Clone)]
pub struct GreedyScheduler {
    threads: usize,
    attempts: usize
}

impl GreedyScheduler {
    /// Creates a GreedyScheduler with `threads` workers
    pub fn new(threads: usize) -> Self {
        GreedyScheduler { threads: threads.max(1), attempts: DEFAULT_ATTEMPTS }
    }

    /// Sets the number of attempts per chain
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

impl Scheduler for GreedyScheduler {

    fn compute(&self, graph: Arc<Graph>, outputs: &[Arc<Handle>]) -> Option<Vec<Arc<Payload>>> {
        let (collapsed, mut outbound, store) = prepare(&graph, outputs);

        let pool = match rayon::ThreadPoolBuilder::new().num_threads(self.threads).build() {
            Ok(pool) => pool,
            Err(e) => {
                error!("Unable to start worker pool: {}", e);
                return None;
            }
        };

        let mut queue = PriorityQueue::new();
        let mut waiting: HashMap<Arc<Handle>, (Chain, usize, HashSet<Arc<Handle>>)> = HashMap::new();
        for (chain, deps) in collapsed.into_iter() {
            if deps.is_empty() {
                queue.push(chain, 0usize);
            } else {
                waiting.insert(chain[0].clone(), (chain, deps.len(), deps));
            }
        }

        if log_enabled!(Trace) {
            trace!("Output: {:?}", outputs);
            for (head, (chain, _, deps)) in waiting.iter() {
                trace!("Head: {:?}, Chain: {:?}, Deps: {:?}", head, chain, deps);
            }
        }

        let (tx, rx) = mpsc::channel();
        let mut in_flight = 0usize;
        loop {
            while in_flight < self.threads {
                let Some((chain, _priority)) = queue.pop() else { break };
                trace!("Starting chain: {:?}", chain);
                let g = graph.clone();
                let s = store.clone();
                let done = tx.clone();
                let attempts = self.attempts;
                pool.spawn(move || {
                    run_chain(&g, &chain, &s, attempts);
                    let _ = done.send(chain[chain.len() - 1].clone());
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let finished = match rx.recv() {
                Ok(handle) => handle,
                Err(_) => break
            };
            in_flight -= 1;
            trace!("{:?} finished", finished);

            for consumer in outbound.remove(&finished).into_iter().flatten() {
                let ready = match waiting.get_mut(&consumer) {
                    Some((_, _, deps)) => {
                        deps.remove(&finished);
                        deps.is_empty()
                    },
                    None => false
                };
                if ready {
                    if let Some((chain, priority, _)) = waiting.remove(&consumer) {
                        trace!("Queueing chain: {:?}", chain);
                        queue.push(chain, priority);
                    }
                }
            }
        }

        if !waiting.is_empty() {
            warn!("{} chains never became ready", waiting.len());
        }

        debug!("Finished");
        collect_outputs(&store, outputs)
    }
}
