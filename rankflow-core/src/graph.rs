use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::task::{Operator, Payload};

static NEXT_HANDLE_ID: AtomicUsize = AtomicUsize::new(0);

/// Source of data for the graph, such as a lifted value or a file chunk
pub trait Input: Send + Sync {
    fn read(&self) -> Payload;
}

/// Unique identifier of a task within any Graph.  Ids are process-wide so that graphs
/// built from a common ancestor can be merged without collisions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    label: String,
    id: usize
}

impl Handle {
    fn new(label: String) -> Self {
        Handle { label, id: NEXT_HANDLE_ID.fetch_add(1, Ordering::SeqCst) }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.id)
    }
}

/// A node in the graph
pub enum Task {

    /// Consumes upstream values to produce a new one
    Function(Box<dyn Operator>),

    /// Produces a value without upstream dependencies
    Input(Box<dyn Input>)
}

/// Upstream handles of a Function task
#[derive(Debug, Clone)]
pub enum Deps {

    /// Single argument
    Single(Arc<Handle>),

    /// Two arguments, left then right
    Join(Arc<Handle>, Arc<Handle>)
}

impl Deps {
    /// Iterates over the upstream handles in argument order
    pub fn handles(&self) -> Vec<&Arc<Handle>> {
        match self {
            Deps::Single(h) => vec![h],
            Deps::Join(l, r) => vec![l, r]
        }
    }
}

/// Tasks and the dependencies between them.  Graphs are persistent: adding a task
/// to a clone never affects the original.
#[derive(Clone, Default)]
pub struct Graph {

    /// Handle to task body
    pub tasks: HashMap<Arc<Handle>, Arc<Task>>,

    /// Handle to its upstream handles; None for inputs
    pub dependencies: HashMap<Arc<Handle>, Option<Arc<Deps>>>
}

impl Graph {

    /// Creates an empty Graph
    pub fn new() -> Self {
        Graph::default()
    }

    /// Adds a new input into the Graph
    pub fn add_input<I: Input + 'static>(&mut self, input: I, name: &str) -> Arc<Handle> {
        let handle = Arc::new(Handle::new(format!("Input<{}>", name)));
        self.dependencies.insert(handle.clone(), None);
        self.tasks.insert(handle.clone(), Arc::new(Task::Input(Box::new(input))));
        handle
    }

    /// Adds a task reading from `deps`.  The caller is responsible for the upstream
    /// handles being present in the graph.
    pub fn add_task<O: Operator + 'static>(&mut self, deps: Deps, op: O, name: &str) -> Arc<Handle> {
        let handle = Arc::new(Handle::new(format!("Task<{}>", name)));
        self.dependencies.insert(handle.clone(), Some(Arc::new(deps)));
        self.tasks.insert(handle.clone(), Arc::new(Task::Function(Box::new(op))));
        handle
    }

    /// Union of both graphs' tasks.  Shared handles are kept once.
    pub fn merge(&self, other: &Graph) -> Graph {
        let (mut big, small) = if self.len() >= other.len() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        big.absorb(small);
        big
    }

    /// Adds every task of `other` missing from this graph
    pub fn absorb(&mut self, other: &Graph) {
        for (handle, deps) in other.dependencies.iter() {
            self.dependencies.entry(handle.clone()).or_insert_with(|| deps.clone());
        }

        for (handle, task) in other.tasks.iter() {
            self.tasks.entry(handle.clone()).or_insert_with(|| task.clone());
        }
    }

    /// Number of tasks, inputs included
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod graph_test {
    use super::*;
    use crate::task::Unary;

    struct Const(usize);

    impl Input for Const {
        fn read(&self) -> Payload {
            Box::new(self.0)
        }
    }

    #[test]
    fn test_merge_keeps_shared_handles_once() {
        let mut base = Graph::new();
        let input = base.add_input(Const(1), "one");

        let mut left = base.clone();
        left.add_task(Deps::Single(input.clone()), Unary::new(|x: &usize| x + 1), "inc");
        let mut right = base.clone();
        right.add_task(Deps::Single(input.clone()), Unary::new(|x: &usize| x * 2), "double");

        let merged = left.merge(&right);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.dependencies.len(), 3);
        assert!(merged.dependencies[&input].is_none());
    }
}
