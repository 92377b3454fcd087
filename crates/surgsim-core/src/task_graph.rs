//! Directed acyclic graph of named work nodes.
//!
//! The graph is a pure scheduling structure: nodes carry a name and an
//! optional payload that the owning system maps back to work when a step
//! executes. Every graph has a unique source and sink; `nest_graph` splices
//! a whole inner graph between two nodes of the outer one, which is how the
//! PBD and SPH pipelines are composed with host-provided anchors.
//!
//! Execution is topological. Nodes with no dependency between them may run
//! concurrently at the scheduler's discretion; the provided executor walks
//! the topological order sequentially and leaves parallelism to the
//! parallel-for loops inside each node body.

use crate::error::ConfigError;

/// Handle to a node inside one [`TaskGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A named work unit. The payload is whatever the owning system needs to
/// dispatch the node (typically an enum of its pipeline stages); source and
/// sink anchors carry none.
pub struct TaskNode<T> {
    pub name: String,
    pub payload: Option<T>,
}

/// Directed acyclic graph with unique source and sink nodes.
pub struct TaskGraph<T> {
    nodes: Vec<TaskNode<T>>,
    /// Adjacency list: `edges[a]` holds every b with an edge a -> b.
    edges: Vec<Vec<usize>>,
    source: NodeId,
    sink: NodeId,
}

impl<T> TaskGraph<T> {
    pub fn new(source_name: &str, sink_name: &str) -> Self {
        let nodes = vec![
            TaskNode {
                name: source_name.to_owned(),
                payload: None,
            },
            TaskNode {
                name: sink_name.to_owned(),
                payload: None,
            },
        ];
        Self {
            nodes,
            edges: vec![Vec::new(), Vec::new()],
            source: NodeId(0),
            sink: NodeId(1),
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &TaskNode<T> {
        &self.nodes[id.0]
    }

    /// Find a node by name (first match).
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Add a work node with a payload.
    pub fn add_node(&mut self, name: &str, payload: T) -> NodeId {
        self.nodes.push(TaskNode {
            name: name.to_owned(),
            payload: Some(payload),
        });
        self.edges.push(Vec::new());
        NodeId(self.nodes.len() - 1)
    }

    /// Add the happens-before edge `a -> b`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if !self.edges[a.0].contains(&b.0) {
            self.edges[a.0].push(b.0);
        }
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.edges[a.0].contains(&b.0)
    }

    /// Splice `inner` into this graph so that `before` precedes the inner
    /// source and the inner sink precedes `after`.
    ///
    /// Returns the ids the inner nodes received in this graph, indexed by
    /// their old position (source first, sink second, then work nodes in
    /// insertion order).
    pub fn nest_graph(&mut self, inner: TaskGraph<T>, before: NodeId, after: NodeId) -> Vec<NodeId> {
        let offset = self.nodes.len();
        let mapping: Vec<NodeId> = (0..inner.nodes.len()).map(|i| NodeId(offset + i)).collect();

        for node in inner.nodes {
            self.nodes.push(node);
            self.edges.push(Vec::new());
        }
        for (a, targets) in inner.edges.into_iter().enumerate() {
            for b in targets {
                self.add_edge(mapping[a], mapping[b]);
            }
        }

        self.add_edge(before, mapping[inner.source.0]);
        self.add_edge(mapping[inner.sink.0], after);
        mapping
    }

    /// Kahn topological order over the whole graph.
    ///
    /// Fails with [`ConfigError::CycleInTaskGraph`] naming one node of the
    /// cycle if the edge set is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, ConfigError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        for targets in &self.edges {
            for &b in targets {
                in_degree[b] += 1;
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(a) = ready.pop() {
            order.push(NodeId(a));
            for &b in &self.edges[a] {
                in_degree[b] -= 1;
                if in_degree[b] == 0 {
                    ready.push(b);
                }
            }
        }

        if order.len() != n {
            let stuck = (0..n)
                .find(|&i| in_degree[i] > 0)
                .map(|i| self.nodes[i].name.clone())
                .unwrap_or_default();
            return Err(ConfigError::CycleInTaskGraph(stuck));
        }
        Ok(order)
    }

    /// Run one step: walk the topological order and hand each work node's
    /// payload to the dispatcher. Source/sink anchors (payload `None`) are
    /// skipped.
    pub fn execute<F>(&self, mut dispatch: F) -> Result<(), ConfigError>
    where
        F: FnMut(&str, &T),
    {
        for id in self.topological_order()? {
            let node = &self.nodes[id.0];
            if let Some(payload) = &node.payload {
                dispatch(&node.name, payload);
            }
        }
        Ok(())
    }
}
