//! Typed test dependency graph.
//!
//! Arena representation: nodes live in a `Vec` in manifest order and are
//! addressed by index through an id map. Edges are held by id, not by
//! reference, which keeps `remove()` a simple arena rebuild. Cycle
//! detection runs Tarjan's SCC over a petgraph mirror of the arena.

pub mod traversal;

use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};

use gauntlet_core::errors::GraphError;
use gauntlet_core::manifest::Manifest;
use gauntlet_core::types::collections::{FxHashMap, FxHashSet};
use gauntlet_core::types::ids::TestId;

/// One test in the graph.
#[derive(Debug, Clone)]
pub struct TestNode {
    pub id: TestId,
    /// Human description of what the test verifies. Never empty.
    pub assertion: String,
    pub executable: PathBuf,
    /// Forward edges: tests this one depends on.
    pub depends_on: FxHashSet<TestId>,
    /// Reverse edges, computed at build: tests depending on this one.
    pub dependents: FxHashSet<TestId>,
    /// Manifest disabled flag, carried for lifecycle sync.
    pub disabled: bool,
    pub requirement_id: Option<String>,
    pub parameters: FxHashMap<String, String>,
}

/// Immutable test dependency graph.
///
/// Nodes are stored in stable manifest order; all orderings break ties by
/// that order. The graph is acyclic by construction.
#[derive(Debug, Clone, Default)]
pub struct TestDag {
    nodes: Vec<TestNode>,
    index: FxHashMap<TestId, usize>,
}

impl TestDag {
    /// Build the graph from a validated manifest.
    ///
    /// Fails on dependencies naming unknown tests and on cycles; a cycle
    /// error reports the full path (`A → B → A`).
    pub fn build(manifest: &Manifest) -> Result<Self, GraphError> {
        let ordered = manifest.ordered_ids();
        let mut nodes = Vec::with_capacity(ordered.len());
        let mut index = FxHashMap::default();

        for id in &ordered {
            let def = match manifest.test_set_tests.get(id) {
                Some(def) => def,
                // ordered_ids only yields defined tests; defensive skip.
                None => continue,
            };
            index.insert(id.clone(), nodes.len());
            nodes.push(TestNode {
                id: id.clone(),
                assertion: def.assertion.clone(),
                executable: PathBuf::from(&def.executable),
                depends_on: def.depends_on.iter().cloned().collect(),
                dependents: FxHashSet::default(),
                disabled: def.disabled,
                requirement_id: def.requirement_id.clone(),
                parameters: def.parameters.clone(),
            });
        }

        // Unknown dependencies are a configuration error, never silently
        // elided.
        for node in &nodes {
            for dep in &node.depends_on {
                if !index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        id: node.id.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let mut dag = Self { nodes, index };
        dag.rebuild_dependents();
        dag.check_acyclic()?;
        Ok(dag)
    }

    fn rebuild_dependents(&mut self) {
        let edges: Vec<(TestId, TestId)> = self
            .nodes
            .iter()
            .flat_map(|n| n.depends_on.iter().map(move |d| (n.id.clone(), d.clone())))
            .collect();
        for node in &mut self.nodes {
            node.dependents.clear();
        }
        for (from, to) in edges {
            if let Some(&i) = self.index.get(&to) {
                self.nodes[i].dependents.insert(from);
            }
        }
    }

    /// Tarjan's SCC over a petgraph mirror; any SCC with more than one
    /// member (or a self-loop) is a cycle.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        let mut pg: DiGraph<usize, ()> = DiGraph::new();
        let mut pg_index: Vec<NodeIndex> = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            pg_index.push(pg.add_node(i));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.depends_on {
                if let Some(&j) = self.index.get(dep) {
                    pg.add_edge(pg_index[i], pg_index[j], ());
                }
            }
        }

        for scc in petgraph::algo::tarjan_scc(&pg) {
            let is_self_loop =
                scc.len() == 1 && pg.find_edge(scc[0], scc[0]).is_some();
            if scc.len() > 1 || is_self_loop {
                let members: FxHashSet<usize> = scc.iter().map(|n| pg[*n]).collect();
                let path = self.cycle_path(&members);
                return Err(GraphError::Cycle { path });
            }
        }
        Ok(())
    }

    /// Walk forward edges inside the SCC from its first member until the
    /// walk returns to the start, producing `A → B → A`.
    fn cycle_path(&self, members: &FxHashSet<usize>) -> String {
        let start = match members.iter().min() {
            Some(&s) => s,
            None => return String::new(),
        };
        let mut path = vec![start];
        let mut seen = FxHashSet::default();
        seen.insert(start);
        let mut current = start;
        loop {
            // Any in-SCC successor keeps the walk inside the cycle.
            let next = self.nodes[current]
                .depends_on
                .iter()
                .filter_map(|d| self.index.get(d).copied())
                .find(|i| members.contains(i));
            let Some(next) = next else { break };
            path.push(next);
            if next == start || !seen.insert(next) {
                break;
            }
            current = next;
        }
        path.iter()
            .map(|&i| self.nodes[i].id.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Number of tests in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &TestId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &TestId) -> Option<&TestNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// All ids in stable manifest order.
    pub fn ids(&self) -> Vec<TestId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Iterate nodes in stable manifest order.
    pub fn nodes(&self) -> impl Iterator<Item = &TestNode> {
        self.nodes.iter()
    }

    pub(crate) fn node_at(&self, i: usize) -> &TestNode {
        &self.nodes[i]
    }

    pub(crate) fn position(&self, id: &TestId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Transitive dependencies of a test (its ancestors in execution
    /// terms: everything that must hold before it runs).
    pub fn ancestors(&self, id: &TestId) -> FxHashSet<TestId> {
        self.reachable(id, |node| &node.depends_on)
    }

    /// Transitive dependents of a test.
    pub fn descendants(&self, id: &TestId) -> FxHashSet<TestId> {
        self.reachable(id, |node| &node.dependents)
    }

    fn reachable<'a, F>(&'a self, id: &TestId, edges: F) -> FxHashSet<TestId>
    where
        F: Fn(&'a TestNode) -> &'a FxHashSet<TestId>,
    {
        let mut out = FxHashSet::default();
        let mut stack: Vec<&TestId> = match self.node(id) {
            Some(node) => edges(node).iter().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            if out.insert(next.clone()) {
                if let Some(node) = self.node(next) {
                    stack.extend(edges(node).iter());
                }
            }
        }
        out
    }

    /// Dependency closure: the given ids plus everything they transitively
    /// depend on. Ids not present in the graph are ignored.
    pub fn closure(&self, ids: &FxHashSet<TestId>) -> FxHashSet<TestId> {
        let mut out = FxHashSet::default();
        for id in ids {
            if self.contains(id) {
                out.insert(id.clone());
                out.extend(self.ancestors(id));
            }
        }
        out
    }

    /// A new graph with the given tests removed; edges to and from removed
    /// nodes are pruned.
    pub fn remove(&self, ids: &FxHashSet<TestId>) -> Self {
        let mut nodes: Vec<TestNode> = Vec::new();
        let mut index = FxHashMap::default();
        for node in &self.nodes {
            if ids.contains(&node.id) {
                continue;
            }
            let mut kept = node.clone();
            kept.depends_on.retain(|d| !ids.contains(d));
            kept.dependents.clear();
            index.insert(kept.id.clone(), nodes.len());
            nodes.push(kept);
        }
        let mut dag = Self { nodes, index };
        dag.rebuild_dependents();
        dag
    }

    /// A new graph restricted to the given tests (edges pruned likewise).
    pub fn retain(&self, ids: &FxHashSet<TestId>) -> Self {
        let drop: FxHashSet<TestId> = self
            .nodes
            .iter()
            .filter(|n| !ids.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        self.remove(&drop)
    }
}
