//! Traversal orders over the test graph.
//!
//! Two orderings, one per execution mode: leaves-first topological for
//! diagnostic runs (dependencies before dependents, so failures localize)
//! and roots-first BFS for detection runs (high-level tests first, so
//! regressions surface early). Both are total: every test appears exactly
//! once, with ties broken by stable manifest order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use gauntlet_core::types::collections::FxHashSet;
use gauntlet_core::types::ids::TestId;

use super::TestDag;

impl TestDag {
    /// Kahn's algorithm on forward edges: a test is emitted only after all
    /// of its dependencies. Ready candidates are drained in manifest
    /// order.
    pub fn topo_leaves_first(&self) -> Vec<TestId> {
        let n = self.len();
        let mut remaining: Vec<usize> = Vec::with_capacity(n);
        for node in self.nodes() {
            remaining.push(node.depends_on.len());
        }

        // Min-heap over arena indices keeps the tie-break stable.
        let mut ready: BinaryHeap<Reverse<usize>> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &deps)| deps == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            let node = self.node_at(i);
            order.push(node.id.clone());
            for dependent in &node.dependents {
                if let Some(j) = self.position(dependent) {
                    remaining[j] -= 1;
                    if remaining[j] == 0 {
                        ready.push(Reverse(j));
                    }
                }
            }
        }
        order
    }

    /// BFS from the roots (tests no other test depends on) following
    /// dependency edges downward. Disconnected or cyclic-free leftovers
    /// cannot occur in an acyclic graph reachable from roots, but any
    /// unvisited test is appended in stable order so nothing is silently
    /// dropped.
    pub fn bfs_roots_first(&self) -> Vec<TestId> {
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut order = Vec::with_capacity(self.len());

        for (i, node) in self.nodes().enumerate() {
            if node.dependents.is_empty() {
                visited.insert(i);
                queue.push_back(i);
            }
        }

        while let Some(i) = queue.pop_front() {
            let node = self.node_at(i);
            order.push(node.id.clone());
            // Children in stable order, not set order.
            let mut children: Vec<usize> = node
                .depends_on
                .iter()
                .filter_map(|d| self.position(d))
                .collect();
            children.sort_unstable();
            for j in children {
                if visited.insert(j) {
                    queue.push_back(j);
                }
            }
        }

        for (i, node) in self.nodes().enumerate() {
            if !visited.contains(&i) {
                order.push(node.id.clone());
            }
        }
        order
    }
}
