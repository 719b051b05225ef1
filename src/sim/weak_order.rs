//! Weak ordering of a possibly cyclic dependency graph.
//!
//! Node `a` dominates node `b` when `b` is reachable from `a` but `a` is not
//! reachable from `b`. Nodes on a common cycle dominate each other in
//! neither direction and end up in the same equivalence class. The sort is
//! stable: nodes that are not ordered by dominance keep their insertion order.

use std::collections::BTreeSet;

use tracing::trace;

/// One vertex of a [`WoGraph`].
#[derive(Debug, Clone, Default)]
pub struct WoNode {
    successors: Vec<usize>,
    descendants: BTreeSet<usize>,
    dominated: BTreeSet<usize>,
}

impl WoNode {
    /// Direct successors, in link order, without duplicates.
    pub fn successors(&self) -> &[usize] {
        &self.successors
    }

    /// Every node reachable from this one, excluding itself.
    pub fn descendants(&self) -> &BTreeSet<usize> {
        &self.descendants
    }

    /// Whether `other` is reachable from this node.
    pub fn precedes(&self, other: usize) -> bool {
        self.descendants.contains(&other)
    }

    /// Whether `other` is reachable from this node but not vice versa.
    pub fn dominates(&self, other: usize) -> bool {
        self.dominated.contains(&other)
    }
}

/// A directed graph over nodes `0..n` that can be weakly ordered.
///
/// An edge `from -> to` reads "`from` must come before `to`".
///
/// # Examples
///
/// ```
/// use sgt_sim::sim::weak_order::WoGraph;
///
/// let mut g = WoGraph::new(3);
/// g.link(2, 0);
/// g.link(0, 1);
/// g.weak_order();
/// assert_eq!(g.order(), &[2, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct WoGraph {
    nodes: Vec<WoNode>,
    order: Vec<usize>,
    ranks: Vec<usize>,
}

impl WoGraph {
    /// Creates a graph with `n` unlinked nodes in insertion order.
    pub fn new(n: usize) -> Self {
        Self {
            nodes: vec![WoNode::default(); n],
            order: (0..n).collect(),
            ranks: (0..n).collect(),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for a graph with no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds the edge `from -> to`. Self loops and repeated edges are ignored.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn link(&mut self, from: usize, to: usize) {
        assert!(from < self.nodes.len(), "node {from} out of range");
        assert!(to < self.nodes.len(), "node {to} out of range");
        if from == to {
            trace!(node = from, "ignoring self loop");
            return;
        }
        let successors = &mut self.nodes[from].successors;
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    /// Computes reachability and dominance, then sorts the nodes.
    ///
    /// Safe to call again after further [`link`](WoGraph::link)s.
    pub fn weak_order(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            let reached = self.reach(i);
            self.nodes[i].descendants = reached;
        }
        for i in 0..n {
            let dominated = self.nodes[i]
                .descendants
                .iter()
                .copied()
                .filter(|&j| !self.nodes[j].descendants.contains(&i))
                .collect();
            self.nodes[i].dominated = dominated;
        }

        // A later node that dominates order[i] rotates into position i.
        let mut order: Vec<usize> = (0..n).collect();
        for i in 0..n {
            for j in (i + 1)..n {
                if self.nodes[order[j]].dominates(order[i]) {
                    order[i..=j].rotate_right(1);
                }
            }
        }

        for (rank, &node) in order.iter().enumerate() {
            self.ranks[node] = rank;
        }
        self.order = order;

        for &node in &self.order {
            trace!(
                node,
                rank = self.ranks[node],
                descendants = ?self.nodes[node].descendants,
                "weak order"
            );
        }
    }

    /// Node indices from first to last. Insertion order until
    /// [`weak_order`](WoGraph::weak_order) runs.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Position of `node` in [`order`](WoGraph::order).
    pub fn rank_of(&self, node: usize) -> Option<usize> {
        self.ranks.get(node).copied()
    }

    /// The node with insertion index `index`.
    pub fn node(&self, index: usize) -> Option<&WoNode> {
        self.nodes.get(index)
    }

    /// Whether `a` dominates `b`. Meaningful after `weak_order`.
    pub fn dominates(&self, a: usize, b: usize) -> bool {
        self.nodes.get(a).is_some_and(|node| node.dominates(b))
    }

    /// Whether `b` is reachable from `a`. Meaningful after `weak_order`.
    pub fn precedes(&self, a: usize, b: usize) -> bool {
        self.nodes.get(a).is_some_and(|node| node.precedes(b))
    }

    fn reach(&self, root: usize) -> BTreeSet<usize> {
        let mut seen = vec![false; self.nodes.len()];
        seen[root] = true;
        let mut stack = vec![root];
        let mut reached = BTreeSet::new();
        while let Some(node) = stack.pop() {
            for &next in &self.nodes[node].successors {
                if !seen[next] {
                    seen[next] = true;
                    reached.insert(next);
                    stack.push(next);
                }
            }
        }
        reached
    }
}
