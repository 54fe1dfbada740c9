//! Min-priority queue of collapse candidates with lazy deletion
//!
//! Entries are never searched for and removed when the mesh changes. Instead
//! an entry is checked against the mesh when it reaches the front and thrown
//! away if its edge was removed, invalidated, or re-costed since it was pushed.

use crate::half_edge::{HalfEdgeId, HalfEdgeMesh};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Queue key ordered so the max-heap pops the cheapest edge first, ties
/// broken by the lower handle.
#[derive(Debug, Clone, Copy)]
struct Priority {
    cost: f64,
    edge: HalfEdgeId,
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

#[derive(Debug, Default)]
pub struct CollapseQueue {
    heap: PriorityQueue<HalfEdgeId, Priority>,
    invalidated: HashSet<HalfEdgeId>,
}

impl CollapseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the given `(edge, cost)` candidates.
    pub fn seed_all(&mut self, candidates: impl IntoIterator<Item = (HalfEdgeId, f64)>) {
        self.heap.clear();
        self.invalidated.clear();
        for (edge, cost) in candidates {
            self.heap.push(edge, Priority { cost, edge });
        }
    }

    /// Queue `edge` at `cost`, superseding any earlier entry for it.
    pub fn reinsert(&mut self, edge: HalfEdgeId, cost: f64) {
        self.invalidated.remove(&edge);
        self.heap.push(edge, Priority { cost, edge });
    }

    /// Mark the queued entry for `edge`, if any, as obsolete.
    pub fn invalidate(&mut self, edge: HalfEdgeId) {
        if self.heap.get(&edge).is_some() {
            self.invalidated.insert(edge);
        }
    }

    /// Cheapest still-current candidate, discarding obsolete entries on the way.
    pub fn peek_min(&mut self, mesh: &HalfEdgeMesh) -> Option<(HalfEdgeId, f64)> {
        loop {
            let (edge, cost) = match self.heap.peek() {
                Some((&edge, priority)) => (edge, priority.cost),
                None => return None,
            };
            if self.is_current(mesh, edge, cost) {
                return Some((edge, cost));
            }
            self.heap.pop();
            self.invalidated.remove(&edge);
        }
    }

    /// Like [`CollapseQueue::peek_min`] but takes the entry out.
    pub fn pop_min(&mut self, mesh: &HalfEdgeMesh) -> Option<(HalfEdgeId, f64)> {
        let found = self.peek_min(mesh)?;
        self.heap.pop();
        Some(found)
    }

    fn is_current(&self, mesh: &HalfEdgeMesh, edge: HalfEdgeId, cost: f64) -> bool {
        if self.invalidated.contains(&edge) {
            return false;
        }
        match mesh.half_edge(edge) {
            Ok(he) => mesh.canonical_edge(edge) == edge && he.cost().to_bits() == cost.to_bits(),
            Err(_) => false,
        }
    }

    /// Number of entries, including ones not yet found obsolete
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
