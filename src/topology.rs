// src/topology.rs
//
// One-time analysis of a finalized graph: back-edge classification, the
// all-pairs distance matrix, and the column visit order used by the DP.
// Shared read-only between alignments.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::AlignmentGraph;

pub struct Topology {
    not_in_order: Vec<bool>,
    has_wrong_orders: bool,
    ordering: Vec<usize>,
    // Dense node-to-node distances, row-major. distance[u][v] is the number
    // of bases a path crosses from the start of u to the start of v,
    // exclusive of v's own bases. Unreachable pairs hold `unreachable`.
    distance: Vec<usize>,
    node_count: usize,
    unreachable: usize,
}

impl Topology {
    pub fn analyze(graph: &AlignmentGraph) -> Self {
        assert!(graph.finalized(), "topology analysis needs a finalized graph");
        let n = graph.node_count();

        // A split node is not-in-order when some in-edge arrives from an
        // equal or later index; those nodes need the full R definition.
        let mut not_in_order = vec![false; n];
        for v in 0..n {
            for &u in graph.in_neighbors(v) {
                if u >= v {
                    not_in_order[v] = true;
                }
            }
        }
        let has_wrong_orders = not_in_order.iter().any(|&b| b);

        // DP columns visit not-in-order node starts first, then everything
        // else, both in ascending position order. The dummy column 0 is a
        // boundary and never visited.
        let mut ordering = Vec::with_capacity(graph.position_count() - 1);
        let mut in_order_tail = Vec::new();
        for w in 1..graph.position_count() {
            let v = graph.node_at(w);
            if w == graph.node_start(v) && not_in_order[v] {
                ordering.push(w);
            } else {
                in_order_tail.push(w);
            }
        }
        ordering.extend_from_slice(&in_order_tail);
        debug_assert_eq!(ordering.len(), graph.position_count() - 1);

        let unreachable = graph.position_count() + 1;
        let distance = distance_matrix(graph, unreachable);
        log::debug!(
            "topology: {} not-in-order nodes",
            not_in_order.iter().filter(|&&b| b).count()
        );

        Topology {
            not_in_order,
            has_wrong_orders,
            ordering,
            distance,
            node_count: n,
            unreachable,
        }
    }

    #[inline]
    pub fn not_in_order(&self, node: usize) -> bool {
        self.not_in_order[node]
    }

    #[inline]
    pub fn has_wrong_orders(&self) -> bool {
        self.has_wrong_orders
    }

    #[inline]
    pub fn ordering(&self) -> &[usize] {
        &self.ordering
    }

    #[inline]
    pub fn unreachable_distance(&self) -> usize {
        self.unreachable
    }

    /// Node-level distance: bases crossed from the start of `from` to the
    /// start of `to`, exclusive of `to`.
    #[inline]
    pub fn node_distance(&self, from: usize, to: usize) -> usize {
        self.distance[from * self.node_count + to]
    }

    /// Position-level distance between two flattened positions, derived from
    /// the node-level matrix by offset adjustment. The forward same-node
    /// case is exact; everything else routes through node starts.
    pub fn distance_from_seq_to_seq(
        &self,
        graph: &AlignmentGraph,
        start: usize,
        end: usize,
    ) -> usize {
        let start_node = graph.node_at(start);
        let end_node = graph.node_at(end);
        if start_node == end_node && end >= start {
            return end - start;
        }
        let offset_from_start = start - graph.node_start(start_node);
        let offset_into_end = end - graph.node_start(end_node);
        self.node_distance(start_node, end_node) + offset_into_end - offset_from_start
    }
}

// One Dijkstra per source node; edge weight is the source node's length, so
// accumulated distances count bases crossed up to the target's start. Edges
// are taken from the in-neighbor lists, which also carry the dummy edges.
fn distance_matrix(graph: &AlignmentGraph, unreachable: usize) -> Vec<usize> {
    let n = graph.node_count();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for v in 0..n {
        for &u in graph.in_neighbors(v) {
            adjacency[u].push(v);
        }
    }

    let mut distance = vec![unreachable; n * n];
    for source in 0..n {
        let row = &mut distance[source * n..(source + 1) * n];
        let mut frontier: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
        row[source] = 0;
        frontier.push(Reverse((0, source)));
        while let Some(Reverse((dist, u))) = frontier.pop() {
            if dist > row[u] {
                continue;
            }
            let next = dist + graph.node_length(u);
            for &v in &adjacency[u] {
                if next < row[v] {
                    row[v] = next;
                    frontier.push(Reverse((next, v)));
                }
            }
        }
    }

    // The diagonal must mean "distance from a later base back to an earlier
    // base of the same node", so replace the trivial zero with the shortest
    // round trip through some other node.
    for v in 0..n {
        let mut round_trip = unreachable;
        for u in 0..n {
            if u == v {
                continue;
            }
            let out = distance[v * n + u];
            let back = distance[u * n + v];
            round_trip = round_trip.min(out.saturating_add(back));
        }
        distance[v * n + v] = round_trip;
    }
    distance
}

#[cfg(test)]
#[path = "topology_test.rs"]
mod topology_test;
