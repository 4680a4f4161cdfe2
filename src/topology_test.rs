// Tests for src/topology.rs

use super::*;

fn chain_graph() -> AlignmentGraph {
    let mut graph = AlignmentGraph::new();
    graph.add_node(2, "ACG", false);
    graph.add_node(4, "T", false);
    graph.add_edge(2, 4);
    graph.finalize();
    graph
}

#[test]
fn forward_chain_is_fully_in_order() {
    let graph = chain_graph();
    let topology = Topology::analyze(&graph);

    assert!(!topology.has_wrong_orders());
    for node in 0..graph.node_count() {
        assert!(!topology.not_in_order(node));
    }
    // Plain ascending position order when nothing is out of order.
    assert_eq!(topology.ordering(), &[1, 2, 3, 4]);
}

#[test]
fn node_distances_count_source_bases() {
    let graph = chain_graph();
    let topology = Topology::analyze(&graph);

    // dummy -> node 2 crosses the dummy's single base.
    assert_eq!(topology.node_distance(0, 1), 1);
    assert_eq!(topology.node_distance(1, 2), 3);
    assert_eq!(topology.node_distance(0, 2), 4);
    // No path back along a DAG.
    assert_eq!(
        topology.node_distance(2, 1),
        topology.unreachable_distance()
    );
    assert_eq!(topology.unreachable_distance(), graph.position_count() + 1);
}

#[test]
fn position_distances_adjust_for_offsets() {
    let graph = chain_graph();
    let topology = Topology::analyze(&graph);

    // Forward within one node is exact.
    assert_eq!(topology.distance_from_seq_to_seq(&graph, 1, 3), 2);
    // Across the edge: from the middle of node 2 to node 4's base.
    assert_eq!(topology.distance_from_seq_to_seq(&graph, 2, 4), 2);
}

#[test]
fn back_edges_mark_their_target_not_in_order() {
    let mut graph = AlignmentGraph::new();
    graph.add_node(2, "ACG", false);
    graph.add_node(4, "TA", false);
    graph.add_edge(2, 4);
    graph.add_edge(4, 2);
    graph.finalize();
    let topology = Topology::analyze(&graph);

    assert!(topology.has_wrong_orders());
    assert!(topology.not_in_order(1), "cycle target must be flagged");
    assert!(!topology.not_in_order(2));
    // The flagged node's start position is visited first.
    assert_eq!(topology.ordering()[0], graph.node_start(1));
    assert_eq!(topology.ordering(), &[1, 2, 3, 4, 5]);
}

#[test]
fn cycle_gives_the_diagonal_a_round_trip_distance() {
    let mut graph = AlignmentGraph::new();
    graph.add_node(2, "ACG", false);
    graph.add_node(4, "T", false);
    graph.add_edge(2, 4);
    graph.add_edge(4, 2);
    graph.finalize();
    let topology = Topology::analyze(&graph);

    assert_eq!(topology.node_distance(1, 2), 3);
    assert_eq!(topology.node_distance(2, 1), 1);
    assert_eq!(
        topology.node_distance(1, 1),
        4,
        "diagonal must be the shortest round trip, not zero"
    );
    // Later base to earlier base of the same node goes around the loop.
    assert_eq!(topology.distance_from_seq_to_seq(&graph, 3, 1), 2);
}

#[test]
fn self_loops_are_not_in_order() {
    let mut graph = AlignmentGraph::new();
    graph.add_node(2, "A", false);
    graph.add_edge(2, 2);
    graph.finalize();
    let topology = Topology::analyze(&graph);

    assert!(topology.not_in_order(1));
}
