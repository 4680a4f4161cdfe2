// src/graph.rs
//
// Split-node sequence graph store. Original nodes are split into chunks of
// at most SPLIT_NODE_SIZE bases; each chunk ("split node") carries a 2-bit
// packed copy of its sequence. The store is mutable until finalize() and
// immutable (and freely sharable across threads) afterwards.

use std::collections::HashMap;

use crate::defaults::{BP_IN_CHUNK, CHUNKS_IN_NODE, SPLIT_NODE_SIZE};

/// Fixed-width packed sequence of one split node: 2 bits per base,
/// A=0, C=1, G=2, T=3, BP_IN_CHUNK bases per word.
pub type NodeChunkSequence = [u64; CHUNKS_IN_NODE];

/// Original id of the dummy source node at split index 0. Caller node ids
/// must be >= 2 and follow the strand-pair convention: forward node `2k`,
/// reverse-complement partner `2k + 1`.
pub const DUMMY_NODE_ID: i64 = 0;

pub struct AlignmentGraph {
    node_length: Vec<usize>,
    node_offset: Vec<usize>,
    node_ids: Vec<i64>,
    node_sequences: Vec<NodeChunkSequence>,
    reverse: Vec<bool>,
    in_neighbors: Vec<Vec<usize>>,
    out_neighbors: Vec<Vec<usize>>,
    node_lookup: HashMap<i64, Vec<usize>>,
    // Flattened base-position space: split node v covers positions
    // node_start[v] .. node_start[v] + node_length[v]. Position 0 is the
    // dummy source node.
    node_start: Vec<usize>,
    index_to_node: Vec<usize>,
    finalized: bool,
}

impl AlignmentGraph {
    pub fn new() -> Self {
        let mut graph = AlignmentGraph {
            node_length: Vec::new(),
            node_offset: Vec::new(),
            node_ids: Vec::new(),
            node_sequences: Vec::new(),
            reverse: Vec::new(),
            in_neighbors: Vec::new(),
            out_neighbors: Vec::new(),
            node_lookup: HashMap::new(),
            node_start: Vec::new(),
            index_to_node: Vec::new(),
            finalized: false,
        };
        // The dummy source node occupies split index 0 / position 0. Its
        // single base is never scored; backtraces terminate on it.
        graph.node_lookup.insert(DUMMY_NODE_ID, vec![0]);
        graph.node_length.push(1);
        graph.node_offset.push(0);
        graph.node_ids.push(DUMMY_NODE_ID);
        graph.node_sequences.push([0u64; CHUNKS_IN_NODE]);
        graph.reverse.push(false);
        graph.in_neighbors.push(Vec::new());
        graph.out_neighbors.push(Vec::new());
        graph.node_start.push(0);
        graph.index_to_node.push(0);
        graph
    }

    /// Capacity hint: expected original node and split node counts.
    pub fn reserve(&mut self, num_nodes: usize, num_split_nodes: usize) {
        self.node_lookup.reserve(num_nodes);
        self.node_length.reserve(num_split_nodes);
        self.node_offset.reserve(num_split_nodes);
        self.node_ids.reserve(num_split_nodes);
        self.node_sequences.reserve(num_split_nodes);
        self.reverse.reserve(num_split_nodes);
        self.in_neighbors.reserve(num_split_nodes);
        self.out_neighbors.reserve(num_split_nodes);
        self.node_start.reserve(num_split_nodes);
    }

    /// Adds one original node, splitting it into SPLIT_NODE_SIZE chunks and
    /// wiring the internal chain edges between successive chunks. Re-adding
    /// an id already present is a no-op: subgraph extraction may hand the
    /// same node to several builders.
    pub fn add_node(&mut self, node_id: i64, sequence: &str, reverse_node: bool) {
        assert!(!self.finalized, "add_node called on a finalized graph");
        assert!(
            node_id >= 2,
            "node id {node_id} is reserved; caller ids start at 2"
        );
        assert!(!sequence.is_empty(), "node {node_id} has an empty sequence");
        if self.node_lookup.contains_key(&node_id) {
            return;
        }
        let bytes = sequence.as_bytes();
        let mut chunk_start = 0;
        while chunk_start < bytes.len() {
            let chunk_end = (chunk_start + SPLIT_NODE_SIZE).min(bytes.len());
            self.add_split_node(node_id, chunk_start, &bytes[chunk_start..chunk_end], reverse_node);
            if chunk_start > 0 {
                let last = self.node_length.len() - 1;
                debug_assert_eq!(self.node_ids[last - 1], self.node_ids[last]);
                debug_assert_eq!(
                    self.node_offset[last - 1] + SPLIT_NODE_SIZE,
                    self.node_offset[last]
                );
                self.out_neighbors[last - 1].push(last);
                self.in_neighbors[last].push(last - 1);
            }
            chunk_start = chunk_end;
        }
    }

    fn add_split_node(&mut self, node_id: i64, offset: usize, sequence: &[u8], reverse_node: bool) {
        debug_assert!(sequence.len() <= SPLIT_NODE_SIZE);
        let index = self.node_length.len();
        self.node_lookup.entry(node_id).or_default().push(index);
        self.node_start.push(self.index_to_node.len());
        let mut packed = [0u64; CHUNKS_IN_NODE];
        for (i, &base) in sequence.iter().enumerate() {
            let code: u64 = match base {
                b'a' | b'A' => 0,
                b'c' | b'C' => 1,
                b'g' | b'G' => 2,
                b't' | b'T' => 3,
                _ => panic!(
                    "non-ACGT base {:?} in node {} at offset {}",
                    base as char,
                    node_id,
                    offset + i
                ),
            };
            packed[i / BP_IN_CHUNK] |= code << (2 * (i % BP_IN_CHUNK));
            self.index_to_node.push(index);
        }
        self.node_length.push(sequence.len());
        self.node_offset.push(offset);
        self.node_ids.push(node_id);
        self.node_sequences.push(packed);
        self.reverse.push(reverse_node);
        self.in_neighbors.push(Vec::new());
        self.out_neighbors.push(Vec::new());
        debug_assert_eq!(self.node_ids.len(), self.node_length.len());
        debug_assert_eq!(self.node_length.len(), self.in_neighbors.len());
        debug_assert_eq!(self.in_neighbors.len(), self.out_neighbors.len());
        debug_assert_eq!(self.node_start.len(), self.node_length.len());
    }

    /// Connects the last chunk of `from` to the first chunk of `to`.
    /// Duplicate edges are silently suppressed.
    pub fn add_edge(&mut self, node_id_from: i64, node_id_to: i64) {
        assert!(!self.finalized, "add_edge called on a finalized graph");
        let from = *self
            .node_lookup
            .get(&node_id_from)
            .unwrap_or_else(|| panic!("edge references unknown node id {node_id_from}"))
            .last()
            .unwrap();
        let to = self
            .node_lookup
            .get(&node_id_to)
            .unwrap_or_else(|| panic!("edge references unknown node id {node_id_to}"))[0];
        if !self.in_neighbors[to].contains(&from) {
            self.in_neighbors[to].push(from);
        }
        if !self.out_neighbors[from].contains(&to) {
            self.out_neighbors[from].push(to);
        }
    }

    /// Seals the graph: every split node still without an in-edge gains one
    /// from the dummy source, adjacency storage is shrunk, and diagnostic
    /// counts are logged. All mutators refuse to run afterwards.
    pub fn finalize(&mut self) {
        assert!(!self.finalized, "finalize called twice");
        for v in 1..self.node_length.len() {
            if self.in_neighbors[v].is_empty() {
                self.in_neighbors[v].push(0);
            }
        }
        self.finalized = true;
        let mut high_in_degree = 0usize;
        let mut edges = 0usize;
        for v in 0..self.in_neighbors.len() {
            self.in_neighbors[v].shrink_to_fit();
            self.out_neighbors[v].shrink_to_fit();
            if self.in_neighbors[v].len() >= 2 {
                high_in_degree += 1;
            }
            edges += self.in_neighbors[v].len();
        }
        log::info!("{} original nodes", self.node_lookup.len() - 1);
        log::info!("{} split nodes", self.node_length.len() - 1);
        log::info!("{edges} edges");
        log::info!("{high_in_degree} nodes with in-degree >= 2");
        self.node_length.shrink_to_fit();
        self.node_offset.shrink_to_fit();
        self.node_ids.shrink_to_fit();
        self.node_sequences.shrink_to_fit();
        self.reverse.shrink_to_fit();
        self.in_neighbors.shrink_to_fit();
        self.out_neighbors.shrink_to_fit();
        self.node_start.shrink_to_fit();
        self.index_to_node.shrink_to_fit();
    }

    pub fn finalized(&self) -> bool {
        self.finalized
    }

    /// Number of split nodes, dummy included.
    pub fn node_count(&self) -> usize {
        self.node_length.len()
    }

    /// Size of the flattened base-position space, dummy included.
    pub fn position_count(&self) -> usize {
        self.index_to_node.len()
    }

    /// Total graph bases, dummy excluded.
    pub fn size_in_bp(&self) -> usize {
        self.index_to_node.len() - 1
    }

    #[inline]
    pub fn node_length(&self, node: usize) -> usize {
        self.node_length[node]
    }

    #[inline]
    pub fn node_offset(&self, node: usize) -> usize {
        self.node_offset[node]
    }

    #[inline]
    pub fn node_id(&self, node: usize) -> i64 {
        self.node_ids[node]
    }

    #[inline]
    pub fn is_reverse(&self, node: usize) -> bool {
        self.reverse[node]
    }

    #[inline]
    pub fn node_start(&self, node: usize) -> usize {
        self.node_start[node]
    }

    #[inline]
    pub fn node_end(&self, node: usize) -> usize {
        self.node_start[node] + self.node_length[node]
    }

    /// Split node covering flattened position `pos`.
    #[inline]
    pub fn node_at(&self, pos: usize) -> usize {
        self.index_to_node[pos]
    }

    #[inline]
    pub fn in_neighbors(&self, node: usize) -> &[usize] {
        &self.in_neighbors[node]
    }

    #[inline]
    pub fn out_neighbors(&self, node: usize) -> &[usize] {
        &self.out_neighbors[node]
    }

    pub fn has_node(&self, node_id: i64) -> bool {
        self.node_lookup.contains_key(&node_id)
    }

    /// Split node indices of one original node, ordered by offset.
    pub fn chunks_of(&self, node_id: i64) -> &[usize] {
        self.node_lookup
            .get(&node_id)
            .unwrap_or_else(|| panic!("unknown node id {node_id}"))
    }

    /// Decoded base at `pos` within split node `node`.
    #[inline]
    pub fn node_base(&self, node: usize, pos: usize) -> u8 {
        debug_assert!(pos < self.node_length[node]);
        let chunk = pos / BP_IN_CHUNK;
        let shift = 2 * (pos % BP_IN_CHUNK);
        b"ACGT"[((self.node_sequences[node][chunk] >> shift) & 3) as usize]
    }

    /// Decoded base at a flattened position. The dummy position decodes to
    /// 'N' so it can never match a query base.
    #[inline]
    pub fn position_base(&self, pos: usize) -> u8 {
        let node = self.index_to_node[pos];
        if node == 0 {
            return b'N';
        }
        self.node_base(node, pos - self.node_start[node])
    }

    /// Split node of the reverse-complement partner covering the mirrored
    /// offset of `node`. Involutive: `reverse_node(reverse_node(v)) == v`.
    pub fn reverse_node(&self, node: usize) -> usize {
        let id = self.node_ids[node];
        let chunks = &self.node_lookup[&id];
        let original_size =
            (chunks.len() - 1) * SPLIT_NODE_SIZE + self.node_length[*chunks.last().unwrap()];
        let current_offset = self.node_offset[node];
        debug_assert!(current_offset < original_size);
        let reverse_offset = original_size - current_offset - 1;
        let partner_id = (id / 2) * 2 + (1 - id % 2);
        let partner_chunks = self
            .node_lookup
            .get(&partner_id)
            .unwrap_or_else(|| panic!("node {id} has no reverse-complement partner {partner_id}"));
        partner_chunks[reverse_offset / SPLIT_NODE_SIZE]
    }
}

impl Default for AlignmentGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[path = "graph_test.rs"]
#[cfg(test)]
mod graph_test;
