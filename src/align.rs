// src/align.rs
//
// Alignment facade: resolves seed hits into matrix positions, builds the
// band, runs the DP slices, and projects the backtrace into a path of
// original node ids.

use crate::align_opt::AlignOpt;
use crate::band::Band;
use crate::dp::{DpResult, MatrixPosition, SliceEngine};
use crate::graph::{AlignmentGraph, DUMMY_NODE_ID};
use crate::topology::Topology;

/// A seed: query offset paired with the original node the seed indexer hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHit {
    pub seq_pos: usize,
    pub node_id: i64,
}

impl SeedHit {
    pub fn new(seq_pos: usize, node_id: i64) -> Self {
        SeedHit { seq_pos, node_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node_id: i64,
    pub is_reverse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub rank: usize,
    pub position: Position,
}

/// One finished alignment: the query name, the best last-row score and the
/// graph path it backtraces through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub name: String,
    pub score: i64,
    pub path: Vec<Mapping>,
}

/// Reusable graph-sized buffers so repeated alignments against one graph
/// skip their largest allocations. One scratch per thread.
#[derive(Default)]
pub struct AlignScratch {
    band: Band,
    forward: Vec<u32>,
    backward: Vec<u32>,
}

impl AlignScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct GraphAligner<'a> {
    graph: &'a AlignmentGraph,
    topology: Topology,
    opt: AlignOpt,
}

impl<'a> GraphAligner<'a> {
    pub fn new(graph: &'a AlignmentGraph) -> Self {
        Self::with_options(graph, AlignOpt::default())
    }

    pub fn with_options(graph: &'a AlignmentGraph, opt: AlignOpt) -> Self {
        assert!(graph.finalized(), "aligner needs a finalized graph");
        let topology = Topology::analyze(graph);
        GraphAligner {
            graph,
            topology,
            opt,
        }
    }

    pub fn graph(&self) -> &AlignmentGraph {
        self.graph
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Aligns one query against the graph, restricted to `band_width` around
    /// the seed hits. Each seed pair contributes whichever of its two hits
    /// anchors the longer exact match (the first hit wins ties).
    pub fn align_one_way(
        &self,
        seq_id: &str,
        sequence: &str,
        reverse: bool,
        band_width: usize,
        seed_hits: &[(SeedHit, SeedHit)],
    ) -> Alignment {
        let mut scratch = AlignScratch::new();
        self.align_one_way_with_scratch(seq_id, sequence, reverse, band_width, seed_hits, &mut scratch)
    }

    pub fn align_one_way_with_scratch(
        &self,
        seq_id: &str,
        sequence: &str,
        reverse: bool,
        band_width: usize,
        seed_hits: &[(SeedHit, SeedHit)],
        scratch: &mut AlignScratch,
    ) -> Alignment {
        assert!(band_width >= 1, "band width must be at least 1");
        let sequence: Vec<u8> = sequence.bytes().map(|b| b.to_ascii_uppercase()).collect();
        let seeds = self.seed_hit_positions(&sequence, seed_hits);
        scratch.band.rebuild(
            self.graph,
            &seeds,
            band_width,
            sequence.len(),
            &mut scratch.forward,
            &mut scratch.backward,
        );
        let engine = SliceEngine {
            graph: self.graph,
            topology: &self.topology,
            opt: &self.opt,
        };
        let result = engine.run(&sequence, &scratch.band, band_width);
        let (score, trace) = self.backtrace(&result, sequence.len());
        log::debug!("{seq_id}: score {score}, trace length {}", trace.len());
        self.trace_to_alignment(seq_id, score, &trace, reverse)
    }

    /// Resolves seed pairs to matrix positions via a longest-exact-match
    /// scan inside each hinted node. An empty seed list falls back to the
    /// dummy cell so the band still grows out of the source node.
    fn seed_hit_positions(
        &self,
        sequence: &[u8],
        seed_hits: &[(SeedHit, SeedHit)],
    ) -> Vec<MatrixPosition> {
        if seed_hits.is_empty() || sequence.is_empty() {
            return vec![(0, 0)];
        }
        let mut result = Vec::with_capacity(seed_hits.len());
        for &(first, second) in seed_hits {
            assert!(
                self.graph.has_node(first.node_id),
                "seed references unknown node id {}",
                first.node_id
            );
            assert!(
                self.graph.has_node(second.node_id),
                "seed references unknown node id {}",
                second.node_id
            );
            let forward = self.longest_exact_match(sequence, first.seq_pos, first.node_id);
            let backward = self.longest_exact_match(sequence, second.seq_pos, second.node_id);
            if forward.1 >= backward.1 {
                result.push(forward.0);
            } else {
                result.push(backward.0);
            }
        }
        result
    }

    // Best (position, length) of an exact match of the query suffix at
    // seq_pos against any offset of the original node. A node without any
    // matching base anchors at its first position with length zero.
    fn longest_exact_match(
        &self,
        sequence: &[u8],
        seq_pos: usize,
        node_id: i64,
    ) -> (MatrixPosition, usize) {
        assert!(
            seq_pos < sequence.len(),
            "seed position {seq_pos} outside the query"
        );
        let graph = self.graph;
        let chunks = graph.chunks_of(node_id);
        let begin = graph.node_start(chunks[0]);
        let end = graph.node_end(*chunks.last().unwrap());
        let mut best_pos = (begin, seq_pos);
        let mut best_len = 0;
        for start in begin..end {
            let max_len = (end - start).min(sequence.len() - seq_pos);
            let mut len = 0;
            while len < max_len && sequence[seq_pos + len] == graph.position_base(start + len) {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_pos = (start, seq_pos);
            }
        }
        (best_pos, best_len)
    }

    // Picks the best in-band cell of the last row and walks the recorded
    // predecessors back to the dummy. Every recorded entry precedes its cell
    // in (row, position) order, so the walk terminates.
    fn backtrace(&self, result: &DpResult, n: usize) -> (i64, Vec<MatrixPosition>) {
        let last = &result.last;
        let mut current: MatrixPosition = (0, n);
        let mut found = false;
        for pos in 0..self.graph.position_count() {
            if !last.inside_band[pos] {
                continue;
            }
            if !found || last.m[pos] > last.m[current.0] {
                current = (pos, n);
                found = true;
            }
        }
        debug_assert!(last.inside_band[current.0]);
        let score = last.m[current.0];
        let mut trace = vec![current];
        while current.1 > 0 {
            let previous = result.backtrace[current.0][current.1];
            debug_assert!(
                previous.1 < current.1 || (previous.1 == current.1 && previous.0 < current.0),
                "backtrace stalled at ({}, {})",
                current.0,
                current.1
            );
            if current.0 == 0 {
                debug_assert_eq!(previous.0, 0, "dummy backtrace must stay on the dummy");
            }
            current = previous;
            trace.push(current);
        }
        trace.reverse();
        (score, trace)
    }

    // Collapses runs of one original id into single path steps. Row-0
    // entries are boundary cells that consume no query base and are skipped;
    // a dummy entry ends the path.
    fn trace_to_alignment(
        &self,
        seq_id: &str,
        score: i64,
        trace: &[MatrixPosition],
        reverse: bool,
    ) -> Alignment {
        let graph = self.graph;
        let mut path = Vec::new();
        let mut last_id = None;
        for &(pos, row) in trace {
            if row == 0 {
                continue;
            }
            let id = graph.node_id(graph.node_at(pos));
            if id == DUMMY_NODE_ID {
                if path.is_empty() {
                    continue;
                }
                break;
            }
            if last_id == Some(id) {
                continue;
            }
            path.push(Mapping {
                rank: path.len(),
                position: Position {
                    node_id: id,
                    is_reverse: reverse,
                },
            });
            last_id = Some(id);
        }
        Alignment {
            name: seq_id.to_string(),
            score,
            path,
        }
    }
}
