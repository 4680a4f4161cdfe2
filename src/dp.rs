// src/dp.rs
//
// Banded affine-gap dynamic programming over the split-node graph. Three
// matrices are kept in lock step: M (best score ending in a match or
// mismatch), Q (ending in a gap that consumes a query base in place) and R
// (ending in a gap that consumes a graph base). Rows follow the query;
// columns are flattened graph positions. The engine evaluates horizontal
// slices of rows and hands the final row of one slice to the next.

use crate::align_opt::AlignOpt;
use crate::band::Band;
use crate::graph::AlignmentGraph;
use crate::topology::Topology;

/// (graph position, query row).
pub type MatrixPosition = (usize, usize);

/// Uninitialized-cell floor. Cells that never receive a candidate keep it
/// and cannot win any argmax; the margin keeps subtractions from wrapping.
pub const SCORE_FLOOR: i64 = i64::MIN + 99;

/// DP state of one evaluated row, handed between slices by move.
pub struct MatrixSlice {
    pub m: Vec<i64>,
    pub q: Vec<i64>,
    pub r: Vec<i64>,
    pub q_backtrace: Vec<MatrixPosition>,
    pub r_backtrace: Vec<MatrixPosition>,
    /// Position-major backtrace block: `backtrace[pos][row_in_slice]`.
    pub backtrace: Vec<Vec<MatrixPosition>>,
    pub inside_band: Vec<bool>,
}

pub struct DpResult {
    pub last: MatrixSlice,
    /// Full backtrace, position-major: `backtrace[pos][row]` for rows 0..=n.
    pub backtrace: Vec<Vec<MatrixPosition>>,
}

pub struct SliceEngine<'a> {
    pub graph: &'a AlignmentGraph,
    pub topology: &'a Topology,
    pub opt: &'a AlignOpt,
}

impl<'a> SliceEngine<'a> {
    /// Evaluates all rows of the query and returns the last row's state plus
    /// the accumulated backtrace matrix.
    pub fn run(&self, sequence: &[u8], band: &Band, band_width: usize) -> DpResult {
        let positions = self.graph.position_count();
        let n = sequence.len();
        let mut last = self.first_slice(band_width);
        let mut backtrace: Vec<Vec<MatrixPosition>> = (0..positions)
            .map(|pos| vec![last.backtrace[pos][0]])
            .collect();

        let slice_rows = self.opt.slice_rows.unwrap_or(n.max(1));
        assert!(slice_rows >= 1, "slice_rows must be at least 1");
        let mut start = 1;
        while start < n + 1 {
            let end = (start + slice_rows).min(n + 1);
            let slice = self.score_slice(sequence, last, start - 1, end, band);
            for pos in 0..positions {
                backtrace[pos].extend_from_slice(&slice.backtrace[pos][1..]);
            }
            last = slice;
            start = end;
        }
        debug_assert!(backtrace.iter().all(|column| column.len() == n + 1));
        DpResult { last, backtrace }
    }

    /// Row-0 state: every position scores zero so an alignment may begin
    /// anywhere the band admits.
    fn first_slice(&self, band_width: usize) -> MatrixSlice {
        let positions = self.graph.position_count();
        let mut slice = MatrixSlice {
            m: vec![0; positions],
            q: vec![0; positions],
            r: vec![0; positions],
            q_backtrace: (0..positions).map(|pos| (pos, 0)).collect(),
            r_backtrace: (0..positions).map(|pos| (pos, 0)).collect(),
            backtrace: (0..positions).map(|pos| vec![(pos, 0)]).collect(),
            inside_band: vec![false; positions],
        };
        slice.r[0] = self.r_boundary();
        slice.inside_band[0] = true;
        for pos in 1..positions {
            if self
                .topology
                .distance_from_seq_to_seq(self.graph, 0, pos)
                < band_width
            {
                slice.inside_band[pos] = true;
            }
        }
        slice
    }

    // R can never be extended out of the dummy column.
    #[inline]
    fn r_boundary(&self) -> i64 {
        i64::MIN + self.opt.gap_extend + 100
    }

    /// Evaluates absolute rows `start + 1 ..= end - 1`, consuming the
    /// previous slice's final row.
    fn score_slice(
        &self,
        sequence: &[u8],
        previous: MatrixSlice,
        start: usize,
        end: usize,
        band: &Band,
    ) -> MatrixSlice {
        let graph = self.graph;
        let opt = self.opt;
        let positions = graph.position_count();

        let mut current_m = vec![0i64; positions];
        let mut previous_m = previous.m;
        let mut current_q = vec![0i64; positions];
        let mut previous_q = previous.q;
        let mut current_r = vec![0i64; positions];
        let mut previous_r = previous.r;
        let mut q_backtrace = previous.q_backtrace;
        let mut current_r_backtrace = vec![(0usize, 0usize); positions];
        let mut previous_r_backtrace = previous.r_backtrace;
        let mut backtrace: Vec<Vec<MatrixPosition>> = (0..positions)
            .map(|pos| {
                let mut column = vec![(0usize, 0usize); end - start];
                column[0] = *previous.backtrace[pos].last().unwrap();
                column
            })
            .collect();
        let mut current_inside = vec![false; positions];
        let mut previous_inside = vec![false; positions];
        let mut current_columns: Vec<usize> = Vec::with_capacity(positions);
        let mut previous_columns: Vec<usize> = Vec::with_capacity(positions);
        for &pos in self.topology.ordering() {
            if band.inside(pos, start) {
                previous_columns.push(pos);
            }
        }
        previous_m[0] = -opt.gap_penalty(start);
        previous_r[0] = self.r_boundary();

        for j in 1..(end - start) {
            let row = start + j;
            for pos in 0..positions {
                current_inside[pos] = band.inside(pos, row);
                previous_inside[pos] = band.inside(pos, row - 1);
            }
            current_columns.clear();
            for &pos in self.topology.ordering() {
                if current_inside[pos] {
                    current_columns.push(pos);
                }
            }
            log::trace!("row {}: {} columns inside band", row, current_columns.len());
            current_m[0] = -opt.gap_penalty(row);
            current_r[0] = self.r_boundary();
            let r_helper = if self.topology.has_wrong_orders() {
                self.r_helper(row, &previous_m, sequence, &previous_inside, &previous_columns)
            } else {
                Vec::new()
            };

            for &w in &current_columns {
                debug_assert!(current_inside[w]);
                let node = graph.node_at(w);
                let neighbor_inside = self.has_in_neighbor_inside(w, &current_inside);

                current_q[w] = previous_q[w] - opt.gap_extend;
                if previous_m[w] - opt.gap_penalty(1) > current_q[w] {
                    current_q[w] = previous_m[w] - opt.gap_penalty(1);
                    q_backtrace[w] = (w, row - 1);
                }

                let full_r_here =
                    w == graph.node_start(node) && self.topology.not_in_order(node);
                if full_r_here {
                    let (score, origin) = self.full_r(w, row, &r_helper);
                    current_r[w] = score;
                    current_r_backtrace[w] = origin;
                } else if neighbor_inside {
                    let (score, origin) = self.recurrence_r(
                        w,
                        row,
                        &current_m,
                        &current_r,
                        &current_r_backtrace,
                        &current_inside,
                    );
                    current_r[w] = score;
                    current_r_backtrace[w] = origin;
                }

                // Candidates in fixed order Q, R, match; a later candidate
                // must be strictly greater to replace an earlier one.
                let mut best = SCORE_FLOOR;
                let mut origin: Option<MatrixPosition> = None;
                if previous_inside[w] {
                    best = current_q[w];
                    origin = Some(q_backtrace[w]);
                }
                // R participates only when it was computed this row.
                if (full_r_here || neighbor_inside) && current_r[w] > best {
                    best = current_r[w];
                    origin = Some(current_r_backtrace[w]);
                }
                if w == graph.node_start(node) {
                    for &u_node in graph.in_neighbors(node) {
                        let u = graph.node_end(u_node) - 1;
                        if !previous_inside[u] {
                            continue;
                        }
                        // Rows are one-based: row j consumes sequence[j-1].
                        let candidate = previous_m[u]
                            + opt.base_score(graph.position_base(w), sequence[row - 1]);
                        if candidate > best {
                            best = candidate;
                            origin = Some((u, row - 1));
                        }
                    }
                } else {
                    let u = w - 1;
                    if previous_inside[u] {
                        let candidate = previous_m[u]
                            + opt.base_score(graph.position_base(w), sequence[row - 1]);
                        if candidate > best {
                            best = candidate;
                            origin = Some((u, row - 1));
                        }
                    }
                }

                // A cell with no live predecessor keeps the floor score and
                // points at the dummy so a backtrace through it terminates.
                let origin = origin.unwrap_or((0, row - 1));
                debug_assert!(
                    origin.1 < row || (origin.1 == row && origin.0 < w),
                    "backtrace entry ({}, {}) does not precede ({w}, {row})",
                    origin.0,
                    origin.1
                );
                backtrace[w][j] = origin;
                current_m[w] = best;

                // Band boundaries invalidate carried gap state: without a
                // previous-row cell Q restarts from M, and without a
                // computed R this row R restarts from M.
                if !previous_inside[w] {
                    current_q[w] = current_m[w];
                    q_backtrace[w] = (w, row);
                }
                if !full_r_here && !neighbor_inside {
                    current_r[w] = current_m[w];
                    current_r_backtrace[w] = (w, row);
                }
                debug_assert!(current_m[w] <= i64::MAX - 100);
            }

            std::mem::swap(&mut current_m, &mut previous_m);
            std::mem::swap(&mut current_q, &mut previous_q);
            std::mem::swap(&mut current_r, &mut previous_r);
            std::mem::swap(&mut current_r_backtrace, &mut previous_r_backtrace);
            std::mem::swap(&mut current_inside, &mut previous_inside);
            std::mem::swap(&mut current_columns, &mut previous_columns);
        }

        // The final swap moved the last evaluated row into "previous".
        MatrixSlice {
            m: previous_m,
            q: previous_q,
            r: previous_r,
            q_backtrace,
            r_backtrace: previous_r_backtrace,
            backtrace,
            inside_band: previous_inside,
        }
    }

    fn has_in_neighbor_inside(&self, w: usize, current_inside: &[bool]) -> bool {
        let graph = self.graph;
        let node = graph.node_at(w);
        if w == graph.node_start(node) {
            graph
                .in_neighbors(node)
                .iter()
                .any(|&u| current_inside[graph.node_end(u) - 1])
        } else {
            current_inside[w - 1]
        }
    }

    // R by the running recurrence: open a graph gap from M or extend one
    // from R, reading same-row predecessors that the column order has
    // already finalized.
    fn recurrence_r(
        &self,
        w: usize,
        row: usize,
        current_m: &[i64],
        current_r: &[i64],
        current_r_backtrace: &[MatrixPosition],
        current_inside: &[bool],
    ) -> (i64, MatrixPosition) {
        let graph = self.graph;
        let opt = self.opt;
        let node = graph.node_at(w);
        debug_assert!(!(w == graph.node_start(node) && self.topology.not_in_order(node)));
        let mut best = SCORE_FLOOR;
        let mut origin = (0, row);
        if w == graph.node_start(node) {
            for &u_node in graph.in_neighbors(node) {
                let u = graph.node_end(u_node) - 1;
                if !current_inside[u] {
                    continue;
                }
                debug_assert!(u < w);
                if current_m[u] - opt.gap_penalty(1) > best {
                    best = current_m[u] - opt.gap_penalty(1);
                    origin = (u, row);
                }
                if current_r[u] - opt.gap_extend > best {
                    best = current_r[u] - opt.gap_extend;
                    origin = current_r_backtrace[u];
                }
            }
        } else {
            let u = w - 1;
            if current_inside[u] {
                origin = current_r_backtrace[u];
                best = current_r[u] - opt.gap_extend;
                if current_m[u] - opt.gap_penalty(1) > best {
                    origin = (u, row);
                    best = current_m[u] - opt.gap_penalty(1);
                }
            }
        }
        (best, origin)
    }

    // R by the full definition: the best normalized candidate of any node in
    // the previous row, discounted by the graph distance to `w`. This is
    // what makes back-edges and cycles score correctly.
    fn full_r(
        &self,
        w: usize,
        row: usize,
        r_helper: &[(usize, i64)],
    ) -> (i64, MatrixPosition) {
        debug_assert!(row > 0 && w > 0);
        let mut best = SCORE_FLOOR;
        let mut origin = (0, row - 1);
        for &(candidate, score) in r_helper {
            if candidate == w {
                continue;
            }
            let distance = self
                .topology
                .distance_from_seq_to_seq(self.graph, candidate, w);
            let here = score - self.opt.gap_penalty(distance);
            if here > best {
                best = here;
                origin = (candidate, row - 1);
            }
        }
        (best, origin)
    }

    // Per-node best candidate for the full R definition, taken over the
    // previous row's in-band columns. Candidates at different in-node
    // offsets are compared after discounting the gap cost still owed to the
    // node end. Rows 0 and 1 sit on the all-zero boundary row.
    fn r_helper(
        &self,
        row: usize,
        previous_m: &[i64],
        sequence: &[u8],
        previous_inside: &[bool],
        previous_columns: &[usize],
    ) -> Vec<(usize, i64)> {
        let graph = self.graph;
        let opt = self.opt;
        if row <= 1 {
            return (0..graph.position_count()).map(|pos| (pos, 0)).collect();
        }
        let mut best_per_node: Vec<(usize, i64, i64)> =
            vec![(0, SCORE_FLOOR, 0); graph.node_count()];
        for &v in previous_columns {
            let node = graph.node_at(v);
            let node_end = graph.node_end(node);
            let normalization = (node_end - v) as i64 * opt.gap_extend;
            let consider = |u: usize, best: &mut (usize, i64, i64)| {
                if !previous_inside[u] {
                    return;
                }
                let score_here =
                    previous_m[u] + opt.base_score(graph.position_base(v), sequence[row - 1]);
                if score_here - normalization > best.1 - best.2 {
                    *best = (v, score_here, normalization);
                }
            };
            if v == graph.node_start(node) {
                for &u_node in graph.in_neighbors(node) {
                    consider(graph.node_end(u_node) - 1, &mut best_per_node[node]);
                }
            } else {
                consider(v - 1, &mut best_per_node[node]);
            }
        }
        best_per_node
            .into_iter()
            .filter(|&(_, score, _)| score > i64::MIN + 100)
            .map(|(pos, score, _)| (pos, score))
            .collect()
    }
}
