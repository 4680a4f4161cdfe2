// src/align_opt.rs
//
// Alignment options shared by one aligner instance.

use crate::defaults;

/// Scoring and slicing options for the banded graph aligner.
#[derive(Debug, Clone)]
pub struct AlignOpt {
    // Scoring parameters
    pub match_score: i64,       // Score for a matching base
    pub mismatch_penalty: i64,  // Penalty for a mismatching base (stored positive)
    pub gap_open: i64,          // Cost of the first base of a gap
    pub gap_extend: i64,        // Cost of each further gap base

    /// Query rows evaluated per matrix slice. `None` evaluates the whole
    /// query in one slice; `Some(k)` hands the last row of each k-row slice
    /// to the next one. Both settings produce identical alignments.
    pub slice_rows: Option<usize>,
}

impl Default for AlignOpt {
    fn default() -> Self {
        AlignOpt {
            match_score: defaults::MATCH_SCORE,
            mismatch_penalty: defaults::MISMATCH_PENALTY,
            gap_open: defaults::GAP_OPEN_PENALTY,
            gap_extend: defaults::GAP_EXTEND_PENALTY,
            slice_rows: None,
        }
    }
}

impl AlignOpt {
    /// Affine cost of a gap of `length` bases.
    #[inline]
    pub fn gap_penalty(&self, length: usize) -> i64 {
        if length == 0 {
            return 0;
        }
        self.gap_open + self.gap_extend * (length as i64 - 1)
    }

    /// Score of aligning one graph base against one query base.
    #[inline]
    pub fn base_score(&self, graph_base: u8, seq_base: u8) -> i64 {
        if graph_base == seq_base {
            self.match_score
        } else {
            -self.mismatch_penalty
        }
    }
}
