// src/defaults.rs

// Graph layout constants
pub const SPLIT_NODE_SIZE: usize = 64;
pub const BP_IN_CHUNK: usize = 32; // bases per u64 word at 2 bits each
pub const CHUNKS_IN_NODE: usize = SPLIT_NODE_SIZE / BP_IN_CHUNK;

// Scoring constants
pub const MATCH_SCORE: i64 = 1;
pub const MISMATCH_PENALTY: i64 = 4;
pub const GAP_OPEN_PENALTY: i64 = 1;
pub const GAP_EXTEND_PENALTY: i64 = 1;
