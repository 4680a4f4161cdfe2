pub mod align; // Facade: seeds -> band -> slice DP -> backtrace -> path
pub mod align_opt;
pub mod band;
pub mod defaults;
pub mod dp; // Banded M/Q/R affine-gap recurrence over the split-node graph
pub mod graph;
pub mod topology; // Back-edge classification + all-pairs distances

pub use align::{AlignScratch, Alignment, GraphAligner, Mapping, Position, SeedHit};
pub use align_opt::AlignOpt;
pub use graph::AlignmentGraph;
pub use topology::Topology;
