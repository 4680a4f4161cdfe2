// benches/align_bench.rs
// Criterion benchmarks for band construction plus the slice DP.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use graph_align::{AlignScratch, AlignmentGraph, GraphAligner, SeedHit};

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

fn random_sequence(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

// A chain of 32-base nodes with a two-way branch between every pair, so the
// band regularly crosses node boundaries and junctions.
fn branching_graph(rng: &mut StdRng, segments: usize) -> (AlignmentGraph, String) {
    let mut graph = AlignmentGraph::new();
    let mut spelled = String::new();
    let mut previous_id = None;
    let mut next_id = 2;
    for _ in 0..segments {
        let backbone = random_sequence(rng, 32);
        let alt = random_sequence(rng, 32);
        let backbone_id = next_id;
        let alt_id = next_id + 2;
        next_id += 4;
        graph.add_node(backbone_id, &backbone, false);
        graph.add_node(alt_id, &alt, false);
        if let Some(previous) = previous_id {
            graph.add_edge(previous, backbone_id);
            graph.add_edge(previous, alt_id);
        }
        spelled.push_str(&backbone);
        previous_id = Some(backbone_id);
    }
    graph.finalize();
    (graph, spelled)
}

// Reads follow the backbone path with a sprinkle of substitutions.
fn mutate(rng: &mut StdRng, sequence: &str) -> String {
    sequence
        .chars()
        .map(|c| {
            if rng.gen_range(0..100) < 2 {
                BASES[rng.gen_range(0..4)]
            } else {
                c
            }
        })
        .collect()
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_one_way");
    for segments in [4usize, 16, 64] {
        let mut rng = StdRng::seed_from_u64(0x5EED5EED);
        let (graph, spelled) = branching_graph(&mut rng, segments);
        let query = mutate(&mut rng, &spelled);
        let aligner = GraphAligner::new(&graph);
        let mut scratch = AlignScratch::new();
        let seeds = [(SeedHit::new(0, 2), SeedHit::new(0, 2))];

        group.throughput(Throughput::Bytes(query.len() as u64));
        group.bench_function(format!("segments{segments}_len{}", query.len()), |b| {
            b.iter(|| {
                let alignment = aligner.align_one_way_with_scratch(
                    "bench",
                    black_box(&query),
                    false,
                    8,
                    &seeds,
                    &mut scratch,
                );
                black_box(alignment.score)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_align);
criterion_main!(benches);
