use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maxflow::graph::{Dinic, DinicConfig, Graph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn layered_network(layers: usize, width: usize, seed: u64) -> (Graph<f64>, usize, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = layers * width + 2;
    let (source, target) = (n - 2, n - 1);
    let mut graph = Graph::new_directed(n);

    for i in 0..width {
        graph.add_edge(source, i, rng.gen_range(1.0..100.0)).unwrap();
        graph
            .add_edge((layers - 1) * width + i, target, rng.gen_range(1.0..100.0))
            .unwrap();
    }
    for layer in 0..layers - 1 {
        for i in 0..width {
            for _ in 0..3 {
                let j = rng.gen_range(0..width);
                graph
                    .add_edge(
                        layer * width + i,
                        (layer + 1) * width + j,
                        rng.gen_range(1.0..100.0),
                    )
                    .unwrap();
            }
        }
    }
    (graph, source, target)
}

fn bench_dinic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dinic");

    for &(layers, width) in &[(10, 10), (50, 50), (100, 200)] {
        let (graph, source, target) = layered_network(layers, width, 42);
        let label = format!("{}x{}", layers, width);

        group.bench_with_input(BenchmarkId::new("parallel_build", &label), &graph, |b, g| {
            b.iter(|| {
                let mut dinic = Dinic::new(g, source, target).unwrap();
                dinic.run();
                black_box(dinic.max_flow().unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("sequential_build", &label), &graph, |b, g| {
            b.iter(|| {
                let config = DinicConfig {
                    parallel_build: false,
                    ..DinicConfig::default()
                };
                let mut dinic = Dinic::with_config(g, source, target, config).unwrap();
                dinic.run();
                black_box(dinic.max_flow().unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dinic);
criterion_main!(benches);
