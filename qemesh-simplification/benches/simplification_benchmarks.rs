//! Benchmarks for edge collapse simplification and its setup phases

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qemesh_core::primitives;
use qemesh_simplification::{
    CostModel, EdgeCollapseSimplifier, HalfEdgeMesh, MergePolicy, MeshSimplifier, SimplifyConfig,
};

fn bench_simplification(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];

    let mut group = c.benchmark_group("simplification");

    for &size in &sizes {
        let mesh = primitives::bumpy_grid(size);
        let vertex_count = mesh.vertex_count();

        for &ratio in &ratios {
            for policy in [MergePolicy::Optimal, MergePolicy::Midpoint] {
                group.bench_with_input(
                    BenchmarkId::new(
                        format!("{policy:?}").to_lowercase(),
                        format!("{}v_r{}", vertex_count, (ratio * 100.0) as u32),
                    ),
                    &(&mesh, ratio),
                    |b, &(mesh, ratio)| {
                        let simplifier = EdgeCollapseSimplifier::with_config(
                            SimplifyConfig::default().with_merge_policy(policy),
                        );
                        b.iter(|| {
                            let result = simplifier.simplify(black_box(mesh), ratio).unwrap();
                            black_box(result);
                        });
                    },
                );
            }
        }
    }

    group.finish();
}

fn bench_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("setup");

    for &(rings, segments) in &[(16, 32), (64, 128)] {
        let sphere = primitives::uv_sphere(rings, segments);
        let label = format!("{}v", sphere.vertex_count());

        group.bench_with_input(BenchmarkId::new("build", &label), &sphere, |b, sphere| {
            b.iter(|| {
                let mesh =
                    HalfEdgeMesh::build(sphere.vertices.clone(), black_box(&sphere.indices))
                        .unwrap();
                black_box(mesh);
            });
        });

        group.bench_with_input(BenchmarkId::new("quadrics", &label), &sphere, |b, sphere| {
            let mesh = HalfEdgeMesh::build(sphere.vertices.clone(), &sphere.indices).unwrap();
            let model = CostModel::default();
            b.iter(|| {
                let mut mesh = mesh.clone();
                model.initialize_vertex_quadrics(&mut mesh).unwrap();
                black_box(mesh);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_simplification, bench_setup);
criterion_main!(benches);
