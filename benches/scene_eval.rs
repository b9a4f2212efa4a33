//! Benchmarks: compilation and CPU evaluation of a scene

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sdf_scene::prelude::*;

fn row_of_spheres(count: usize) -> Scene {
    let mut config = NodeConfig::new("opSmoothUnion").arg("k", 0.2);
    for i in 0..count {
        config = config.child(
            NodeConfig::new("sdSphere").arg("r", 0.5).modifier(
                ModifierConfig::new("opTranslate").arg("t", Vec3::new(i as f32 * 0.8, 0.0, 0.0)),
            ),
        );
    }
    Scene::from_config(&config).expect("valid scene")
}

fn grid_points(n: usize) -> Vec<Vec3> {
    (0..n * n * n)
        .map(|i| {
            let (x, y, z) = (i % n, (i / n) % n, i / (n * n));
            Vec3::new(x as f32, y as f32, z as f32) / n as f32 * 4.0 - 2.0
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for count in [4, 32, 128] {
        let scene = row_of_spheres(count);
        group.bench_with_input(BenchmarkId::new("expression", count), &scene, |b, scene| {
            b.iter(|| SceneShader::compile(black_box(scene), Dialect::Wgsl, true).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("bytecode", count), &scene, |b, scene| {
            b.iter(|| CompiledProgram::compile(black_box(scene), Dialect::Wgsl).unwrap())
        });
    }
    group.finish();
}

fn bench_eval(c: &mut Criterion) {
    let scene = row_of_spheres(16);
    let compiled = CompiledProgram::compile(&scene, Dialect::Wgsl).unwrap();
    let reference = SceneEvaluator::new(&scene).unwrap();
    let points = grid_points(16);

    let mut group = c.benchmark_group("eval_4096_points");
    group.bench_function("reference", |b| b.iter(|| eval_batch(&reference, black_box(&points))));
    group.bench_function("stack_machine", |b| {
        b.iter(|| eval_program_batch(&compiled.program, black_box(&points)).unwrap())
    });
    group.bench_function("stack_machine_parallel", |b| {
        b.iter(|| eval_program_batch_parallel(&compiled.program, black_box(&points)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_compile, bench_eval);
criterion_main!(benches);
