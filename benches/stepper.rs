//! Benchmarks for initialization and the per-frame steppers.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use swirl::{NBodyParams, Simulation, TurbulenceParams};

fn bench_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("init");

    for count in [10_000u32, 100_000] {
        group.bench_with_input(BenchmarkId::new("turbulence", count), &count, |b, &count| {
            b.iter(|| {
                let sim = Simulation::turbulence(TurbulenceParams {
                    count,
                    ..Default::default()
                })
                .unwrap();
                black_box(sim.positions()[0]);
            })
        });
    }

    group.finish();
}

fn bench_turbulence_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("turbulence_step");
    group.sample_size(20);

    for count in [10_000u32, 100_000] {
        let mut sim = Simulation::turbulence(TurbulenceParams {
            count,
            ..Default::default()
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                sim.step(1.0 / 60.0).unwrap();
                black_box(sim.frame());
            })
        });
    }

    group.finish();
}

fn bench_nbody_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("nbody_step");
    group.sample_size(10);

    // The collision pass is O(n^2); keep counts in the realistic regime.
    for count in [500u32, 1000, 2000] {
        let mut sim = Simulation::nbody(NBodyParams {
            count,
            ..Default::default()
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                sim.step(1.0 / 60.0).unwrap();
                black_box(sim.frame());
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_init, bench_turbulence_step, bench_nbody_step);
criterion_main!(benches);
