//! Criterion benchmarks for the EKF recursion and the concurrent harness.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use multicam_ekf_tracker_rs::{
    generate_scene, BatchHarness, CameraModel, Ekf, EkfConfig, HarnessConfig, SceneConfig,
    Timestep,
};
use nalgebra::Vector2;

fn bench_fuse_sequence(c: &mut Criterion) {
    let scene = generate_scene(&SceneConfig {
        num_markers: 1,
        num_frames: 100,
        num_cameras: 4,
        seed: Some(42),
        ..SceneConfig::default()
    });
    let jobs: Vec<(Vector2<f64>, CameraModel, Timestep)> = scene
        .observations
        .iter()
        .map(|obs| (obs.measurement, scene.cameras[obs.camera], obs.timestep))
        .collect();

    c.bench_function("fuse_sequence/100_frames_4_cameras", |b| {
        b.iter_batched(
            || (Ekf::new(EkfConfig::default()), jobs.clone()),
            |(mut ekf, jobs)| {
                ekf.fuse_sequence(jobs).unwrap();
                ekf
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_harness_run(c: &mut Criterion) {
    let scene = generate_scene(&SceneConfig {
        num_markers: 4,
        num_frames: 50,
        num_cameras: 4,
        seed: Some(42),
        ..SceneConfig::default()
    });
    let harness = BatchHarness::new(HarnessConfig {
        num_markers: 4,
        ..HarnessConfig::default()
    });

    c.bench_function("harness/4_markers_50_frames_4_cameras", |b| {
        b.iter(|| harness.run(&scene.cameras, &scene.observations).unwrap())
    });
}

criterion_group!(benches, bench_fuse_sequence, bench_harness_run);
criterion_main!(benches);
