use criterion::{black_box, criterion_group, criterion_main, Criterion};
use machi::geometry::Vector;
use machi::streamline::{FieldIntegrator, StreamlineGenerator, StreamlineParams};
use machi::tensor::{NoiseParams, TensorField};
use machi::voronoi::{generate_points, Voronoi};

fn build_field(seed: u32) -> TensorField {
    let mut field = TensorField::new(NoiseParams::default(), false, seed);
    field.add_grid(Vector::new(0.0, 0.0), 800.0, 1.0, 0.3);
    field.add_grid(Vector::new(1000.0, 1000.0), 800.0, 1.0, 1.2);
    field.add_radial(Vector::new(500.0, 500.0), 300.0, 1.0);
    field
}

fn tier_params(dsep: f64, dtest: f64) -> StreamlineParams {
    StreamlineParams {
        dsep,
        dtest,
        dstep: 1.0,
        d_circle_join: 5.0,
        d_lookahead: dsep,
        road_join_angle: 0.1,
        path_integration_limit: 1500,
        max_seed_tries: 150,
        early_collision_probability: 0.0,
        simplification_tolerance: 0.5,
        culdesac_probability: 0.0,
        culdesac_radius_min: 4.0,
        culdesac_radius_max: 9.0,
    }
}

fn bench_streamlines(c: &mut Criterion) {
    let mut group = c.benchmark_group("Streamline Generation");
    group.sample_size(10);

    for &dsep in &[200.0, 50.0] {
        group.bench_function(format!("create_all_dsep_{}", dsep as i64), |b| {
            let field = build_field(7);
            b.iter(|| {
                machi::rng::reseed(7);
                let mut generator = StreamlineGenerator::new(
                    &field,
                    FieldIntegrator::Rk4,
                    Vector::new(0.0, 0.0),
                    Vector::new(1000.0, 1000.0),
                    tier_params(dsep, dsep / 2.0),
                );
                generator.create_all_streamlines(200);
                black_box(generator.all_streamlines.len());
            });
        });
    }

    group.finish();
}

fn bench_voronoi(c: &mut Criterion) {
    let mut group = c.benchmark_group("Half-Plane Voronoi");
    group.sample_size(10);

    for &n in &[50, 150] {
        group.bench_function(format!("construct_{}", n), |b| {
            machi::rng::reseed(11);
            let sites = generate_points(
                Vector::new(0.0, 0.0),
                Vector::new(1000.0, 1000.0),
                n,
                1000.0 / (n as f64).sqrt() / 2.0,
            );
            b.iter(|| {
                black_box(Voronoi::new(&sites).ok());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_streamlines, bench_voronoi);
criterion_main!(benches);
