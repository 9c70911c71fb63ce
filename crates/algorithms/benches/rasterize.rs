//! Benchmarks for surface fitting and rasterization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gpsraster_algorithms::interpolation::{SurfaceField, SurfaceParams};
use gpsraster_algorithms::rasterize::rasterize;
use gpsraster_algorithms::{build_raster, RasterParams};
use gpsraster_core::{BitDepth, Extent, GeoPoint, ProjectedPoint};

/// Pseudo-random walk of survey points over roughly 1 km
fn create_survey(n: usize) -> Vec<GeoPoint> {
    (0..n)
        .map(|i| {
            let a = ((i * 7919 + 13) % 1000) as f64 / 1000.0;
            let b = ((i * 104_729 + 37) % 1000) as f64 / 1000.0;
            let elevation = 200.0 + 30.0 * (a * 6.0).sin() + 20.0 * (b * 4.0).cos();
            GeoPoint::new(46.5 + a * 0.009, 7.9 + b * 0.013, elevation)
        })
        .collect()
}

fn projected(n: usize) -> Vec<ProjectedPoint> {
    (0..n)
        .map(|i| {
            let x = ((i * 7919 + 13) % 1000) as f64;
            let y = ((i * 104_729 + 37) % 1000) as f64;
            ProjectedPoint::new(x, y, (x * 0.01).sin() * 20.0 + y * 0.05)
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface/fit");
    for n in [50, 200, 800] {
        let points = projected(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| SurfaceField::fit(black_box(&points), &SurfaceParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    let points = projected(200);
    let surface = SurfaceField::fit(&points, &SurfaceParams::default()).unwrap();
    let extent = Extent::new(-50.0, -50.0, 1050.0, 1050.0);
    for dim in [128, 256, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, &dim| {
            b.iter(|| rasterize(black_box(&surface), &extent, dim, BitDepth::Sixteen).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let points = create_survey(100);
    let params = RasterParams {
        max_dimension: 256,
        ..Default::default()
    };
    c.bench_function("pipeline/build_raster_256", |b| {
        b.iter(|| build_raster(black_box(&points), &params).unwrap())
    });
}

criterion_group!(benches, bench_fit, bench_rasterize, bench_pipeline);
criterion_main!(benches);
