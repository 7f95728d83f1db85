use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nalgebra::Point3;
use printquote::config::ComplexityThresholds;
use printquote::mesh_ops::analyze;
use printquote::parser::{stl, threemf};
use printquote::pricing::estimate_cost;
use printquote::writer::{write_3mf, write_stl_ascii, write_stl_binary};
use printquote::{FileInfo, Material, Mesh, PricingConfig, PrintParameters, Quality, Triangle};
use std::hint::black_box;
use std::io::Cursor;

/// Generate a closed slab whose top is a `n` x `n` height field
///
/// Produces roughly `4 * n * n` triangles.
fn generate_mesh(n: usize) -> Mesh {
    let height = |i: usize, j: usize| 5.0 + ((i * 7 + j * 13) % 11) as f64 * 0.3;
    let top = |i: usize, j: usize| Point3::new(i as f64, j as f64, height(i, j));
    let bottom = |i: usize, j: usize| Point3::new(i as f64, j as f64, 0.0);

    let mut triangles = Vec::with_capacity(4 * n * n + 8 * n);
    for i in 0..n {
        for j in 0..n {
            triangles.push(Triangle::new(top(i, j), top(i + 1, j), top(i + 1, j + 1)));
            triangles.push(Triangle::new(top(i, j), top(i + 1, j + 1), top(i, j + 1)));
            triangles.push(Triangle::new(bottom(i, j), bottom(i + 1, j + 1), bottom(i + 1, j)));
            triangles.push(Triangle::new(bottom(i, j), bottom(i, j + 1), bottom(i + 1, j + 1)));
        }
    }
    for k in 0..n {
        // y = 0 and y = n walls
        triangles.push(Triangle::new(bottom(k, 0), bottom(k + 1, 0), top(k + 1, 0)));
        triangles.push(Triangle::new(bottom(k, 0), top(k + 1, 0), top(k, 0)));
        triangles.push(Triangle::new(bottom(k + 1, n), bottom(k, n), top(k, n)));
        triangles.push(Triangle::new(bottom(k + 1, n), top(k, n), top(k + 1, n)));
        // x = 0 and x = n walls
        triangles.push(Triangle::new(bottom(0, k + 1), bottom(0, k), top(0, k)));
        triangles.push(Triangle::new(bottom(0, k + 1), top(0, k), top(0, k + 1)));
        triangles.push(Triangle::new(bottom(n, k), bottom(n, k + 1), top(n, k + 1)));
        triangles.push(Triangle::new(bottom(n, k), top(n, k + 1), top(n, k)));
    }
    Mesh::from_triangles(triangles).unwrap()
}

fn bench_parse_binary_stl(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_binary_stl");

    for &n in &[16, 64, 256] {
        let mesh = generate_mesh(n);
        let mut bytes = Vec::new();
        write_stl_binary(&mesh, &mut bytes).unwrap();

        group.bench_with_input(
            BenchmarkId::new("triangles", mesh.triangle_count()),
            &bytes,
            |b, bytes| b.iter(|| black_box(stl::parse_stl(bytes).unwrap())),
        );
    }

    group.finish();
}

fn bench_parse_ascii_stl(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_ascii_stl");
    group.sample_size(20);

    for &n in &[16, 64] {
        let mesh = generate_mesh(n);
        let mut bytes = Vec::new();
        write_stl_ascii(&mesh, "slab", &mut bytes).unwrap();

        group.bench_with_input(
            BenchmarkId::new("triangles", mesh.triangle_count()),
            &bytes,
            |b, bytes| b.iter(|| black_box(stl::parse_stl(bytes).unwrap())),
        );
    }

    group.finish();
}

fn bench_parse_3mf(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_3mf");
    group.sample_size(20);

    for &n in &[16, 64] {
        let mesh = generate_mesh(n);
        let mut cursor = Cursor::new(Vec::new());
        write_3mf(&mesh, &mut cursor).unwrap();
        let bytes = cursor.into_inner();

        group.bench_with_input(
            BenchmarkId::new("triangles", mesh.triangle_count()),
            &bytes,
            |b, bytes| b.iter(|| black_box(threemf::parse_3mf(bytes).unwrap())),
        );
    }

    group.finish();
}

fn bench_analyze_and_price(c: &mut Criterion) {
    let config = PricingConfig::default();
    let thresholds = ComplexityThresholds::default();
    let params = PrintParameters::new(Material::Petg, Quality::Fine, 25).unwrap();
    let file = FileInfo::new("slab.stl", 0);
    let mesh = generate_mesh(256);

    c.bench_function("analyze_256", |b| {
        b.iter(|| black_box(analyze(&mesh, &thresholds)))
    });

    let analysis = analyze(&mesh, &thresholds);
    c.bench_function("price_cached_analysis", |b| {
        b.iter(|| black_box(estimate_cost(&analysis, &file, &params, &config).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_parse_binary_stl,
    bench_parse_ascii_stl,
    bench_parse_3mf,
    bench_analyze_and_price
);
criterion_main!(benches);
