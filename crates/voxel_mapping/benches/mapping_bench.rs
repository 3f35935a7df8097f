//! Benchmarks for scan integration and raycast queries.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use voxel_mapping::{PointCloud, ScanOptions, VoxelMap};

/// Synthetic scan: a spherical shell of endpoints around the sensor.
fn sphere_scan(points: usize, radius: f32) -> PointCloud {
  (0..points)
    .map(|i| {
      // Fibonacci sphere: evenly spread directions without randomness.
      let t = (i as f32 + 0.5) / points as f32;
      let inclination = (1.0 - 2.0 * t).acos();
      let azimuth = 2.399963 * i as f32;
      Vec3::new(
        radius * inclination.sin() * azimuth.cos(),
        radius * inclination.sin() * azimuth.sin(),
        radius * inclination.cos(),
      )
    })
    .collect()
}

fn bench_insert_scan(c: &mut Criterion) {
  let mut group = c.benchmark_group("insert_scan");
  for &points in &[500usize, 2000] {
    let scan = sphere_scan(points, 5.0);
    group.bench_with_input(BenchmarkId::new("eager", points), &scan, |b, scan| {
      b.iter(|| {
        let mut map = VoxelMap::new(0.05);
        map.insert_scan(black_box(scan), Vec3::ZERO, ScanOptions::default());
        map
      })
    });
    group.bench_with_input(BenchmarkId::new("lazy", points), &scan, |b, scan| {
      b.iter(|| {
        let mut map = VoxelMap::new(0.05);
        map.insert_scan(
          black_box(scan),
          Vec3::ZERO,
          ScanOptions::default().with_lazy_eval(true),
        );
        map.update_inner_occupancy();
        map
      })
    });
  }
  group.finish();
}

fn bench_cast_ray(c: &mut Criterion) {
  let mut map = VoxelMap::new(0.05);
  map.insert_scan(&sphere_scan(2000, 5.0), Vec3::ZERO, ScanOptions::default());

  c.bench_function("cast_ray", |b| {
    b.iter(|| {
      map.cast_ray(
        black_box(Vec3::ZERO),
        black_box(Vec3::new(1.0, 0.3, -0.2)),
        true,
        10.0,
      )
    })
  });
}

fn bench_binary_roundtrip(c: &mut Criterion) {
  let mut map = VoxelMap::new(0.05);
  map.insert_scan(&sphere_scan(2000, 5.0), Vec3::ZERO, ScanOptions::default());
  let mut buffer = Vec::new();
  map.write_binary(&mut buffer).unwrap();

  c.bench_function("read_binary", |b| {
    b.iter(|| {
      let mut restored = VoxelMap::new(0.05);
      restored.read_binary(&mut std::io::Cursor::new(black_box(&buffer))).unwrap();
      restored
    })
  });
}

criterion_group!(benches, bench_insert_scan, bench_cast_ray, bench_binary_roundtrip);
criterion_main!(benches);
