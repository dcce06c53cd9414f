//! Buffer growth benchmarks.

use audiofs_vfile::{growth, GrowableBuffer, MemoryFile, VfsBackend, Whence};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Benchmark the size-class computation alone.
fn bench_target_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_capacity");

    for required in [1u64 << 10, 1 << 20, 1 << 30, 1 << 40].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(required),
            required,
            |b, &required| {
                b.iter(|| growth::target_capacity(black_box(1024), black_box(required)));
            },
        );
    }

    group.finish();
}

/// Benchmark a single growth across several bands.
fn bench_ensure_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensure_capacity");
    group.sample_size(20);

    for required in [64u64 << 10, 1 << 20, 32 << 20].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(required),
            required,
            |b, &required| {
                b.iter(|| {
                    let buffer = GrowableBuffer::alloc(1024).unwrap();
                    let capacity = buffer.ensure_capacity(black_box(required)).unwrap();
                    black_box(capacity);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a sparse seek past the end, which reserves storage only.
fn bench_sparse_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_seek");
    group.sample_size(20);

    group.bench_function("16MiB", |b| {
        b.iter(|| {
            let mut file = MemoryFile::new(1024).unwrap();
            let position = file.seek(black_box(16 << 20), Whence::Start).unwrap();
            black_box(position);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_target_capacity,
    bench_ensure_capacity,
    bench_sparse_seek,
);

criterion_main!(benches);
