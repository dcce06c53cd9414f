//! Virtual file I/O benchmarks.

use audiofs_bench::utils::{packets, random_data};
use audiofs_vfile::{MemoryFile, VfsBackend, VfsConfig, VfsTarget, VirtualFile, Whence};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

/// Benchmark memory-backed writes that stay within capacity.
fn bench_memory_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_write");

    for size in [64, 1024, 4096, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut file = MemoryFile::new(1024 * 1024).unwrap();
            let data = random_data(size);

            b.iter(|| {
                file.seek(0, Whence::Start).unwrap();
                let count = file.write(black_box(&data)).unwrap();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark memory-backed reads.
fn bench_memory_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_read");

    for size in [64, 1024, 4096, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut file = MemoryFile::new(1024).unwrap();
            file.write(&random_data(size)).unwrap();
            let mut out = vec![0u8; size];

            b.iter(|| {
                file.seek(0, Whence::Start).unwrap();
                let count = file.read(black_box(&mut out)).unwrap();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark an encoder-like stream of packets into a fresh memory file,
/// including every size-class growth on the way.
fn bench_memory_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_stream");
    group.sample_size(20);

    for total in [1 << 20, 8 << 20].iter() {
        let stream = packets(*total, 4096);
        group.throughput(Throughput::Bytes(*total as u64));
        group.bench_with_input(BenchmarkId::from_parameter(total), &stream, |b, stream| {
            b.iter(|| {
                let mut file = VirtualFile::open_memory().unwrap();
                for packet in stream {
                    file.write(black_box(packet)).unwrap();
                }
                black_box(file.size().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark synchronous disk writes.
fn bench_disk_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_write");

    // Every write is synced
    group.sample_size(20);

    for size in [1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("bench.dat");
            let mut file = VirtualFile::open(VfsTarget::path(&path), &VfsConfig::default()).unwrap();
            let data = random_data(size);

            b.iter(|| {
                file.seek(0, Whence::Start).unwrap();
                let count = file.write(black_box(&data)).unwrap();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Benchmark disk writes without per-write sync.
fn bench_disk_write_unsynced(c: &mut Criterion) {
    let mut group = c.benchmark_group("disk_write_unsynced");
    group.sample_size(50);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bench.dat");
    let config = VfsConfig::new().sync_writes(false);
    let mut file = VirtualFile::open(VfsTarget::path(&path), &config).unwrap();
    let data = random_data(4096);

    group.throughput(Throughput::Bytes(4096));
    group.bench_function("4096", |b| {
        b.iter(|| {
            file.seek(0, Whence::Start).unwrap();
            file.write(black_box(&data)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_write,
    bench_memory_read,
    bench_memory_stream,
    bench_disk_write,
    bench_disk_write_unsynced,
);

criterion_main!(benches);
