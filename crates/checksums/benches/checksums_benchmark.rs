//! Throughput benchmarks for the block digests.
//!
//! Run with: `cargo bench -p checksums`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;

use checksums::strong::{Crc32, Md5};

/// Generate random data of the specified size.
fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut data = vec![0u8; size];
    rng.fill(&mut data[..]);
    data
}

/// Block sizes spanning the CLI's accepted range.
const BLOCK_SIZES: [usize; 4] = [1024, 64 * 1024, 1024 * 1024, 8 * 1024 * 1024];

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");

    for size in BLOCK_SIZES {
        let data = generate_random_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("digest", size), &data, |b, data| {
            b.iter(|| black_box(Crc32::digest(black_box(data))));
        });
    }

    group.finish();
}

fn bench_md5(c: &mut Criterion) {
    let mut group = c.benchmark_group("md5");

    for size in BLOCK_SIZES {
        let data = generate_random_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("digest", size), &data, |b, data| {
            b.iter(|| black_box(Md5::digest(black_box(data))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_crc32, bench_md5);
criterion_main!(benches);
