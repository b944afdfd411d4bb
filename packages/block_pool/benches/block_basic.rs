//! Basic benchmarks for the `block_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::num::NonZero;
use std::time::Instant;

use block_pool::BlockPool;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const COUNT: NonZero<usize> = nz!(1024);
const BLOCK_SIZE: NonZero<usize> = nz!(64);
const PAYLOAD: [u8; 64] = [0x5A; 64];

fn new_pool() -> BlockPool {
    BlockPool::new(COUNT, BLOCK_SIZE).unwrap()
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_basic");

    group.bench_function("build", |b| {
        b.iter(|| drop(black_box(new_pool())));
    });

    group.bench_function("acquire_first", |b| {
        b.iter_custom(|iters| {
            // Single-block pools keep memory use flat for large iteration counts.
            let mut pools = iter::repeat_with(|| BlockPool::new(nz!(1), BLOCK_SIZE).unwrap())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.acquire().unwrap());
            }

            start.elapsed()
        });
    });

    group.bench_function("acquire_release", |b| {
        let mut pool = new_pool();

        b.iter(|| {
            let handle = pool.acquire().unwrap();
            pool.release(black_box(handle), 0).unwrap();
        });
    });

    group.bench_function("acquire_write_release", |b| {
        let mut pool = new_pool();

        b.iter(|| {
            let handle = pool.acquire().unwrap();
            pool.write(handle, black_box(&PAYLOAD)).unwrap();
            pool.release(handle, PAYLOAD.len()).unwrap();
        });
    });

    group.bench_function("drain_and_refill", |b| {
        let mut pool = new_pool();
        let mut handles = Vec::with_capacity(COUNT.get());

        b.iter(|| {
            while let Ok(handle) = pool.acquire() {
                handles.push(handle);
            }

            for handle in handles.drain(..) {
                pool.release(handle, 0).unwrap();
            }
        });
    });

    group.finish();
}
