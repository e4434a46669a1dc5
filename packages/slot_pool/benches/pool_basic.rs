//! Basic benchmarks for the `slot_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]
#![allow(
    clippy::undocumented_unsafe_blocks,
    reason = "No need for full safety rigor in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::SlotPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("pool_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SlotPool::<TestItem>::new()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_first");
    group.bench_function("acquire_first", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.acquire());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_virgin");
    group.bench_function("acquire_virgin", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            // Pre-warm each pool so the block allocation is out of the way.
            for pool in &mut pools {
                _ = pool.acquire();
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.acquire());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_release_cycle");
    group.bench_function("acquire_release_cycle", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::new();

            // Seed the free list so every iteration runs the recycling path.
            let seed = pool.acquire();
            unsafe {
                pool.release(seed);
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let storage = black_box(pool.acquire());
                unsafe {
                    storage.write(black_box(TEST_VALUE));
                    pool.release(storage);
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("acquire_10k");
    group.bench_function("acquire_10k", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                for _ in 0..10_000 {
                    _ = black_box(pool.acquire());
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
