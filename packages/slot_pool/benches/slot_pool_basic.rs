//! Basic benchmarks for the `slot_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::num::NonZero;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use slot_pool::SlotPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

const CAPACITY: NonZero<usize> = nz!(16_384);

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("slot_pool_basic");

    let allocs_op = allocs.operation("build");
    group.bench_function("build", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SlotPool::<TestItem>::with_capacity(CAPACITY)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_one");
    group.bench_function("allocate_one", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| SlotPool::<TestItem>::with_capacity(CAPACITY))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate(black_box(1)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("construct_destroy_one");
    group.bench_function("construct_destroy_one", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(CAPACITY);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let ptr = pool.allocate(1).unwrap();
                pool.construct(ptr, black_box(TEST_VALUE));

                // SAFETY: The slot holds the value we just constructed.
                unsafe { pool.destroy(ptr) };
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("slot_pool_slow");

    let allocs_op = allocs.operation("fill_one_by_one");
    group.bench_function("fill_one_by_one", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| SlotPool::<TestItem>::with_capacity(CAPACITY))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                while !pool.is_full() {
                    _ = black_box(pool.allocate(1));
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("fragmented_first_fit");
    group.bench_function("fragmented_first_fit", |b| {
        // Every other slot is reserved, so a two-slot request has to scan to the very end
        // before it finds a fit.
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(CAPACITY);

            let singles = iter::repeat_with(|| pool.allocate(1).unwrap())
                .take(CAPACITY.get())
                .collect::<Vec<_>>();

            for ptr in singles.iter().step_by(2) {
                pool.deallocate(*ptr, 1);
            }

            let last = *singles.last().unwrap();
            pool.deallocate(last, 1);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let ptr = pool.allocate(black_box(2)).unwrap();
                pool.deallocate(ptr, 2);
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
