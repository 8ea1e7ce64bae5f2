use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_data::allocators::RangeAllocator;

fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Range Allocator");

    group.bench_function("Fill then free (1,000 unit blocks)", |b| {
        b.iter(|| {
            let mut allocator = RangeAllocator::new(1_000);
            let starts: Vec<usize> = (0..1_000).map(|_| allocator.alloc(1).unwrap()).collect();
            for start in starts.into_iter().rev() {
                allocator.dealloc(start, 1);
            }
            black_box(allocator.free_size());
        });
    });

    group.bench_function("First fit in a fragmented range", |b| {
        // Every other slot is free, so each request scans past many holes.
        let mut fragmented = RangeAllocator::new(4_000);
        fragmented.alloc(4_000).unwrap();
        for start in (1..4_000).step_by(2) {
            fragmented.dealloc(start, 1);
        }
        b.iter(|| {
            let mut allocator = fragmented.clone();
            let mut grown = 0;
            while let Err(err) = allocator.alloc(3) {
                allocator.set_capacity(err.requested_capacity);
                grown += 1;
            }
            black_box(grown);
        });
    });

    group.bench_function("Grow and retry", |b| {
        b.iter(|| {
            let mut allocator = RangeAllocator::new(16);
            for size in 1..200 {
                let start = match allocator.alloc(size) {
                    Ok(start) => start,
                    Err(err) => {
                        allocator.set_capacity(err.requested_capacity.next_power_of_two());
                        allocator.alloc(size).unwrap()
                    }
                };
                black_box(start);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_allocator);
criterion_main!(benches);
