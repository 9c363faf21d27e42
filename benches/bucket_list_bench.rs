//! Benchmark for BucketList vs standard Vec.
//!
//! Appends and reads favour `Vec`; insertion and removal in the middle of
//! large sequences are where the bucket list should pull ahead.

use bucketlist::bucket::{BucketList, CopyBucketList};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SIZES: [u32; 3] = [1_000, 10_000, 100_000];

// =============================================================================
// add Benchmark
// =============================================================================

fn benchmark_add(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("add");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut list: BucketList<u32> = BucketList::new();
                for value in 0..size {
                    list.add(black_box(value));
                }
                black_box(list)
            });
        });

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = Vec::new();
                for value in 0..size {
                    vector.push(black_box(value));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark (Random Access)
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in SIZES {
        let list: BucketList<u32> = (0..size).collect();
        let vector: Vec<u32> = (0..size).collect();
        let stride = 7919 % size as usize;

        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0u64;
                let mut index = 0;
                for _ in 0..size {
                    index = (index + stride) % size as usize;
                    if let Some(&value) = list.get(black_box(index)) {
                        sum += u64::from(value);
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0u64;
                let mut index = 0;
                for _ in 0..size {
                    index = (index + stride) % size as usize;
                    if let Some(&value) = vector.get(black_box(index)) {
                        sum += u64::from(value);
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// insert Benchmark (Middle)
// =============================================================================

fn benchmark_insert_middle(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("insert_middle");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<BucketList<u32>>(),
                |mut list| {
                    for value in 0..1000 {
                        let index = list.len() / 2;
                        let _ = list.insert(index, black_box(value));
                    }
                    list
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(
            BenchmarkId::new("CopyBucketList", size),
            &size,
            |bencher, &size| {
                bencher.iter_batched(
                    || (0..size).collect::<CopyBucketList<u32>>(),
                    |mut list| {
                        for value in 0..1000 {
                            let index = list.len() / 2;
                            let _ = list.insert(index, black_box(value));
                        }
                        list
                    },
                    BatchSize::LargeInput,
                );
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<Vec<u32>>(),
                |mut vector| {
                    for value in 0..1000 {
                        let index = vector.len() / 2;
                        vector.insert(index, black_box(value));
                    }
                    vector
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// remove_at Benchmark (Front)
// =============================================================================

fn benchmark_remove_front(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("remove_front");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<BucketList<u32>>(),
                |mut list| {
                    for _ in 0..1000 {
                        black_box(list.remove_at(0).ok());
                    }
                    list
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<Vec<u32>>(),
                |mut vector| {
                    for _ in 0..1000 {
                        black_box(vector.remove(0));
                    }
                    vector
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// remove_range Benchmark
// =============================================================================

fn benchmark_remove_range(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("remove_range");

    for size in SIZES {
        let count = size as usize / 2;

        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<BucketList<u32>>(),
                |mut list| {
                    let _ = list.remove_range(black_box(count / 2), count);
                    list
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter_batched(
                || (0..size).collect::<Vec<u32>>(),
                |mut vector| {
                    let start = black_box(count / 2);
                    vector.drain(start..start + count);
                    vector
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmark
// =============================================================================

fn benchmark_iteration(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iteration");

    for size in SIZES {
        let list: BucketList<u32> = (0..size).collect();
        let vector: Vec<u32> = (0..size).collect();

        group.bench_with_input(BenchmarkId::new("BucketList", size), &size, |bencher, _| {
            bencher.iter(|| black_box(list.iter().map(|&value| u64::from(value)).sum::<u64>()));
        });

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| black_box(vector.iter().map(|&value| u64::from(value)).sum::<u64>()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_add,
    benchmark_get,
    benchmark_insert_middle,
    benchmark_remove_front,
    benchmark_remove_range,
    benchmark_iteration
);

criterion_main!(benches);
