//! Benchmark for chunk-wise versus element-wise reduction.

use std::ops::ControlFlow;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use persistent_trie::persistent::PersistentVector;
use std::hint::black_box;

fn benchmark_reduce(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("reduce");

    for size in [1000_u64, 100_000] {
        let vector: PersistentVector<u64> = (0..size).collect();

        group.bench_with_input(BenchmarkId::new("chunked", size), &vector, |bencher, vector| {
            bencher.iter(|| {
                black_box(vector.reduce(0, |sum, element| ControlFlow::Continue(sum + element)))
            });
        });

        group.bench_with_input(BenchmarkId::new("chunks", size), &vector, |bencher, vector| {
            bencher.iter(|| {
                black_box(
                    vector
                        .chunks()
                        .map(|chunk| chunk.as_slice().iter().sum::<u64>())
                        .sum::<u64>(),
                )
            });
        });

        group.bench_with_input(BenchmarkId::new("rest", size), &vector, |bencher, vector| {
            bencher.iter(|| {
                let mut sum = 0;
                let mut current = vector.chunked_seq();
                while let Some(seq) = current {
                    sum += *seq.first();
                    current = seq.rest();
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_reduce);
criterion_main!(benches);
