//! Loop kernel benchmarks.
//!
//! Compares the plain counting loop with the chunked prefetch loop over the
//! same axpy-style update, at sizes from cache-resident to main-memory bound.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fj_loop::{init_tracing, loop_n, make_prefetch_context, NoPrefetch};

const SIZES: [usize; 4] = [1 << 10, 1 << 14, 1 << 18, 1 << 22];

fn bench_plain_vs_chunked(c: &mut Criterion) {
    init_tracing();
    let mut group = c.benchmark_group("loop_n/axpy");

    for len in SIZES {
        let x = vec![1.0_f64; len];
        let mut y = vec![2.0_f64; len];
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("plain", len), &len, |b, &len| {
            b.iter(|| {
                loop_n(0_usize, len, |i| y[i] += 0.5 * x[i]);
                black_box(&y);
            });
        });

        for factor in [1, 4, 20] {
            let Ok(ctx) =
                make_prefetch_context(0, len, &[x.as_slice(), y.as_slice()], factor)
            else {
                continue;
            };
            let chunks = ctx.chunk_count();

            group.bench_with_input(
                BenchmarkId::new(format!("chunked/factor={factor}"), len),
                &chunks,
                |b, &chunks| {
                    b.iter(|| {
                        loop_n(ctx.begin(), chunks, |i| y[i] += 0.5 * x[i]);
                        black_box(&y);
                    });
                },
            );

            let quiet = ctx.with_hint(NoPrefetch);
            group.bench_with_input(
                BenchmarkId::new(format!("chunked-no-hint/factor={factor}"), len),
                &chunks,
                |b, &chunks| {
                    b.iter(|| {
                        loop_n(quiet.begin(), chunks, |i| y[i] += 0.5 * x[i]);
                        black_box(&y);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_plain_vs_chunked);
criterion_main!(benches);
