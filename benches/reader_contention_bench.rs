use criterion::{criterion_group, criterion_main, Criterion};
use iter_shared::SequenceExt;
use std::hint::black_box;
use std::time::Duration;

mod utils;
use utils::{
    consume_in_lockstep, consume_one_by_one, generate_payloads, run_vec_fan_out, NUM_CONSUMERS,
};

// --- Criterion Benchmarks ---

fn benchmark_group(c: &mut Criterion) {
    let item_counts = [1_000, 10_000, 100_000];

    // --- 1. Contention Benchmarks (5 Consumers) ---
    let mut contention_group = c.benchmark_group("Contention (N=5)");

    contention_group.measurement_time(Duration::from_secs(10));
    contention_group.sample_size(50);

    for &count in item_counts.iter() {
        // --- Memoize, readers in lockstep ---
        contention_group.bench_function(&format!("Memoize_LOCKSTEP__{}", count), |b| {
            b.iter(|| {
                let buffer = generate_payloads(count).memoize();
                let readers: Vec<_> = (0..NUM_CONSUMERS)
                    .map(|_| buffer.reader().expect("buffer is live"))
                    .collect();
                black_box(consume_in_lockstep(readers));
            })
        });

        // --- Share, readers in lockstep (window stays near empty) ---
        contention_group.bench_function(&format!("Share_LOCKSTEP__{}", count), |b| {
            b.iter(|| {
                let buffer = generate_payloads(count).share();
                let readers: Vec<_> = (0..NUM_CONSUMERS)
                    .map(|_| buffer.reader().expect("buffer is live"))
                    .collect();
                black_box(consume_in_lockstep(readers));
            })
        });

        // --- Memoize, readers one after another (full replay) ---
        contention_group.bench_function(&format!("Memoize_SEQUENTIAL__{}", count), |b| {
            b.iter(|| {
                let buffer = generate_payloads(count).memoize();
                let readers: Vec<_> = (0..NUM_CONSUMERS)
                    .map(|_| buffer.reader().expect("buffer is live"))
                    .collect();
                black_box(consume_one_by_one(readers));
            })
        });

        // --- Vec Fan-Out (eager materialization) ---
        contention_group.bench_function(&format!("VecFanOut__{}", count), |b| {
            b.iter(|| {
                let consumers = run_vec_fan_out(generate_payloads(count));
                black_box(consume_one_by_one(consumers));
            })
        });
    }
    contention_group.finish();

    // --- 2. Wrapper Overhead Benchmarks (Single Consumer N=1) ---
    let mut overhead_group = c.benchmark_group("Wrapper Overhead (N=1)");
    overhead_group.measurement_time(Duration::from_secs(10));
    overhead_group.sample_size(50);

    for &count in item_counts.iter() {
        // A. Raw Iterator Consumption (Baseline)
        overhead_group.bench_function(&format!("RawIterator__{}", count), |b| {
            b.iter(|| black_box(generate_payloads(count).count()))
        });

        // B. Memoize Wrapper Consumption
        overhead_group.bench_function(&format!("MemoizeWrapper__{}", count), |b| {
            b.iter(|| {
                let buffer = generate_payloads(count).memoize();
                let reader = buffer.reader().expect("buffer is live");
                black_box(reader.count())
            })
        });

        // C. Share Wrapper Consumption
        overhead_group.bench_function(&format!("ShareWrapper__{}", count), |b| {
            b.iter(|| {
                let buffer = generate_payloads(count).share();
                let reader = buffer.reader().expect("buffer is live");
                black_box(reader.count())
            })
        });
    }
    overhead_group.finish();
}

criterion_group!(benches, benchmark_group);
criterion_main!(benches);
