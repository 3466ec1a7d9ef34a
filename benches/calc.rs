use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use qprof::{OpRecord, OpTimes, Profile, VecSource};

const NAMES: &[&str] = &[
    "write_buffer",
    "read_buffer",
    "kernel_a",
    "kernel_b",
    "copy",
    "map",
];
const NUM_QUEUES: usize = 4;

/// Builds `num_events` random intervals spread over a handful of queues,
/// with durations short enough that only a few operations are open at
/// any instant (the realistic concurrent-queue depth this crate is
/// designed around).
fn workload(num_events: usize) -> Vec<VecSource> {
    let mut rng = SmallRng::seed_from_u64(0x9e37);
    let mut queues = vec![VecSource::new(); NUM_QUEUES];
    for i in 0..num_events {
        let start = rng.gen_range(0..num_events as u64 * 50);
        let duration = rng.gen_range(0..200);
        queues[i % NUM_QUEUES].push(OpRecord::new(
            NAMES[rng.gen_range(0..NAMES.len())],
            OpTimes::span(start, start + duration),
        ));
    }
    queues
}

fn calc(c: &mut Criterion) {
    let mut group = c.benchmark_group("calc");
    for num_events in [1_000usize, 10_000, 100_000] {
        let queues = workload(num_events);
        group.throughput(Throughput::Elements(num_events as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_events),
            &queues,
            |b, queues| {
                b.iter(|| {
                    let mut prof = Profile::new();
                    for (i, queue) in queues.iter().enumerate() {
                        prof.add_queue(format!("Q{}", i), Arc::new(queue.clone()))
                            .unwrap();
                    }
                    prof.calc().unwrap();
                    prof
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, calc);
criterion_main!(benches);
