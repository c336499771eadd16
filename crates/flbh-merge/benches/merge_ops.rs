//! Criterion micro-benchmarks for event extraction and scheduling.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use flbh_merge::schedule;
use flbh_replay::{extract_events, ReplayEvent};
use flbh_test_utils::ContainerBuilder;

/// Build a container with `n` timestamped records of ~40 bytes each.
fn make_container(n: usize, start: i64, step: i64) -> Vec<u8> {
    let mut builder = ContainerBuilder::new()
        .action("flashback:action/next_tick")
        .action("flashback:action/game_packet")
        .snapshot(&[0u8; 4096]);
    for i in 0..n {
        builder = builder.timed((i % 2) as u32, start + i as i64 * step, &[7u8; 32]);
    }
    builder.build()
}

fn two_sources(n: usize) -> Vec<ReplayEvent> {
    let a = make_container(n, 0, 2);
    let b = make_container(n, 1, 2);
    let mut events = extract_events(&a, "overworld").unwrap().events;
    events.extend(extract_events(&b, "nether").unwrap().events);
    events
}

/// Benchmark: Extract 10K records from one container.
fn bench_extract_10k(c: &mut Criterion) {
    let data = make_container(10_000, 0, 1);

    c.bench_function("extract_events_10k", |b| {
        b.iter(|| {
            let ext = extract_events(black_box(&data), "overworld").unwrap();
            black_box(ext.events.len());
        });
    });
}

/// Benchmark: Schedule two interleaved 10K-event sources.
fn bench_schedule_2x10k(c: &mut Criterion) {
    let events = two_sources(10_000);

    c.bench_function("schedule_2x10k", |b| {
        b.iter(|| {
            let plan = schedule(black_box(events.clone()));
            black_box(plan.stream_bytes().len());
        });
    });
}

criterion_group!(benches, bench_extract_10k, bench_schedule_2x10k);
criterion_main!(benches);
