//! Benchmarks for timeline merging and windowed playback.

use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use osr_script::script::{Channel, CommandEncoder, FrameStore, TimelineMerger};

/// One hour of dense actions on every axis.
fn dense_merger(interval_ms: u32) -> TimelineMerger {
    let mut merger = TimelineMerger::new(interval_ms).unwrap();
    for (offset, channel) in Channel::ALL.iter().enumerate() {
        for i in 0..36_000i64 {
            let at = i * 100 + offset as i64 * 7;
            merger.push_action(*channel, at, (i * 13 + offset as i64) % 101);
        }
    }
    merger
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for interval in [100, 500, 1000] {
        let merger = dense_merger(interval);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}ms", interval)),
            &interval,
            |b, _| {
                b.iter(|| black_box(merger.merge()));
            },
        );
    }

    group.finish();
}

fn bench_sequential_playback(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_playback");

    let script = dense_merger(100).merge();
    let mut bytes = Vec::new();
    script.write_to(&mut bytes).unwrap();
    let frame_count = script.header.frame_count;
    let encoder = CommandEncoder::default();

    for window in [16usize, 128, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(window),
            &window,
            |b, &window| {
                b.iter(|| {
                    let mut store = FrameStore::new(Cursor::new(&bytes[..]), window).unwrap();
                    let mut command = String::new();
                    for frame in 0..frame_count {
                        command.clear();
                        encoder.encode_into(&store.get(frame), &mut command);
                        black_box(&command);
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_merge, bench_sequential_playback);
criterion_main!(benches);
