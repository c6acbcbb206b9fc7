use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lmt_rust::binning::{BinTable, ChunkPlan};
use lmt_rust::models::{merge_timeline, EventInterval, EventTally};
use lmt_rust::time::Clock;

const LAST_MS: i64 = 1_769_904_000_000;
const FRAMES_PER_DAY: i64 = 2_592_000;

fn bench_bin_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("bin_planning");

    for days in [1i64, 7, 30] {
        let last_frame = days * FRAMES_PER_DAY;
        let clock = Clock::new(30, last_frame, LAST_MS).unwrap();
        group.bench_with_input(BenchmarkId::new("quarter_hour_bins", days), &last_frame, |b, &last| {
            b.iter(|| BinTable::plan(black_box(&clock), 27_000, black_box(last), None));
        });
        group.bench_with_input(BenchmarkId::new("minute_bins", days), &last_frame, |b, &last| {
            b.iter(|| BinTable::plan(black_box(&clock), 1_800, black_box(last), None));
        });
    }

    group.finish();
}

fn bench_chunk_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_planning");

    let last_frame = 30 * FRAMES_PER_DAY;
    let clock = Clock::new(30, last_frame, LAST_MS).unwrap();
    let table = BinTable::plan(&clock, 1_800, last_frame, None).unwrap();
    for hours in [1i64, 24] {
        let window = hours * clock.frames_per_hour();
        group.bench_with_input(BenchmarkId::new("minute_bins_30_days", hours), &window, |b, &window| {
            b.iter(|| ChunkPlan::plan(black_box(table.bins()), window, &clock, 1_800));
        });
    }

    group.finish();
}

fn bench_event_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_tally");

    let intervals: Vec<EventInterval> = (0..10_000)
        .map(|i| EventInterval::new(1, i * 250, i * 250 + 120))
        .collect();
    let timeline = merge_timeline(intervals.clone());

    group.bench_function("merge_10k", |b| {
        b.iter(|| merge_timeline(black_box(intervals.clone())));
    });
    group.bench_function("tally_96_bins", |b| {
        b.iter(|| {
            for bin in 0..96i64 {
                black_box(EventTally::from_timeline(
                    black_box(&timeline),
                    bin * 27_000 + 1,
                    (bin + 1) * 27_000,
                ));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_bin_planning, bench_chunk_planning, bench_event_tally);
criterion_main!(benches);
