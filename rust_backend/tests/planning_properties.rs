//! Property tests for the clock, bin and chunk planners.

use lmt_rust::binning::{BinTable, ChunkPlan};
use lmt_rust::time::Clock;
use proptest::prelude::*;

fn sampling_rate() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![1u32, 25, 30, 60, 120])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_frame_time_roundtrip(
        rate in sampling_rate(),
        known_frame in 1i64..50_000_000,
        known_ms in 1_600_000_000_000i64..1_900_000_000_000,
        frame in 0i64..50_000_000,
    ) {
        let clock = Clock::new(rate, known_frame, known_ms).unwrap();
        prop_assert_eq!(clock.time_to_frame(clock.frame_to_time(frame)), frame);
    }

    #[test]
    fn prop_bins_are_contiguous_and_cover_recording(
        rate in sampling_rate(),
        bin_minutes in 1i64..=120,
        last_frame in 1i64..20_000_000,
        last_ms in 1_600_000_000_000i64..1_900_000_000_000,
    ) {
        let clock = Clock::new(rate, last_frame, last_ms).unwrap();
        let duration = bin_minutes * clock.frames_per_minute();
        let table = BinTable::plan(&clock, duration, last_frame, None).unwrap();
        let bins = table.bins();

        prop_assert!(!bins.is_empty());
        prop_assert_eq!(bins[0].start_frame, 1);
        prop_assert_eq!(bins[bins.len() - 1].end_frame, last_frame);
        for pair in bins.windows(2) {
            prop_assert_eq!(pair[0].end_frame + 1, pair[1].start_frame);
        }
        for bin in bins {
            prop_assert!(bin.start_frame <= bin.end_frame);
        }
    }

    #[test]
    fn prop_bin_edges_aligned_to_bin_size(
        rate in sampling_rate(),
        bin_minutes in prop::sample::select(vec![1i64, 5, 10, 15, 30, 60, 120]),
        last_frame in 1i64..20_000_000,
        last_ms in 1_600_000_000_000i64..1_900_000_000_000,
    ) {
        let clock = Clock::new(rate, last_frame, last_ms).unwrap();
        let duration = bin_minutes * clock.frames_per_minute();
        let table = BinTable::plan(&clock, duration, last_frame, None).unwrap();

        let step_ms = bin_minutes * 60_000;
        for bin in table.bins() {
            prop_assert_eq!(bin.start_time.timestamp_millis().rem_euclid(step_ms), 0);
        }
    }

    #[test]
    fn prop_chunks_partition_bins_within_window(
        bin_minutes in prop::sample::select(vec![1i64, 5, 15, 30, 60]),
        window_hours in 1i64..=48,
        last_frame in 1i64..20_000_000,
        last_ms in 1_600_000_000_000i64..1_900_000_000_000,
    ) {
        let clock = Clock::new(30, last_frame, last_ms).unwrap();
        let duration = bin_minutes * clock.frames_per_minute();
        let max_chunk_frames = window_hours * clock.frames_per_hour();
        let table = BinTable::plan(&clock, duration, last_frame, None).unwrap();
        let plan = ChunkPlan::plan(table.bins(), max_chunk_frames, &clock, duration).unwrap();

        let flattened: Vec<_> = plan.bins().cloned().collect();
        prop_assert_eq!(flattened.as_slice(), table.bins());
        for chunk in plan.chunks() {
            prop_assert!(!chunk.is_empty());
            prop_assert!(chunk.calendar_span() <= max_chunk_frames);
        }
    }
}
