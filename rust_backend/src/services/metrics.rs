//! Per-bin metric computations on data already loaded for a chunk.

use std::collections::HashMap;

use qtty::length::Centimeters;

use crate::models::{
    merge_timeline, timeline_contains, Detection, EventInterval, Moments, SensorSample,
    SensorStats,
};

/// Distance and speed of one animal in one bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locomotion {
    pub distance: Centimeters,
    /// Moments of the per-step speed in cm/s; `None` without any step.
    pub speed: Option<Moments>,
}

/// Group intervals by animal and merge each animal's timeline.
pub fn timelines_by_animal(intervals: Vec<EventInterval>) -> HashMap<i64, Vec<EventInterval>> {
    let mut grouped: HashMap<i64, Vec<EventInterval>> = HashMap::new();
    for interval in intervals {
        grouped.entry(interval.animal_id).or_default().push(interval);
    }
    grouped
        .into_iter()
        .map(|(animal_id, intervals)| (animal_id, merge_timeline(intervals)))
        .collect()
}

/// Group detections by animal, each track ordered by frame.
pub fn tracks_by_animal(detections: Vec<Detection>) -> HashMap<i64, Vec<Detection>> {
    let mut tracks: HashMap<i64, Vec<Detection>> = HashMap::new();
    for detection in detections {
        tracks.entry(detection.animal_id).or_default().push(detection);
    }
    for track in tracks.values_mut() {
        track.sort_by_key(|d| d.frame);
        track.dedup_by_key(|d| d.frame);
    }
    tracks
}

/// Slice of a grouped map for one animal, empty if absent.
pub fn for_animal<T>(grouped: &HashMap<i64, Vec<T>>, animal_id: i64) -> &[T] {
    grouped.get(&animal_id).map(Vec::as_slice).unwrap_or(&[])
}

/// Distance travelled and speed moments over `[frame_min, frame_max]`.
///
/// A step joins two detections on consecutive frames `(t - 1, t)` and
/// belongs to the bin holding `t`. Steps whose frame `t` lies inside the
/// `excluded` timeline are dropped.
///
/// # Arguments
/// * `track` - Detections of one animal ordered by frame, starting at or
///   before `frame_min - 1`
/// * `excluded` - Merged timeline of excluded events for the same animal
/// * `cm_per_pixel` - Camera scale
/// * `sampling_rate_hz` - Frames per second, turns a step into a speed
pub fn locomotion(
    track: &[Detection],
    excluded: &[EventInterval],
    frame_min: i64,
    frame_max: i64,
    cm_per_pixel: f64,
    sampling_rate_hz: u32,
) -> Locomotion {
    let from = track
        .partition_point(|d| d.frame < frame_min)
        .saturating_sub(1);

    let mut distance = 0.0;
    let mut speeds: Vec<f64> = Vec::new();
    for pair in track[from..].windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.frame < frame_min {
            continue;
        }
        if current.frame > frame_max {
            break;
        }
        if previous.frame + 1 != current.frame || timeline_contains(excluded, current.frame) {
            continue;
        }

        let step = (current.x - previous.x).hypot(current.y - previous.y) * cm_per_pixel;
        distance += step;
        speeds.push(step * sampling_rate_hz as f64);
    }

    Locomotion {
        distance: Centimeters::new(distance),
        speed: Moments::from_values(&speeds),
    }
}

/// Frames of a bin covered by neither stop nor move, floored at zero.
///
/// Stop and move events may overlap in the store; the result is then
/// negative before clamping and a warning is logged.
pub fn undetected_frames(bin_span: i64, stop_frames: i64, move_frames: i64, rfid: &str) -> i64 {
    let undetected = bin_span - stop_frames - move_frames;
    if undetected < 0 {
        log::warn!(
            "Stop and move durations exceed the bin for animal {} ({} + {} > {} frames); undetected duration clamped to 0",
            rfid,
            stop_frames,
            move_frames,
            bin_span
        );
        return 0;
    }
    undetected
}

/// Statistics of the samples in `[frame_min, frame_max]`.
///
/// `samples` must be ordered by frame.
pub fn sensor_stats(samples: &[SensorSample], frame_min: i64, frame_max: i64) -> Option<SensorStats> {
    let first = samples.partition_point(|s| s.frame < frame_min);
    let last = samples.partition_point(|s| s.frame <= frame_max);
    let values: Vec<f64> = samples[first..last.max(first)]
        .iter()
        .map(|s| s.value)
        .filter(|v| v.is_finite())
        .collect();
    Moments::from_values(&values)
}
