//! Records read from an LMT recording.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A frame number with its recorded timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStamp {
    pub frame: i64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// A tracked animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: i64,
    pub rfid: String,
    pub name: Option<String>,
    pub genotype: Option<String>,
}

impl Animal {
    pub fn new(id: i64, rfid: impl Into<String>) -> Self {
        Self {
            id,
            rfid: rfid.into(),
            name: None,
            genotype: None,
        }
    }
}

/// Mass centre of one animal at one frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub animal_id: i64,
    pub frame: i64,
    pub x: f64,
    pub y: f64,
}

/// A behavioural event of one animal, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInterval {
    pub animal_id: i64,
    pub start_frame: i64,
    pub end_frame: i64,
}

impl EventInterval {
    pub fn new(animal_id: i64, start_frame: i64, end_frame: i64) -> Self {
        Self {
            animal_id,
            start_frame,
            end_frame,
        }
    }

    /// Number of frames shared with `[frame_min, frame_max]`.
    pub fn overlap(&self, frame_min: i64, frame_max: i64) -> i64 {
        (self.end_frame.min(frame_max) - self.start_frame.max(frame_min) + 1).max(0)
    }

    pub fn intersects(&self, frame_min: i64, frame_max: i64) -> bool {
        self.overlap(frame_min, frame_max) > 0
    }
}

/// Event count and duration inside a frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventTally {
    /// Intervals starting inside the range.
    pub count: u64,
    /// Frames of the range covered by an interval.
    pub total_duration_frames: i64,
}

impl EventTally {
    /// Tally a merged, sorted timeline of one animal over `[frame_min, frame_max]`.
    ///
    /// An interval is counted once, in the range holding its start frame;
    /// its frames are split between every range it overlaps.
    pub fn from_timeline(timeline: &[EventInterval], frame_min: i64, frame_max: i64) -> Self {
        let first = timeline.partition_point(|event| event.end_frame < frame_min);

        let mut tally = EventTally::default();
        for event in timeline[first..]
            .iter()
            .take_while(|event| event.start_frame <= frame_max)
        {
            if event.start_frame >= frame_min {
                tally.count += 1;
            }
            tally.total_duration_frames += event.overlap(frame_min, frame_max);
        }
        tally
    }
}

/// Merge the intervals of one animal into a sorted, non-overlapping timeline.
///
/// Overlapping and adjacent intervals are joined, the same way a per-frame
/// presence map would see them.
pub fn merge_timeline(mut intervals: Vec<EventInterval>) -> Vec<EventInterval> {
    intervals.sort_by_key(|event| (event.start_frame, event.end_frame));

    let mut merged: Vec<EventInterval> = Vec::with_capacity(intervals.len());
    for event in intervals.into_iter().filter(|e| e.end_frame >= e.start_frame) {
        match merged.last_mut() {
            Some(last) if event.start_frame <= last.end_frame + 1 => {
                last.end_frame = last.end_frame.max(event.end_frame);
            }
            _ => merged.push(event),
        }
    }
    merged
}

/// Whether `frame` lies inside a merged timeline.
pub fn timeline_contains(timeline: &[EventInterval], frame: i64) -> bool {
    let index = timeline.partition_point(|event| event.end_frame < frame);
    timeline
        .get(index)
        .is_some_and(|event| event.start_frame <= frame)
}

// ==================== Sensors ====================

/// Cage-level sensor columns of the `FRAME` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "TEMPERATURE")]
    Temperature,
    #[serde(rename = "HUMIDITY")]
    Humidity,
    #[serde(rename = "SOUND")]
    Sound,
    #[serde(rename = "LIGHTVISIBLE")]
    LightVisible,
    #[serde(rename = "LIGHTVISIBLEANDIR")]
    LightVisibleAndIr,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Sound,
        SensorKind::LightVisible,
        SensorKind::LightVisibleAndIr,
    ];

    /// Column name in the `FRAME` table.
    pub fn column(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "TEMPERATURE",
            SensorKind::Humidity => "HUMIDITY",
            SensorKind::Sound => "SOUND",
            SensorKind::LightVisible => "LIGHTVISIBLE",
            SensorKind::LightVisibleAndIr => "LIGHTVISIBLEANDIR",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::Sound => "Sound level",
            SensorKind::LightVisible => "Visible light",
            SensorKind::LightVisibleAndIr => "Visible and infrared light",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Sound => "dB",
            SensorKind::LightVisible | SensorKind::LightVisibleAndIr => "lux",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.column().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Unknown sensor: '{}'. Valid options: TEMPERATURE, HUMIDITY, SOUND, LIGHTVISIBLE, LIGHTVISIBLEANDIR",
                    s
                )
            })
    }
}

/// One reading of a cage sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub frame: i64,
    pub value: f64,
}
