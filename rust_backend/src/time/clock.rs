//! Conversion between frame numbers and absolute timestamps.
//!
//! A [`Clock`] is anchored by one observed `(frame, timestamp)` pair, usually
//! the last row of the LMT `FRAME` table, and a fixed sampling rate. Every
//! other conversion in the crate goes through it.

use chrono::{DateTime, TimeDelta, Utc};
use qtty::time::Minutes;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Frames per second used by LMT recordings.
pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 30;

/// A recording position given either as a frame number or as a timestamp.
///
/// Resolved once into a frame with [`Clock::resolve`] before entering the
/// planners.
///
/// # Examples
///
/// ```
/// use lmt_rust::time::FrameBound;
///
/// let bound: FrameBound = serde_json::from_str("27000").unwrap();
/// assert_eq!(bound, FrameBound::Frame(27000));
///
/// let bound: FrameBound = serde_json::from_str("\"2026-01-01T06:00:00Z\"").unwrap();
/// assert!(matches!(bound, FrameBound::Time(_)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameBound {
    Frame(i64),
    Time(DateTime<Utc>),
}

impl From<i64> for FrameBound {
    fn from(frame: i64) -> Self {
        FrameBound::Frame(frame)
    }
}

impl From<DateTime<Utc>> for FrameBound {
    fn from(time: DateTime<Utc>) -> Self {
        FrameBound::Time(time)
    }
}

/// Frame/time converter for one recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    sampling_rate_hz: u32,
    /// Timestamp of frame 0 in milliseconds since the Unix epoch.
    reference_timestamp_ms: f64,
}

impl Clock {
    /// Create a clock from one known frame and its timestamp.
    ///
    /// # Arguments
    /// * `sampling_rate_hz` - Frames per second, at least 1
    /// * `known_frame` - A frame number observed in the recording
    /// * `known_timestamp_ms` - Timestamp of `known_frame` in milliseconds
    ///
    /// # Returns
    /// * `Ok(Clock)` anchored so that `frame_to_time(known_frame)` is `known_timestamp_ms`
    /// * `Err(AnalysisError::InvalidConfiguration)` if the rate is zero
    ///
    /// # Example
    /// ```
    /// use lmt_rust::time::Clock;
    ///
    /// let clock = Clock::new(30, 300, 1_000_000).unwrap();
    /// assert_eq!(clock.reference_timestamp_ms(), 990_000);
    /// ```
    pub fn new(
        sampling_rate_hz: u32,
        known_frame: i64,
        known_timestamp_ms: i64,
    ) -> AnalysisResult<Self> {
        if sampling_rate_hz < 1 {
            return Err(AnalysisError::invalid("Sampling rate must be at least 1 Hz"));
        }

        let reference_timestamp_ms =
            known_timestamp_ms as f64 - known_frame as f64 / sampling_rate_hz as f64 * 1000.0;

        Ok(Self {
            sampling_rate_hz,
            reference_timestamp_ms,
        })
    }

    pub fn sampling_rate_hz(&self) -> u32 {
        self.sampling_rate_hz
    }

    /// Timestamp of frame 0, rounded to the millisecond.
    pub fn reference_timestamp_ms(&self) -> i64 {
        self.reference_timestamp_ms.round() as i64
    }

    pub fn frames_per_minute(&self) -> i64 {
        60 * self.sampling_rate_hz as i64
    }

    pub fn frames_per_hour(&self) -> i64 {
        60 * self.frames_per_minute()
    }

    pub fn frames_per_day(&self) -> i64 {
        24 * self.frames_per_hour()
    }

    /// Unrounded timestamp of a frame in milliseconds.
    pub fn frame_timestamp_ms(&self, frame: i64) -> f64 {
        self.reference_timestamp_ms + frame as f64 * 1000.0 / self.sampling_rate_hz as f64
    }

    /// Absolute time of a frame, with millisecond resolution.
    ///
    /// Saturates at the range chrono can represent.
    pub fn frame_to_time(&self, frame: i64) -> DateTime<Utc> {
        datetime_from_millis(self.frame_timestamp_ms(frame).round() as i64)
    }

    /// Nearest frame to an absolute time.
    pub fn time_to_frame(&self, time: DateTime<Utc>) -> i64 {
        let time_ms =
            time.timestamp() as f64 * 1000.0 + time.timestamp_subsec_nanos() as f64 / 1e6;
        ((time_ms - self.reference_timestamp_ms) * self.sampling_rate_hz as f64 / 1000.0).round()
            as i64
    }

    /// Number of frames covered by a duration, rounded to the nearest frame.
    pub fn timedelta_to_frames(&self, delta: TimeDelta) -> i64 {
        (delta.num_milliseconds() as f64 * self.sampling_rate_hz as f64 / 1000.0).round() as i64
    }

    /// Duration of a number of frames, with millisecond resolution.
    pub fn frames_to_timedelta(&self, frames: i64) -> TimeDelta {
        let millis = (frames as f64 * 1000.0 / self.sampling_rate_hz as f64).round() as i64;
        TimeDelta::try_milliseconds(millis).unwrap_or(if millis < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        })
    }

    /// Duration of a number of frames in minutes (`frames / rate / 60`).
    pub fn frames_to_minutes(&self, frames: i64) -> Minutes {
        Minutes::new(frames as f64 / self.sampling_rate_hz as f64 / 60.0)
    }

    /// Resolve a frame-or-time bound into a frame number.
    pub fn resolve(&self, bound: FrameBound) -> i64 {
        match bound {
            FrameBound::Frame(frame) => frame,
            FrameBound::Time(time) => self.time_to_frame(time),
        }
    }
}

/// Floor a timestamp to a whole multiple of `minutes`, counted from the Unix epoch.
pub fn floor_to_minutes(time: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let step_ms = minutes.max(1) * 60_000;
    let floored = time.timestamp_millis().div_euclid(step_ms) * step_ms;
    datetime_from_millis(floored)
}

fn datetime_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(if millis < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn midnight_clock() -> Clock {
        // Frame 2_592_000 is midnight of 2026-01-02, so frame 0 is midnight of 2026-01-01.
        let day2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        Clock::new(30, 2_592_000, day2.timestamp_millis()).unwrap()
    }

    #[test]
    fn test_zero_rate_rejected() {
        let result = Clock::new(0, 10, 1_000);
        assert!(matches!(result, Err(AnalysisError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_reference_derived_from_known_pair() {
        let clock = midnight_clock();
        let day1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(clock.reference_timestamp_ms(), day1.timestamp_millis());
        assert_eq!(clock.frame_to_time(0), day1);
    }

    #[test]
    fn test_frame_to_time_quarter_hour() {
        let clock = midnight_clock();
        let t = clock.frame_to_time(27_000);
        assert_eq!(t.hour(), 0);
        assert_eq!(t.minute(), 15);
        assert_eq!(t.second(), 0);
    }

    #[test]
    fn test_time_to_frame_inverse() {
        let clock = Clock::new(30, 123_457, 1_767_225_601_337).unwrap();
        for frame in [1, 2, 29, 30, 31, 27_000, 123_457, 2_592_000] {
            assert_eq!(clock.time_to_frame(clock.frame_to_time(frame)), frame);
        }
    }

    #[test]
    fn test_timedelta_frames_inverse() {
        let clock = midnight_clock();
        assert_eq!(clock.timedelta_to_frames(TimeDelta::minutes(15)), 27_000);
        assert_eq!(clock.frames_to_timedelta(27_000), TimeDelta::minutes(15));
        for frames in [1, 7, 45, 1_801, 86_400] {
            let delta = clock.frames_to_timedelta(frames);
            assert_eq!(clock.timedelta_to_frames(delta), frames);
        }
    }

    #[test]
    fn test_frames_to_minutes() {
        let clock = midnight_clock();
        assert_eq!(clock.frames_to_minutes(27_000).value(), 15.0);
        assert_eq!(clock.frames_to_minutes(0).value(), 0.0);
    }

    #[test]
    fn test_resolve_bounds() {
        let clock = midnight_clock();
        let six_am = Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap();
        assert_eq!(clock.resolve(FrameBound::Frame(42)), 42);
        assert_eq!(clock.resolve(FrameBound::Time(six_am)), 6 * 108_000);
    }

    #[test]
    fn test_floor_to_minutes() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 10, 44, 59).unwrap();
        let floored = floor_to_minutes(t, 15);
        assert_eq!(floored, Utc.with_ymd_and_hms(2026, 1, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_frame_rates() {
        let clock = Clock::new(25, 0, 0).unwrap();
        assert_eq!(clock.frames_per_minute(), 1_500);
        assert_eq!(clock.frames_per_hour(), 90_000);
        assert_eq!(clock.frames_per_day(), 2_160_000);
    }
}
