//! Bin table, chunk plan and clock resolved together from the settings.

use chrono::{DateTime, Utc};

use super::bins::{AnalysisWindow, BinTable};
use super::chunks::ChunkPlan;
use crate::config::AnalysisSettings;
use crate::error::AnalysisResult;
use crate::models::FrameStamp;
use crate::time::Clock;

/// Everything the aggregator needs to walk a recording.
///
/// Built eagerly so that configuration errors surface before any chunk is
/// loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    clock: Clock,
    bins: BinTable,
    chunks: ChunkPlan,
}

impl AnalysisPlan {
    /// Resolve settings against the last frame of a recording.
    ///
    /// # Arguments
    /// * `recording` - Last frame of the recording and its timestamp
    /// * `settings` - Sampling rate, bin size, processing window and analysis window
    ///
    /// # Returns
    /// * `Err(AnalysisError::InvalidConfiguration)` on any invalid parameter
    pub fn build(recording: FrameStamp, settings: &AnalysisSettings) -> AnalysisResult<Self> {
        let clock = Clock::new(
            settings.sampling_rate_hz,
            recording.frame,
            recording.timestamp_ms,
        )?;
        ChunkPlan::validate_window(
            &clock,
            settings.processing_window_frames,
            settings.bin_duration_frames,
        )?;

        let window = resolve_window(&clock, settings, recording.frame)?;
        let bins = BinTable::plan(&clock, settings.bin_duration_frames, recording.frame, window)?;
        let chunks = ChunkPlan::plan(
            bins.bins(),
            settings.processing_window_frames,
            &clock,
            settings.bin_duration_frames,
        )?;

        Ok(Self {
            clock,
            bins,
            chunks,
        })
    }

    /// Re-plan with a new analysis window, reusing the calendar table.
    ///
    /// Only the window bounds of `settings` are read.
    pub fn rewindow(&self, settings: &AnalysisSettings) -> AnalysisResult<Self> {
        let window = resolve_window(&self.clock, settings, self.bins.last_frame())?;
        let bins = self.bins.with_window(window)?;
        let chunks = ChunkPlan::plan(
            bins.bins(),
            self.chunks.max_chunk_frames(),
            &self.clock,
            bins.bin_duration_frames(),
        )?;

        Ok(Self {
            clock: self.clock,
            bins,
            chunks,
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn bins(&self) -> &BinTable {
        &self.bins
    }

    pub fn chunks(&self) -> &ChunkPlan {
        &self.chunks
    }

    /// First and last analysed frame.
    pub fn limits(&self) -> (i64, i64) {
        self.bins.limits()
    }

    /// First and last analysed frame as timestamps.
    pub fn time_limits(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = self.limits();
        (self.clock.frame_to_time(start), self.clock.frame_to_time(end))
    }

    /// Whether the analysed range is longer than one processing window.
    pub fn exceeds_processing_window(&self) -> bool {
        let (start, end) = self.limits();
        end - start + 1 > self.chunks.max_chunk_frames()
    }
}

fn resolve_window(
    clock: &Clock,
    settings: &AnalysisSettings,
    last_frame: i64,
) -> AnalysisResult<Option<AnalysisWindow>> {
    if settings.window_start.is_none() && settings.window_end.is_none() {
        return Ok(None);
    }
    AnalysisWindow::resolve(clock, settings.window_start, settings.window_end, last_frame).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::time::FrameBound;

    fn recording() -> FrameStamp {
        // Three days at 30 fps; frame 0 at midnight.
        FrameStamp {
            frame: 7_776_000,
            timestamp_ms: 1_767_225_600_000 + 259_200_000,
        }
    }

    #[test]
    fn test_build_defaults() {
        let plan = AnalysisPlan::build(recording(), &AnalysisSettings::default()).unwrap();
        assert_eq!(plan.bins().bins().len(), 288);
        assert_eq!(plan.chunks().len(), 3);
        assert_eq!(plan.limits(), (1, 7_776_000));
        assert!(plan.exceeds_processing_window());
    }

    #[test]
    fn test_rewindow_keeps_calendar() {
        let plan = AnalysisPlan::build(recording(), &AnalysisSettings::default()).unwrap();
        let settings = AnalysisSettings {
            window_start: Some(FrameBound::Frame(100_000)),
            window_end: Some(FrameBound::Frame(200_000)),
            ..AnalysisSettings::default()
        };
        let windowed = plan.rewindow(&settings).unwrap();

        assert_eq!(windowed.limits(), (100_000, 200_000));
        assert_eq!(windowed.bins().calendar_bins(), plan.bins().calendar_bins());
        assert_eq!(windowed.chunks().len(), 1);
        assert!(!windowed.exceeds_processing_window());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let settings = AnalysisSettings {
            sampling_rate_hz: 0,
            ..AnalysisSettings::default()
        };
        let result = AnalysisPlan::build(recording(), &settings);
        assert!(matches!(result, Err(AnalysisError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_time_limits() {
        let plan = AnalysisPlan::build(recording(), &AnalysisSettings::default()).unwrap();
        let (start, end) = plan.time_limits();
        assert_eq!(start, plan.clock().frame_to_time(1));
        assert_eq!(end.timestamp_millis(), 1_767_225_600_000 + 259_200_000);
    }
}
