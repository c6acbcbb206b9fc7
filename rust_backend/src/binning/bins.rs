//! Calendar-aligned time bins over a recording.
//!
//! Bins do not start on the first recorded frame. Their edges are anchored on
//! round wall-clock times (multiples of the bin duration counted from the Unix
//! epoch), so a 15 minute bin always starts at `hh:00`, `hh:15`, `hh:30` or
//! `hh:45` whatever the recording start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::time::{floor_to_minutes, Clock, FrameBound};

/// One time bin.
///
/// `start_frame`/`end_frame` are the usable frames after clamping to the
/// recording (and to the analysis window in a windowed view). The
/// `calendar_*` frames are the raw aligned edges; the first one may be zero
/// or negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Bin {
    pub start_frame: i64,
    pub end_frame: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub calendar_start_frame: i64,
    pub calendar_end_frame: i64,
}

impl Bin {
    /// Number of usable frames in the bin.
    pub fn span(&self) -> i64 {
        self.end_frame - self.start_frame + 1
    }

    /// Number of frames between the aligned edges.
    pub fn calendar_span(&self) -> i64 {
        self.calendar_end_frame - self.calendar_start_frame + 1
    }

    pub fn contains(&self, frame: i64) -> bool {
        self.start_frame <= frame && frame <= self.end_frame
    }
}

/// Which side of a bin to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinEdge {
    Start,
    End,
}

/// Caller-selected subrange of a recording, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start_frame: i64,
    pub end_frame: i64,
}

impl AnalysisWindow {
    /// Validate a window against the last recorded frame.
    ///
    /// An end past the recording is clamped to `last_frame`.
    ///
    /// # Returns
    /// * `Err(AnalysisError::InvalidConfiguration)` if the start is outside
    ///   `[1, last_frame]`, the end is before frame 1, or `start >= end`
    pub fn new(start_frame: i64, end_frame: i64, last_frame: i64) -> AnalysisResult<Self> {
        if start_frame < 1 || start_frame > last_frame {
            return Err(AnalysisError::invalid(format!(
                "Window start out of range (start_frame = {} not in [1, {}])",
                start_frame, last_frame
            )));
        }
        if end_frame < 1 {
            return Err(AnalysisError::invalid(format!(
                "Window end out of range (end_frame = {} < 1)",
                end_frame
            )));
        }

        let end_frame = end_frame.min(last_frame);
        if start_frame >= end_frame {
            return Err(AnalysisError::invalid(format!(
                "Invalid frame limits (start_frame = {} >= end_frame = {})",
                start_frame, end_frame
            )));
        }

        Ok(Self {
            start_frame,
            end_frame,
        })
    }

    /// Resolve optional frame-or-time bounds into a window.
    ///
    /// Missing bounds default to frame 1 and `last_frame`.
    pub fn resolve(
        clock: &Clock,
        start: Option<FrameBound>,
        end: Option<FrameBound>,
        last_frame: i64,
    ) -> AnalysisResult<Self> {
        let start_frame = start.map(|bound| clock.resolve(bound)).unwrap_or(1);
        let end_frame = end.map(|bound| clock.resolve(bound)).unwrap_or(last_frame);
        Self::new(start_frame, end_frame, last_frame)
    }

    pub fn span(&self) -> i64 {
        self.end_frame - self.start_frame + 1
    }
}

/// The calendar-aligned bin table of a recording and its windowed view.
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    bin_duration_frames: i64,
    last_frame: i64,
    window: Option<AnalysisWindow>,
    calendar: Vec<Bin>,
    view: Vec<Bin>,
}

impl BinTable {
    /// Compute the bins covering `[1, last_frame]`.
    ///
    /// # Arguments
    /// * `clock` - Frame/time converter of the recording
    /// * `bin_duration_frames` - Bin length, at least one minute of frames
    /// * `last_frame` - Last frame present in the recording
    /// * `window` - Optional subrange used for the iteration view
    ///
    /// # Example
    /// ```
    /// use lmt_rust::binning::BinTable;
    /// use lmt_rust::time::Clock;
    ///
    /// // One day at 30 fps ending exactly at midnight.
    /// let clock = Clock::new(30, 2_592_000, 1_767_312_000_000).unwrap();
    /// let table = BinTable::plan(&clock, 27_000, 2_592_000, None).unwrap();
    /// assert_eq!(table.bins().len(), 96);
    /// ```
    pub fn plan(
        clock: &Clock,
        bin_duration_frames: i64,
        last_frame: i64,
        window: Option<AnalysisWindow>,
    ) -> AnalysisResult<Self> {
        if bin_duration_frames < clock.frames_per_minute() {
            return Err(AnalysisError::invalid(format!(
                "Bin size must be at least 1 minute ({} frames), got {}",
                clock.frames_per_minute(),
                bin_duration_frames
            )));
        }
        if last_frame < 1 {
            return Err(AnalysisError::invalid(format!(
                "Recording must contain at least one frame (last_frame = {})",
                last_frame
            )));
        }
        check_window(window, last_frame)?;

        let calendar = calendar_bins(clock, bin_duration_frames, last_frame);
        let view = window_view(&calendar, window);

        Ok(Self {
            bin_duration_frames,
            last_frame,
            window,
            calendar,
            view,
        })
    }

    /// Same calendar table viewed through another window.
    pub fn with_window(&self, window: Option<AnalysisWindow>) -> AnalysisResult<Self> {
        check_window(window, self.last_frame)?;
        Ok(Self {
            window,
            view: window_view(&self.calendar, window),
            ..self.clone()
        })
    }

    /// Bins used for iteration (clamped to the window when one is set).
    pub fn bins(&self) -> &[Bin] {
        &self.view
    }

    /// Full calendar-aligned table over the recording.
    pub fn calendar_bins(&self) -> &[Bin] {
        &self.calendar
    }

    pub fn bin_duration_frames(&self) -> i64 {
        self.bin_duration_frames
    }

    pub fn last_frame(&self) -> i64 {
        self.last_frame
    }

    pub fn window(&self) -> Option<AnalysisWindow> {
        self.window
    }

    /// First and last analysed frame.
    pub fn limits(&self) -> (i64, i64) {
        match self.window {
            Some(window) => (window.start_frame, window.end_frame),
            None => (1, self.last_frame),
        }
    }

    /// Start or end frame of every bin in the view.
    pub fn edges(&self, edge: BinEdge) -> Vec<i64> {
        self.view
            .iter()
            .map(|bin| match edge {
                BinEdge::Start => bin.start_frame,
                BinEdge::End => bin.end_frame,
            })
            .collect()
    }

    /// Start or end time of every bin in the view.
    pub fn edge_times(&self, edge: BinEdge) -> Vec<DateTime<Utc>> {
        self.view
            .iter()
            .map(|bin| match edge {
                BinEdge::Start => bin.start_time,
                BinEdge::End => bin.end_time,
            })
            .collect()
    }
}

fn check_window(window: Option<AnalysisWindow>, last_frame: i64) -> AnalysisResult<()> {
    match window {
        Some(w) if w.start_frame < 1 || w.end_frame > last_frame || w.start_frame >= w.end_frame => {
            Err(AnalysisError::invalid(format!(
                "Window [{}, {}] does not fit the recording [1, {}]",
                w.start_frame, w.end_frame, last_frame
            )))
        }
        _ => Ok(()),
    }
}

fn calendar_bins(clock: &Clock, duration: i64, last_frame: i64) -> Vec<Bin> {
    // The edge at or before frame `duration` ends a virtual bin 0 which
    // contains frame 1.
    let bin_minutes = duration / clock.frames_per_minute();
    let anchor_time = floor_to_minutes(clock.frame_to_time(duration), bin_minutes);
    let anchor_frame = clock.time_to_frame(anchor_time);

    let edge_time = |raw_start: i64| {
        anchor_time
            .checked_add_signed(clock.frames_to_timedelta(raw_start - anchor_frame))
            .unwrap_or_else(|| clock.frame_to_time(raw_start))
    };

    let mut bins: Vec<Bin> = Vec::new();
    let mut raw_start = anchor_frame - duration;
    while raw_start < last_frame || (bins.is_empty() && raw_start <= last_frame) {
        let raw_end = raw_start + duration - 1;
        if raw_end >= 1 {
            bins.push(Bin {
                start_frame: raw_start.max(1),
                end_frame: raw_end.min(last_frame),
                start_time: edge_time(raw_start),
                end_time: clock.frame_to_time(raw_end),
                calendar_start_frame: raw_start,
                calendar_end_frame: raw_end,
            });
        }
        raw_start += duration;
    }

    // A recording shorter than one bin is reported as a single bin.
    if last_frame < duration {
        bins.truncate(1);
    }
    // Frame `last_frame` may open a bin of its own; fold it into the last one.
    if let Some(last) = bins.last_mut() {
        last.end_frame = last_frame;
    }

    bins
}

fn window_view(calendar: &[Bin], window: Option<AnalysisWindow>) -> Vec<Bin> {
    let Some(window) = window else {
        return calendar.to_vec();
    };

    let mut view: Vec<Bin> = calendar
        .iter()
        .filter(|bin| bin.end_frame >= window.start_frame && bin.start_frame <= window.end_frame)
        .cloned()
        .collect();

    if let Some(first) = view.first_mut() {
        first.start_frame = first.start_frame.max(window.start_frame);
    }
    if let Some(last) = view.last_mut() {
        last.end_frame = last.end_frame.min(window.end_frame);
    }

    view
}
