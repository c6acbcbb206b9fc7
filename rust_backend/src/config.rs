//! Analysis configuration.
//!
//! [`AnalysisConfig`] mirrors the TOML file read by the `lmt-analyse` binary;
//! [`AnalysisSettings`] is the resolved, frame-based form used by the
//! planners and the aggregator.
//!
//! ```toml
//! [clock]
//! sampling_rate_hz = 30
//!
//! [binning]
//! bin_minutes = 15
//! processing_window_hours = 24
//!
//! [window]
//! start = "2026-01-01T08:00:00Z"
//! end = 2592000
//!
//! [events]
//! names = ["Oral-oral Contact", "Huddling"]
//!
//! [sensors]
//! enabled = ["TEMPERATURE", "HUMIDITY"]
//!
//! [repository]
//! type = "sqlite"
//! path = "cage1.sqlite"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::db::RepositorySettings;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::SensorKind;
use crate::time::{FrameBound, DEFAULT_SAMPLING_RATE_HZ};

const DEFAULT_BIN_MINUTES: i64 = 15;
const DEFAULT_PROCESSING_WINDOW_HOURS: i64 = 24;

/// Pixel to centimetre ratio of the LMT camera (57 px for 10 cm).
pub const DEFAULT_CM_PER_PIXEL: f64 = 10.0 / 57.0;

// ==================== Resolved settings ====================

/// Locomotion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivitySettings {
    #[serde(default = "default_stop_event")]
    pub stop_event: String,
    /// Events summed into the move duration.
    #[serde(default = "default_move_events")]
    pub move_events: Vec<String>,
    /// Frames inside these events are dropped from distance and speed.
    #[serde(default)]
    pub excluded_events: Vec<String>,
    #[serde(default = "default_cm_per_pixel")]
    pub cm_per_pixel: f64,
}

fn default_stop_event() -> String {
    "Stop".to_string()
}

fn default_move_events() -> Vec<String> {
    vec!["Move isolated".to_string(), "Move in contact".to_string()]
}

fn default_cm_per_pixel() -> f64 {
    DEFAULT_CM_PER_PIXEL
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            stop_event: default_stop_event(),
            move_events: default_move_events(),
            excluded_events: Vec::new(),
            cm_per_pixel: default_cm_per_pixel(),
        }
    }
}

/// Frame-based parameters of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub sampling_rate_hz: u32,
    pub bin_duration_frames: i64,
    /// Maximum calendar span of one chunk.
    pub processing_window_frames: i64,
    pub window_start: Option<FrameBound>,
    pub window_end: Option<FrameBound>,
    pub activity: ActivitySettings,
    pub sensors: Vec<SensorKind>,
    pub max_concurrent_chunks: usize,
}

impl Default for AnalysisSettings {
    /// 30 Hz, 15 minute bins, one-day chunks, whole recording, all sensors.
    fn default() -> Self {
        let rate = DEFAULT_SAMPLING_RATE_HZ as i64;
        Self {
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            bin_duration_frames: DEFAULT_BIN_MINUTES * 60 * rate,
            processing_window_frames: DEFAULT_PROCESSING_WINDOW_HOURS * 3600 * rate,
            window_start: None,
            window_end: None,
            activity: ActivitySettings::default(),
            sensors: SensorKind::ALL.to_vec(),
            max_concurrent_chunks: 1,
        }
    }
}

// ==================== File format ====================

/// Analysis configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub clock: ClockSection,
    #[serde(default)]
    pub binning: BinningSection,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub activity: ActivitySettings,
    #[serde(default)]
    pub events: EventsSection,
    #[serde(default)]
    pub sensors: SensorsSection,
    #[serde(default)]
    pub processing: ProcessingSection,
    #[serde(default)]
    pub repository: RepositorySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockSection {
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate_hz: u32,
}

fn default_sampling_rate() -> u32 {
    DEFAULT_SAMPLING_RATE_HZ
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            sampling_rate_hz: default_sampling_rate(),
        }
    }
}

/// Bin and chunk sizes. Frame values win over minute/hour values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningSection {
    pub bin_duration_frames: Option<i64>,
    pub bin_minutes: Option<i64>,
    pub processing_window_frames: Option<i64>,
    pub processing_window_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub start: Option<FrameBound>,
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsSection {
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorsSection {
    #[serde(default = "default_sensors")]
    pub enabled: Vec<SensorKind>,
}

fn default_sensors() -> Vec<SensorKind> {
    SensorKind::ALL.to_vec()
}

impl Default for SensorsSection {
    fn default() -> Self {
        Self {
            enabled: default_sensors(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingSection {
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
}

fn default_max_concurrent_chunks() -> usize {
    1
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            max_concurrent_chunks: default_max_concurrent_chunks(),
        }
    }
}

impl AnalysisConfig {
    /// Load the configuration from a TOML file.
    ///
    /// # Returns
    /// * `Err(AnalysisError::InvalidConfiguration)` if the file cannot be
    ///   read or parsed; parse errors name the offending key
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::invalid(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse the configuration from TOML text.
    pub fn from_toml_str(content: &str) -> AnalysisResult<Self> {
        let deserializer = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            AnalysisError::invalid(format!(
                "Failed to parse config at `{}`: {}",
                e.path(),
                e.inner()
            ))
        })
    }

    /// Resolve minute/hour values into frames at the configured rate.
    ///
    /// Range checks are left to the planners.
    pub fn to_settings(&self) -> AnalysisResult<AnalysisSettings> {
        let rate = self.clock.sampling_rate_hz as i64;
        if rate < 1 {
            return Err(AnalysisError::invalid("Sampling rate must be at least 1 Hz"));
        }

        let bin_duration_frames = self
            .binning
            .bin_duration_frames
            .unwrap_or(self.binning.bin_minutes.unwrap_or(DEFAULT_BIN_MINUTES) * 60 * rate);
        let processing_window_frames = self.binning.processing_window_frames.unwrap_or(
            self.binning
                .processing_window_hours
                .unwrap_or(DEFAULT_PROCESSING_WINDOW_HOURS)
                * 3600
                * rate,
        );

        if self.processing.max_concurrent_chunks < 1 {
            return Err(AnalysisError::invalid(
                "max_concurrent_chunks must be at least 1",
            ));
        }
        let cm_per_pixel = self.activity.cm_per_pixel;
        if cm_per_pixel.is_nan() || cm_per_pixel <= 0.0 {
            return Err(AnalysisError::invalid(format!(
                "cm_per_pixel must be positive, got {}",
                self.activity.cm_per_pixel
            )));
        }

        Ok(AnalysisSettings {
            sampling_rate_hz: self.clock.sampling_rate_hz,
            bin_duration_frames,
            processing_window_frames,
            window_start: self.window.start,
            window_end: self.window.end,
            activity: self.activity.clone(),
            sensors: self.sensors.enabled.clone(),
            max_concurrent_chunks: self.processing.max_concurrent_chunks,
        })
    }
}
