//! Analysis session over one recording.
//!
//! A session reads the recording's last frame and animal pool once, keeps the
//! current settings and the plan derived from them, and runs the metric
//! families on demand. Setters re-plan immediately and leave the session
//! untouched when the new value is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use tokio_util::sync::CancellationToken;

use super::aggregator::Aggregator;
use crate::binning::{AnalysisPlan, AnalysisWindow, Bin, ChunkPlan};
use crate::config::AnalysisSettings;
use crate::db::repository::FullRepository;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ActivityRow, Animal, EventRow, FrameStamp, MetricTable, SensorTable};
use crate::time::{Clock, FrameBound};

/// Settings, recording facts and plan of one analysis.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use lmt_rust::config::AnalysisSettings;
/// use lmt_rust::db::LocalRepository;
/// use lmt_rust::services::AnalysisSession;
///
/// # #[tokio::main]
/// # async fn main() {
/// let repo = LocalRepository::new();
/// repo.set_last_frame(2_592_000, 1_767_312_000_000);
/// let session = AnalysisSession::open(Arc::new(repo), AnalysisSettings::default())
///     .await
///     .unwrap();
/// assert_eq!(session.bins().len(), 96);
/// # }
/// ```
pub struct AnalysisSession<R: FullRepository + ?Sized> {
    repo: Arc<R>,
    settings: AnalysisSettings,
    recording: FrameStamp,
    animals: Vec<Animal>,
    plan: AnalysisPlan,
    cancel: CancellationToken,
}

impl<R: FullRepository + ?Sized> AnalysisSession<R> {
    /// Read the recording and plan the analysis.
    ///
    /// # Returns
    /// * `Err(AnalysisError::EmptyResult)` if the recording has no frame
    /// * `Err(AnalysisError::InvalidConfiguration)` if the settings are invalid
    /// * `Err(AnalysisError::DataStore)` if the store cannot be read
    pub async fn open(repo: Arc<R>, settings: AnalysisSettings) -> AnalysisResult<Self> {
        let recording = repo.last_frame().await?.ok_or_else(|| {
            AnalysisError::EmptyResult("No data found in the frame table".to_string())
        })?;
        let animals = repo.list_animals().await?;
        let plan = AnalysisPlan::build(recording, &settings)?;

        info!(
            "Opened recording: {} frames, {} animal(s), {} bin(s) in {} chunk(s)",
            recording.frame,
            animals.len(),
            plan.bins().bins().len(),
            plan.chunks().len()
        );

        Ok(Self {
            repo,
            settings,
            recording,
            animals,
            plan,
            cancel: CancellationToken::new(),
        })
    }

    // ==================== Accessors ====================

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn recording(&self) -> FrameStamp {
        self.recording
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn plan(&self) -> &AnalysisPlan {
        &self.plan
    }

    pub fn clock(&self) -> &Clock {
        self.plan.clock()
    }

    /// Bins of the analysed range.
    pub fn bins(&self) -> &[Bin] {
        self.plan.bins().bins()
    }

    pub fn chunks(&self) -> &ChunkPlan {
        self.plan.chunks()
    }

    pub fn sampling_rate_hz(&self) -> u32 {
        self.settings.sampling_rate_hz
    }

    pub fn bin_duration_frames(&self) -> i64 {
        self.settings.bin_duration_frames
    }

    pub fn processing_window_frames(&self) -> i64 {
        self.settings.processing_window_frames
    }

    pub fn analysis_window(&self) -> Option<AnalysisWindow> {
        self.plan.bins().window()
    }

    /// First and last analysed frame.
    pub fn analysis_limits(&self) -> (i64, i64) {
        self.plan.limits()
    }

    /// First and last analysed frame as timestamps.
    pub fn analysis_time_limits(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.plan.time_limits()
    }

    /// Whether the analysed range needs more than one processing window.
    pub fn exceeds_processing_window(&self) -> bool {
        self.plan.exceeds_processing_window()
    }

    /// Recorded frames inside the analysed range.
    pub async fn count_frames(&self) -> AnalysisResult<u64> {
        let (start, end) = self.analysis_limits();
        Ok(self.repo.count_frames(start, end).await?)
    }

    // ==================== Setters ====================

    pub fn set_sampling_rate(&mut self, sampling_rate_hz: u32) -> AnalysisResult<()> {
        let settings = AnalysisSettings {
            sampling_rate_hz,
            ..self.settings.clone()
        };
        self.replan(settings)
    }

    pub fn set_bin_duration(&mut self, bin_duration_frames: i64) -> AnalysisResult<()> {
        let settings = AnalysisSettings {
            bin_duration_frames,
            ..self.settings.clone()
        };
        self.replan(settings)
    }

    pub fn set_processing_window(&mut self, processing_window_frames: i64) -> AnalysisResult<()> {
        let settings = AnalysisSettings {
            processing_window_frames,
            ..self.settings.clone()
        };
        self.replan(settings)
    }

    /// Restrict the analysis to a subrange; `None` bounds default to the
    /// recording's first and last frame.
    pub fn set_analysis_window(
        &mut self,
        start: Option<FrameBound>,
        end: Option<FrameBound>,
    ) -> AnalysisResult<()> {
        let settings = AnalysisSettings {
            window_start: start,
            window_end: end,
            ..self.settings.clone()
        };
        let plan = self.plan.rewindow(&settings)?;
        self.settings = settings;
        self.plan = plan;
        Ok(())
    }

    pub fn set_max_concurrent_chunks(&mut self, max_concurrent_chunks: usize) -> AnalysisResult<()> {
        if max_concurrent_chunks < 1 {
            return Err(AnalysisError::invalid(
                "max_concurrent_chunks must be at least 1",
            ));
        }
        self.settings.max_concurrent_chunks = max_concurrent_chunks;
        Ok(())
    }

    fn replan(&mut self, settings: AnalysisSettings) -> AnalysisResult<()> {
        let plan = AnalysisPlan::build(self.recording, &settings)?;
        self.settings = settings;
        self.plan = plan;
        Ok(())
    }

    // ==================== Cancellation ====================

    /// Token that stops running computations between chunks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Replace a cancelled token so the session can run again.
    pub fn reset_cancellation(&mut self) {
        self.cancel = CancellationToken::new();
    }

    // ==================== Processing ====================

    /// Event table of one behavioural event.
    pub async fn process_events(&self, event_name: &str) -> AnalysisResult<MetricTable<EventRow>> {
        self.aggregator().event_table(event_name).await
    }

    /// Activity table with the configured stop, move and excluded events.
    pub async fn process_activity(&self) -> AnalysisResult<MetricTable<ActivityRow>> {
        self.aggregator()
            .activity_table(&self.settings.activity)
            .await
    }

    /// Sensor table for the configured sensors.
    pub async fn process_sensors(&self) -> AnalysisResult<SensorTable> {
        self.aggregator().sensor_table(&self.settings.sensors).await
    }

    fn aggregator(&self) -> Aggregator<'_, R> {
        Aggregator::new(&*self.repo, &self.plan, &self.animals)
            .with_concurrency(self.settings.max_concurrent_chunks)
            .with_cancellation(self.cancel.clone())
    }
}
