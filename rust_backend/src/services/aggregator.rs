//! Chunked computation of per-bin metric tables.
//!
//! Every table family walks the chunk plan in order. Each chunk issues one
//! bulk load per data family, computes its rows for every animal × bin, and
//! the per-chunk rows are concatenated and grouped by animal at the end.
//! Bins never straddle chunks, so the result does not depend on the
//! processing window.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use futures::{stream, StreamExt};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::metrics::{
    for_animal, locomotion, sensor_stats, timelines_by_animal, tracks_by_animal,
    undetected_frames,
};
use crate::binning::{AnalysisPlan, Bin, Chunk};
use crate::config::ActivitySettings;
use crate::db::repository::FullRepository;
use crate::error::{AnalysisError, AnalysisResult, SensorUnavailable};
use crate::models::{
    ActivityRow, Animal, EventInterval, EventRow, EventTally, MetricTable, SensorAvailability,
    SensorKind, SensorRow, SensorSample, SensorTable,
};

/// Runs the metric families of one analysis plan against a repository.
pub struct Aggregator<'a, R: FullRepository + ?Sized> {
    repo: &'a R,
    plan: &'a AnalysisPlan,
    animals: &'a [Animal],
    max_concurrent_chunks: usize,
    cancel: CancellationToken,
}

/// Rows and per-sensor outcome of one chunk.
struct SensorChunk {
    rows: Vec<SensorRow>,
    outcome: BTreeMap<SensorKind, Result<usize, SensorUnavailable>>,
}

impl<'a, R: FullRepository + ?Sized> Aggregator<'a, R> {
    pub fn new(repo: &'a R, plan: &'a AnalysisPlan, animals: &'a [Animal]) -> Self {
        Self {
            repo,
            plan,
            animals,
            max_concurrent_chunks: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Number of chunks loaded at the same time; results keep chunk order.
    pub fn with_concurrency(mut self, max_concurrent_chunks: usize) -> Self {
        self.max_concurrent_chunks = max_concurrent_chunks.max(1);
        self
    }

    /// Token checked between chunks.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    // ==================== Events ====================

    /// Count and duration of one event per animal and bin.
    ///
    /// # Returns
    /// * `Err(AnalysisError::EmptyResult)` if no chunk holds a detection
    pub async fn event_table(&self, event_name: &str) -> AnalysisResult<MetricTable<EventRow>> {
        info!("Computing '{}' event table", event_name);
        let chunks = self
            .run_chunks(event_name, |chunk| self.event_chunk(chunk, event_name))
            .await?;

        let table = MetricTable::from_chunks(chunks);
        if table.is_empty() {
            return Err(AnalysisError::EmptyResult(format!(
                "No detection data for event '{}' in the analysed range",
                event_name
            )));
        }
        Ok(table)
    }

    async fn event_chunk(&self, chunk: &Chunk, event_name: &str) -> AnalysisResult<Vec<EventRow>> {
        if !self.has_detections(chunk).await? {
            return Ok(Vec::new());
        }

        let timelines = timelines_by_animal(self.load_events(event_name, chunk).await?);

        let clock = self.plan.clock();
        let mut rows = Vec::with_capacity(self.animals.len() * chunk.len());
        for animal in self.animals {
            let timeline = for_animal(&timelines, animal.id);
            for bin in &chunk.bins {
                let tally = EventTally::from_timeline(timeline, bin.start_frame, bin.end_frame);
                rows.push(EventRow {
                    rfid: animal.rfid.clone(),
                    animal_id: animal.id,
                    event: event_name.to_string(),
                    start_frame: bin.start_frame,
                    end_frame: bin.end_frame,
                    start_time: bin.start_time,
                    end_time: bin.end_time,
                    event_count: tally.count,
                    frame_count: tally.total_duration_frames,
                    duration: clock.frames_to_minutes(tally.total_duration_frames),
                });
            }
        }
        Ok(rows)
    }

    // ==================== Activity ====================

    /// Distance, speed and stop/move/undetected durations per animal and bin.
    ///
    /// # Returns
    /// * `Err(AnalysisError::EmptyResult)` if no chunk holds a detection
    pub async fn activity_table(
        &self,
        settings: &ActivitySettings,
    ) -> AnalysisResult<MetricTable<ActivityRow>> {
        info!("Computing activity table");
        let chunks = self
            .run_chunks("activity", |chunk| self.activity_chunk(chunk, settings))
            .await?;

        let table = MetricTable::from_chunks(chunks);
        if table.is_empty() {
            return Err(AnalysisError::EmptyResult(
                "No detection data in the analysed range".to_string(),
            ));
        }
        Ok(table)
    }

    async fn activity_chunk(
        &self,
        chunk: &Chunk,
        settings: &ActivitySettings,
    ) -> AnalysisResult<Vec<ActivityRow>> {
        // One frame earlier so the first step of the chunk has its origin.
        let detections = self
            .repo
            .fetch_detections(chunk.start_frame - 1, chunk.end_frame)
            .await?;
        if !detections.iter().any(|d| d.frame >= chunk.start_frame) {
            debug!(
                "No detections in chunk [{}, {}]",
                chunk.start_frame, chunk.end_frame
            );
            return Ok(Vec::new());
        }
        let tracks = tracks_by_animal(detections);

        let stops = timelines_by_animal(self.load_events(&settings.stop_event, chunk).await?);
        let mut moves = Vec::with_capacity(settings.move_events.len());
        for name in &settings.move_events {
            moves.push(timelines_by_animal(self.load_events(name, chunk).await?));
        }
        let mut excluded: Vec<EventInterval> = Vec::new();
        for name in &settings.excluded_events {
            excluded.extend(self.load_events(name, chunk).await?);
        }
        let excluded = timelines_by_animal(excluded);

        let clock = self.plan.clock();
        let mut rows = Vec::with_capacity(self.animals.len() * chunk.len());
        for animal in self.animals {
            let track = for_animal(&tracks, animal.id);
            let excluded = for_animal(&excluded, animal.id);
            let stop_timeline = for_animal(&stops, animal.id);

            for bin in &chunk.bins {
                let motion = locomotion(
                    track,
                    excluded,
                    bin.start_frame,
                    bin.end_frame,
                    settings.cm_per_pixel,
                    clock.sampling_rate_hz(),
                );
                let stop = EventTally::from_timeline(stop_timeline, bin.start_frame, bin.end_frame);
                let move_frames: i64 = moves
                    .iter()
                    .map(|timelines| {
                        EventTally::from_timeline(
                            for_animal(timelines, animal.id),
                            bin.start_frame,
                            bin.end_frame,
                        )
                        .total_duration_frames
                    })
                    .sum();
                let undetected = undetected_frames(
                    bin.span(),
                    stop.total_duration_frames,
                    move_frames,
                    &animal.rfid,
                );

                rows.push(ActivityRow {
                    rfid: animal.rfid.clone(),
                    animal_id: animal.id,
                    start_frame: bin.start_frame,
                    end_frame: bin.end_frame,
                    start_time: bin.start_time,
                    end_time: bin.end_time,
                    distance: motion.distance,
                    speed_mean: motion.speed.map(|m| m.mean),
                    speed_std: motion.speed.map(|m| m.std),
                    speed_min: motion.speed.map(|m| m.min),
                    speed_max: motion.speed.map(|m| m.max),
                    speed_sum: motion.speed.map_or(0.0, |m| m.sum),
                    stop_count: stop.count,
                    stop_duration: clock.frames_to_minutes(stop.total_duration_frames),
                    move_duration: clock.frames_to_minutes(move_frames),
                    undetected_duration: clock.frames_to_minutes(undetected),
                });
            }
        }
        Ok(rows)
    }

    // ==================== Sensors ====================

    /// Cage sensor statistics per bin.
    ///
    /// Never fails on missing sensors: a sensor that is absent or unreadable
    /// is reported as not available and left out of the rows.
    pub async fn sensor_table(&self, sensors: &[SensorKind]) -> AnalysisResult<SensorTable> {
        info!("Computing sensor table for {} sensor(s)", sensors.len());
        let chunks = self
            .run_chunks("sensors", |chunk| self.sensor_chunk(chunk, sensors))
            .await?;

        let mut samples: BTreeMap<SensorKind, usize> = BTreeMap::new();
        let mut failures: HashMap<SensorKind, String> = HashMap::new();
        let mut rows = Vec::new();
        for chunk in chunks {
            for (sensor, outcome) in chunk.outcome {
                match outcome {
                    Ok(count) => *samples.entry(sensor).or_default() += count,
                    Err(unavailable) => {
                        failures.entry(sensor).or_insert(unavailable.reason);
                    }
                }
            }
            rows.extend(chunk.rows);
        }

        let mut availability = BTreeMap::new();
        for &sensor in sensors {
            let status = match (failures.remove(&sensor), samples.get(&sensor).copied()) {
                (Some(reason), _) => SensorAvailability::NotAvailable { reason },
                (None, Some(count)) if count > 0 => SensorAvailability::Available { samples: count },
                (None, _) => SensorAvailability::NotAvailable {
                    reason: "no readings in the analysed range".to_string(),
                },
            };
            if let SensorAvailability::NotAvailable { reason } = &status {
                warn!("Sensor {} not available: {}", sensor, reason);
            }
            availability.insert(sensor, status);
        }

        // A sensor that failed in any chunk is dropped everywhere.
        for row in rows.iter_mut() {
            row.readings.retain(|sensor, _| {
                matches!(
                    availability.get(sensor),
                    Some(SensorAvailability::Available { .. })
                )
            });
        }
        rows.retain(|row| !row.readings.is_empty());

        Ok(SensorTable { rows, availability })
    }

    async fn sensor_chunk(&self, chunk: &Chunk, sensors: &[SensorKind]) -> AnalysisResult<SensorChunk> {
        let mut loaded: BTreeMap<SensorKind, Result<Vec<SensorSample>, SensorUnavailable>> =
            BTreeMap::new();
        for &sensor in sensors {
            let result = match self
                .repo
                .fetch_sensor_samples(sensor, chunk.start_frame, chunk.end_frame)
                .await
            {
                Ok(samples) => Ok(samples),
                Err(e) if e.is_data_unavailable() => Err(SensorUnavailable {
                    sensor,
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e.into()),
            };
            loaded.insert(sensor, result);
        }

        let rows = chunk
            .bins
            .iter()
            .filter_map(|bin| sensor_row(bin, &loaded))
            .collect();
        let outcome = loaded
            .into_iter()
            .map(|(sensor, result)| (sensor, result.map(|samples| samples.len())))
            .collect();

        Ok(SensorChunk { rows, outcome })
    }

    // ==================== Chunk driver ====================

    /// Run `load` over every chunk, keeping chunk order.
    ///
    /// Up to `max_concurrent_chunks` chunks are in flight. The cancellation
    /// token is checked before each chunk result is awaited.
    async fn run_chunks<T, F, Fut>(&self, family: &str, load: F) -> AnalysisResult<Vec<T>>
    where
        F: FnMut(&'a Chunk) -> Fut,
        Fut: Future<Output = AnalysisResult<T>>,
    {
        let chunks = self.plan.chunks().chunks();
        let total = chunks.len();
        let mut results = Vec::with_capacity(total);

        let mut pending = stream::iter(chunks)
            .map(load)
            .buffered(self.max_concurrent_chunks);

        while results.len() < total {
            if self.cancel.is_cancelled() {
                warn!(
                    "{}: cancelled after {} of {} chunks",
                    family,
                    results.len(),
                    total
                );
                return Err(AnalysisError::Cancelled {
                    completed: results.len(),
                    total,
                });
            }
            match pending.next().await {
                Some(result) => results.push(result?),
                None => break,
            }
            debug!("{}: chunk {}/{} done", family, results.len(), total);
        }

        Ok(results)
    }

    async fn has_detections(&self, chunk: &Chunk) -> AnalysisResult<bool> {
        let count = self
            .repo
            .count_detections(chunk.start_frame, chunk.end_frame)
            .await?;
        if count == 0 {
            debug!(
                "No detections in chunk [{}, {}]",
                chunk.start_frame, chunk.end_frame
            );
        }
        Ok(count > 0)
    }

    /// Intervals overlapping the chunk, plus those ending on the frame before it.
    async fn load_events(&self, name: &str, chunk: &Chunk) -> AnalysisResult<Vec<EventInterval>> {
        // An interval adjacent to the chunk start merges with its predecessor,
        // so it is not counted again as an onset of this chunk.
        Ok(self
            .repo
            .fetch_events(name, chunk.start_frame - 1, chunk.end_frame)
            .await?)
    }
}

fn sensor_row(
    bin: &Bin,
    loaded: &BTreeMap<SensorKind, Result<Vec<SensorSample>, SensorUnavailable>>,
) -> Option<SensorRow> {
    let readings: BTreeMap<_, _> = loaded
        .iter()
        .filter_map(|(sensor, samples)| {
            let samples = samples.as_ref().ok()?;
            sensor_stats(samples, bin.start_frame, bin.end_frame).map(|stats| (*sensor, stats))
        })
        .collect();

    if readings.is_empty() {
        return None;
    }
    Some(SensorRow {
        start_frame: bin.start_frame,
        end_frame: bin.end_frame,
        start_time: bin.start_time,
        end_time: bin.end_time,
        readings,
    })
}
