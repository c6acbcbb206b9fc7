//! In-memory local repository implementation.
//!
//! Holds a whole recording in memory. Used by unit and integration tests
//! and for local development without an LMT database at hand.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::repository::*;
use crate::models::{
    Animal, Detection, EventInterval, FrameStamp, SensorKind, SensorSample,
};

/// In-memory local repository.
///
/// Clones share the same data. Every bulk load (detections, events,
/// sensor readings) is counted so tests can check how often a store is hit.
///
/// # Example
/// ```
/// use lmt_rust::db::repositories::LocalRepository;
/// use lmt_rust::models::{Animal, Detection};
///
/// let repo = LocalRepository::new();
/// repo.set_last_frame(1_000, 1_767_225_633_333);
/// repo.add_animal(Animal::new(1, "RFID-1"));
/// repo.add_detections([Detection { animal_id: 1, frame: 10, x: 100.0, y: 50.0 }]);
/// assert_eq!(repo.detection_count(), 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    loads: Arc<LoadCounters>,
}

struct LocalData {
    last_frame: Option<FrameStamp>,
    animals: Vec<Animal>,
    /// Sorted by (animal, frame).
    detections: Vec<Detection>,
    events: HashMap<String, Vec<EventInterval>>,
    sensors: HashMap<SensorKind, Vec<SensorSample>>,
    unreadable_sensors: HashSet<SensorKind>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            last_frame: None,
            animals: Vec::new(),
            detections: Vec::new(),
            events: HashMap::new(),
            sensors: HashMap::new(),
            unreadable_sensors: HashSet::new(),
            is_healthy: true,
        }
    }
}

#[derive(Default)]
struct LoadCounters {
    detections: AtomicUsize,
    events: AtomicUsize,
    sensors: AtomicUsize,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
            loads: Arc::new(LoadCounters::default()),
        }
    }

    // ==================== Setup ====================

    /// Set the last frame of the recording and its timestamp in milliseconds.
    pub fn set_last_frame(&self, frame: i64, timestamp_ms: i64) {
        self.write().last_frame = Some(FrameStamp {
            frame,
            timestamp_ms,
        });
    }

    pub fn add_animal(&self, animal: Animal) {
        let mut data = self.write();
        data.animals.push(animal);
        data.animals.sort_by_key(|a| a.id);
    }

    /// Add detections; they may be given in any order.
    pub fn add_detections(&self, detections: impl IntoIterator<Item = Detection>) {
        let mut data = self.write();
        data.detections.extend(detections);
        data.detections.sort_by_key(|d| (d.animal_id, d.frame));
    }

    /// Add intervals of the event called `event_name`.
    pub fn add_events(&self, event_name: &str, events: impl IntoIterator<Item = EventInterval>) {
        let mut data = self.write();
        let stored = data.events.entry(event_name.to_string()).or_default();
        stored.extend(events);
        stored.sort_by_key(|e| (e.animal_id, e.start_frame));
    }

    /// Add readings of one sensor; the sensor becomes present in the recording.
    pub fn add_sensor_samples(
        &self,
        sensor: SensorKind,
        samples: impl IntoIterator<Item = SensorSample>,
    ) {
        let mut data = self.write();
        let stored = data.sensors.entry(sensor).or_default();
        stored.extend(samples);
        stored.sort_by_key(|s| s.frame);
    }

    /// Make reads of a sensor fail as a corrupted column would.
    pub fn mark_sensor_unreadable(&self, sensor: SensorKind) {
        self.write().unreadable_sensors.insert(sensor);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    // ==================== Inspection ====================

    pub fn detection_count(&self) -> usize {
        self.read().detections.len()
    }

    /// Number of `fetch_detections` calls served.
    pub fn detection_loads(&self) -> usize {
        self.loads.detections.load(Ordering::SeqCst)
    }

    /// Number of `fetch_events` calls served.
    pub fn event_loads(&self) -> usize {
        self.loads.events.load(Ordering::SeqCst)
    }

    /// Number of `fetch_sensor_samples` calls served.
    pub fn sensor_loads(&self) -> usize {
        self.loads.sensors.load(Ordering::SeqCst)
    }

    // ==================== Helpers ====================

    fn read(&self) -> RwLockReadGuard<'_, LocalData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read access for trait methods, failing when marked unhealthy.
    fn checked(&self) -> RepositoryResult<RwLockReadGuard<'_, LocalData>> {
        let data = self.data.read().map_err(|_| {
            RepositoryError::InternalError("Local repository lock poisoned".to_string())
        })?;
        if !data.is_healthy {
            return Err(RepositoryError::ConnectionError(
                "Database is not healthy".to_string(),
            ));
        }
        Ok(data)
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.read().is_healthy)
    }

    async fn last_frame(&self) -> RepositoryResult<Option<FrameStamp>> {
        Ok(self.checked()?.last_frame)
    }

    async fn count_frames(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64> {
        // Frames 1..=last are all present.
        let last = self.checked()?.last_frame.map_or(0, |stamp| stamp.frame);
        Ok((frame_max.min(last) - frame_min.max(1) + 1).max(0) as u64)
    }

    async fn fetch_sensor_samples(
        &self,
        sensor: SensorKind,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<SensorSample>> {
        let data = self.checked()?;
        self.loads.sensors.fetch_add(1, Ordering::SeqCst);

        if data.unreadable_sensors.contains(&sensor) {
            return Err(RepositoryError::QueryError(format!(
                "Column {} could not be read",
                sensor.column()
            )));
        }
        let samples = data.sensors.get(&sensor).ok_or_else(|| {
            RepositoryError::NotFound(format!("Sensor {} not recorded", sensor.column()))
        })?;

        Ok(samples
            .iter()
            .filter(|s| s.frame >= frame_min && s.frame <= frame_max)
            .copied()
            .collect())
    }
}

#[async_trait]
impl AnimalRepository for LocalRepository {
    async fn list_animals(&self) -> RepositoryResult<Vec<Animal>> {
        Ok(self.checked()?.animals.clone())
    }

    async fn fetch_detections(
        &self,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<Detection>> {
        let data = self.checked()?;
        self.loads.detections.fetch_add(1, Ordering::SeqCst);

        Ok(data
            .detections
            .iter()
            .filter(|d| d.frame >= frame_min && d.frame <= frame_max)
            .copied()
            .collect())
    }

    async fn count_detections(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64> {
        let data = self.checked()?;
        Ok(data
            .detections
            .iter()
            .filter(|d| d.frame >= frame_min && d.frame <= frame_max)
            .count() as u64)
    }
}

#[async_trait]
impl EventRepository for LocalRepository {
    async fn fetch_events(
        &self,
        event_name: &str,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<EventInterval>> {
        let data = self.checked()?;
        self.loads.events.fetch_add(1, Ordering::SeqCst);

        Ok(data
            .events
            .get(event_name)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.intersects(frame_min, frame_max))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(animal_id: i64, frame: i64) -> Detection {
        Detection {
            animal_id,
            frame,
            x: 0.0,
            y: 0.0,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let result = repo.list_animals().await;
        assert!(matches!(result, Err(RepositoryError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_empty_recording_has_no_last_frame() {
        let repo = LocalRepository::new();
        assert_eq!(repo.last_frame().await.unwrap(), None);

        repo.set_last_frame(42, 1_000);
        assert_eq!(
            repo.last_frame().await.unwrap(),
            Some(FrameStamp {
                frame: 42,
                timestamp_ms: 1_000
            })
        );
        assert_eq!(repo.count_frames(40, 100).await.unwrap(), 3);
        assert_eq!(repo.count_frames(50, 100).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_detections_filtered_and_sorted() {
        let repo = LocalRepository::new();
        repo.add_detections([detection(2, 5), detection(1, 7), detection(1, 3), detection(1, 20)]);

        let detections = repo.fetch_detections(1, 10).await.unwrap();
        let keys: Vec<(i64, i64)> = detections.iter().map(|d| (d.animal_id, d.frame)).collect();
        assert_eq!(keys, vec![(1, 3), (1, 7), (2, 5)]);
        assert_eq!(repo.count_detections(4, 20).await.unwrap(), 3);
        assert_eq!(repo.detection_loads(), 1);
    }

    #[tokio::test]
    async fn test_events_overlapping_range() {
        let repo = LocalRepository::new();
        repo.add_events(
            "Stop",
            [
                EventInterval::new(1, 1, 9),
                EventInterval::new(1, 8, 15),
                EventInterval::new(2, 30, 40),
            ],
        );

        let events = repo.fetch_events("Stop", 10, 35).await.unwrap();
        assert_eq!(
            events,
            vec![EventInterval::new(1, 8, 15), EventInterval::new(2, 30, 40)]
        );
        assert!(repo.fetch_events("Huddling", 1, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_tally_merges_overlaps() {
        let repo = LocalRepository::new();
        repo.add_events(
            "Stop",
            [EventInterval::new(1, 10, 20), EventInterval::new(1, 15, 25)],
        );

        let tally = repo.event_tally("Stop", 1, 1, 100).await.unwrap();
        assert_eq!(tally.count, 1);
        assert_eq!(tally.total_duration_frames, 16);
    }

    #[tokio::test]
    async fn test_missing_and_unreadable_sensors() {
        let repo = LocalRepository::new();
        repo.add_sensor_samples(SensorKind::Temperature, [SensorSample { frame: 1, value: 21.5 }]);
        repo.add_sensor_samples(SensorKind::Sound, [SensorSample { frame: 1, value: 40.0 }]);
        repo.mark_sensor_unreadable(SensorKind::Sound);

        assert_eq!(
            repo.fetch_sensor_samples(SensorKind::Temperature, 1, 10)
                .await
                .unwrap()
                .len(),
            1
        );
        let missing = repo.fetch_sensor_samples(SensorKind::Humidity, 1, 10).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
        let unreadable = repo.fetch_sensor_samples(SensorKind::Sound, 1, 10).await;
        assert!(matches!(unreadable, Err(RepositoryError::QueryError(_))));
    }

    #[tokio::test]
    async fn test_clear_keeps_health() {
        let repo = LocalRepository::new();
        repo.add_animal(Animal::new(1, "A"));
        repo.set_healthy(false);
        repo.clear();

        repo.set_healthy(true);
        assert!(repo.list_animals().await.unwrap().is_empty());
    }
}
