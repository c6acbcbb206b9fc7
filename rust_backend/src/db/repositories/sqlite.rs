//! Repository over an LMT SQLite database.
//!
//! Reads the `FRAME`, `ANIMAL`, `DETECTION` and `EVENT` tables written by the
//! Live Mouse Tracker. The database is opened read-only; every query runs on
//! the blocking thread pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::db::repository::*;
use crate::models::{
    Animal, Detection, EventInterval, FrameStamp, SensorKind, SensorSample,
};

/// LMT database repository.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open an LMT database file read-only.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConnectionError)` - If the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            RepositoryError::ConnectionError(format!(
                "Failed to open LMT database {}: {}",
                path.display(),
                e
            ))
        })?;

        log::info!("Opened LMT database {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a query on the blocking pool.
    async fn run<T, F>(&self, query: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| {
                RepositoryError::InternalError("SQLite connection lock poisoned".to_string())
            })?;
            query(&guard).map_err(RepositoryError::from)
        })
        .await
        .map_err(|e| RepositoryError::InternalError(format!("SQLite task failed: {}", e)))?
    }
}

#[async_trait]
impl FrameRepository for SqliteRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.run(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(|one| one == 1)
    }

    async fn last_frame(&self) -> RepositoryResult<Option<FrameStamp>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT FRAMENUMBER, TIMESTAMP FROM FRAME ORDER BY FRAMENUMBER DESC LIMIT 1",
                [],
                |row| {
                    Ok(FrameStamp {
                        frame: row.get(0)?,
                        timestamp_ms: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn count_frames(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64> {
        let count: i64 = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM FRAME WHERE FRAMENUMBER BETWEEN ?1 AND ?2",
                    params![frame_min, frame_max],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_sensor_samples(
        &self,
        sensor: SensorKind,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<SensorSample>> {
        let sql = format!(
            "SELECT FRAMENUMBER, {column} FROM FRAME \
             WHERE FRAMENUMBER BETWEEN ?1 AND ?2 AND {column} IS NOT NULL \
             ORDER BY FRAMENUMBER",
            column = sensor.column()
        );
        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![frame_min, frame_max], |row| {
                Ok(SensorSample {
                    frame: row.get(0)?,
                    value: row.get(1)?,
                })
            })?;
            let samples = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
        .await
    }
}

#[async_trait]
impl AnimalRepository for SqliteRepository {
    async fn list_animals(&self) -> RepositoryResult<Vec<Animal>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT ID, RFID, NAME, GENOTYPE FROM ANIMAL ORDER BY ID")?;
            let rows = stmt.query_map([], |row| {
                let id: i64 = row.get(0)?;
                let rfid: Option<String> = row.get(1)?;
                Ok(Animal {
                    id,
                    rfid: rfid.unwrap_or_else(|| format!("animal-{}", id)),
                    name: row.get(2)?,
                    genotype: row.get(3)?,
                })
            })?;
            let animals = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(animals)
        })
        .await
    }

    async fn fetch_detections(
        &self,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<Detection>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT ANIMALID, FRAMENUMBER, MASS_X, MASS_Y FROM DETECTION \
                 WHERE FRAMENUMBER BETWEEN ?1 AND ?2 AND ANIMALID IS NOT NULL \
                 AND MASS_X IS NOT NULL AND MASS_Y IS NOT NULL \
                 ORDER BY ANIMALID, FRAMENUMBER",
            )?;
            let rows = stmt.query_map(params![frame_min, frame_max], |row| {
                Ok(Detection {
                    animal_id: row.get(0)?,
                    frame: row.get(1)?,
                    x: row.get(2)?,
                    y: row.get(3)?,
                })
            })?;
            let detections = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(detections)
        })
        .await
    }

    async fn count_detections(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64> {
        let count: i64 = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM DETECTION WHERE FRAMENUMBER BETWEEN ?1 AND ?2",
                    params![frame_min, frame_max],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl EventRepository for SqliteRepository {
    async fn fetch_events(
        &self,
        event_name: &str,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<EventInterval>> {
        let name = event_name.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT IDANIMALA, STARTFRAME, ENDFRAME FROM EVENT \
                 WHERE NAME = ?1 AND ENDFRAME >= ?2 AND STARTFRAME <= ?3 \
                 AND IDANIMALA IS NOT NULL \
                 ORDER BY IDANIMALA, STARTFRAME",
            )?;
            let rows = stmt.query_map(params![name, frame_min, frame_max], |row| {
                Ok(EventInterval {
                    animal_id: row.get(0)?,
                    start_frame: row.get(1)?,
                    end_frame: row.get(2)?,
                })
            })?;
            let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }
}
