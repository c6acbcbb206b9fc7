//! End-to-end tests over an LMT SQLite database file.
//!
//! ```bash
//! cargo test --test sqlite_repository_tests
//! ```

#![cfg(feature = "sqlite-repo")]

use std::path::Path;

use lmt_rust::config::AnalysisConfig;
use lmt_rust::db::{FullRepository, RepositoryFactory};
use lmt_rust::models::{SensorAvailability, SensorKind};
use lmt_rust::services::AnalysisSession;
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// 2026-01-01T00:00:00Z, the timestamp of frame 0.
const START_MS: i64 = 1_767_225_600_000;
const LAST_FRAME: i64 = 3_600;

/// Two minutes at 30 fps, one moving animal and one unnamed animal.
fn create_database(path: &Path) {
    let mut conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE FRAME (FRAMENUMBER INTEGER PRIMARY KEY, TIMESTAMP INTEGER, \
             TEMPERATURE REAL, HUMIDITY REAL);
         CREATE TABLE ANIMAL (ID INTEGER PRIMARY KEY, RFID TEXT, NAME TEXT, GENOTYPE TEXT);
         CREATE TABLE DETECTION (ID INTEGER PRIMARY KEY, FRAMENUMBER INTEGER, \
             ANIMALID INTEGER, MASS_X REAL, MASS_Y REAL);
         CREATE TABLE EVENT (ID INTEGER PRIMARY KEY, NAME TEXT, STARTFRAME INTEGER, \
             ENDFRAME INTEGER, IDANIMALA INTEGER);
         INSERT INTO ANIMAL VALUES (1, '000042', 'Ares', 'WT');
         INSERT INTO ANIMAL VALUES (2, NULL, NULL, NULL);
         INSERT INTO EVENT (NAME, STARTFRAME, ENDFRAME, IDANIMALA) VALUES ('Stop', 100, 199, 1);
         INSERT INTO EVENT (NAME, STARTFRAME, ENDFRAME, IDANIMALA) VALUES ('Stop', 1790, 1809, 2);",
    )
    .unwrap();

    let tx = conn.transaction().unwrap();
    {
        let mut frames = tx
            .prepare("INSERT INTO FRAME VALUES (?1, ?2, ?3, NULL)")
            .unwrap();
        for frame in 1..=LAST_FRAME {
            let timestamp = START_MS + (frame as f64 * 1000.0 / 30.0).round() as i64;
            let temperature = if frame <= 1_799 { 21.0 } else { 23.0 };
            frames.execute(params![frame, timestamp, temperature]).unwrap();
        }

        let mut detections = tx
            .prepare(
                "INSERT INTO DETECTION (FRAMENUMBER, ANIMALID, MASS_X, MASS_Y) \
                 VALUES (?1, ?2, ?3, 0.0)",
            )
            .unwrap();
        for (k, frame) in (10..15).enumerate() {
            detections.execute(params![frame, 1, 57.0 * k as f64]).unwrap();
        }
        detections.execute(params![2_000, 2, 0.0]).unwrap();
    }
    tx.commit().unwrap();
}

fn config_for(path: &Path) -> AnalysisConfig {
    let content = format!(
        r#"
[binning]
bin_minutes = 1

[events]
names = ["Stop"]

[repository]
type = "sqlite"
path = "{}"
"#,
        path.display()
    );
    AnalysisConfig::from_toml_str(&content).unwrap()
}

async fn open_session(dir: &TempDir) -> AnalysisSession<dyn FullRepository> {
    let path = dir.path().join("cage.sqlite");
    create_database(&path);
    let config = config_for(&path);
    let repository = RepositoryFactory::create(&config.repository).unwrap();
    AnalysisSession::open(repository, config.to_settings().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_session_over_database_file() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    assert_eq!(session.recording().frame, LAST_FRAME);
    assert_eq!(session.animals().len(), 2);
    assert_eq!(session.animals()[1].rfid, "animal-2");

    let bins = session.bins();
    assert_eq!(bins.len(), 2);
    assert_eq!((bins[0].start_frame, bins[0].end_frame), (1, 1_799));
    assert_eq!((bins[1].start_frame, bins[1].end_frame), (1_800, LAST_FRAME));
    assert_eq!(session.count_frames().await.unwrap(), LAST_FRAME as u64);
}

#[tokio::test]
async fn test_event_and_activity_tables_from_database() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    let stops = session.process_events("Stop").await.unwrap();
    assert_eq!(stops.len(), 4);
    assert_eq!(stops.rfid_categories, vec!["000042", "animal-2"]);
    let unnamed: Vec<_> = stops.rows_for("animal-2").collect();
    assert_eq!((unnamed[0].event_count, unnamed[0].frame_count), (1, 10));
    assert_eq!((unnamed[1].event_count, unnamed[1].frame_count), (0, 10));

    let activity = session.process_activity().await.unwrap();
    let ares: Vec<_> = activity.rows_for("000042").collect();
    assert!((ares[0].distance.value() - 40.0).abs() < 1e-9);
    assert_eq!(ares[1].distance.value(), 0.0);
    assert_eq!(ares[0].stop_count, 1);
}

#[tokio::test]
async fn test_sensor_availability_from_database() {
    let dir = TempDir::new().unwrap();
    let session = open_session(&dir).await;

    let sensors = session.process_sensors().await.unwrap();
    assert_eq!(sensors.available_sensors(), vec![SensorKind::Temperature]);
    // Column present but empty.
    assert!(matches!(
        sensors.availability.get(&SensorKind::Humidity),
        Some(SensorAvailability::NotAvailable { .. })
    ));
    // Column missing from the schema.
    assert!(!sensors.is_available(SensorKind::Sound));

    assert_eq!(sensors.rows.len(), 2);
    assert_eq!(sensors.rows[0].readings[&SensorKind::Temperature].mean, 21.0);
    assert_eq!(sensors.rows[1].readings[&SensorKind::Temperature].mean, 23.0);
}
