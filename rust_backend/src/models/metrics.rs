//! Per-bin result rows and the tables that collect them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use qtty::length::Centimeters;
use qtty::time::Minutes;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::recording::SensorKind;

/// Summary statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    /// Sample standard deviation; `0.0` below two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Moments {
    /// Compute the moments of `values`, or `None` when empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let std = if count < 2 {
            0.0
        } else {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            sum,
            mean,
            std,
            min,
            max,
        })
    }

    /// Standard error of the mean.
    pub fn sem(&self) -> f64 {
        self.std / (self.count as f64).sqrt()
    }
}

/// Per-sensor statistics of a bin.
pub type SensorStats = Moments;

/// Row type tied to one animal.
pub trait AnimalRow {
    fn rfid(&self) -> &str;
}

// ==================== Event rows ====================

/// Occurrences of one behavioural event for one animal in one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EventRow {
    pub rfid: String,
    #[serde(rename = "ANIMALID")]
    pub animal_id: i64,
    pub event: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Events starting inside the bin.
    pub event_count: u64,
    /// Frames of the bin covered by the event.
    pub frame_count: i64,
    pub duration: Minutes,
}

impl AnimalRow for EventRow {
    fn rfid(&self) -> &str {
        &self.rfid
    }
}

// ==================== Activity rows ====================

/// Locomotion summary of one animal in one bin.
///
/// Speed statistics are `None` when no consecutive detections fall in the bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ActivityRow {
    pub rfid: String,
    #[serde(rename = "ANIMALID")]
    pub animal_id: i64,
    pub start_frame: i64,
    pub end_frame: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub distance: Centimeters,
    pub speed_mean: Option<f64>,
    pub speed_std: Option<f64>,
    pub speed_min: Option<f64>,
    pub speed_max: Option<f64>,
    pub speed_sum: f64,
    pub stop_count: u64,
    pub stop_duration: Minutes,
    pub move_duration: Minutes,
    pub undetected_duration: Minutes,
}

impl AnimalRow for ActivityRow {
    fn rfid(&self) -> &str {
        &self.rfid
    }
}

// ==================== Tables ====================

/// Rows of one metric family, ordered by animal then time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable<R> {
    pub rows: Vec<R>,
    /// Sorted distinct RFIDs; row order follows this order.
    pub rfid_categories: Vec<String>,
}

impl<R: AnimalRow> MetricTable<R> {
    /// Concatenate per-chunk rows and order them by animal.
    ///
    /// The sort is stable, so rows of one animal keep their chunk order.
    pub fn from_chunks(chunks: Vec<Vec<R>>) -> Self {
        let mut rows: Vec<R> = chunks.into_iter().flatten().collect();

        let mut rfid_categories: Vec<String> =
            rows.iter().map(|row| row.rfid().to_string()).collect();
        rfid_categories.sort();
        rfid_categories.dedup();

        rows.sort_by_key(|row| {
            rfid_categories
                .binary_search_by(|category| category.as_str().cmp(row.rfid()))
                .unwrap_or(usize::MAX)
        });

        Self {
            rows,
            rfid_categories,
        }
    }

    /// Rows of one animal, in time order.
    pub fn rows_for<'a>(&'a self, rfid: &'a str) -> impl Iterator<Item = &'a R> + 'a {
        self.rows.iter().filter(move |row| row.rfid() == rfid)
    }
}

impl<R> MetricTable<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R: Serialize> MetricTable<R> {
    /// Rows as column-name → value records.
    pub fn to_records(&self) -> serde_json::Result<Vec<Map<String, Value>>> {
        self.rows.iter().map(to_record).collect()
    }

    /// Column names in first-seen order.
    pub fn column_names(&self) -> serde_json::Result<Vec<String>> {
        Ok(column_names(&self.to_records()?))
    }
}

// ==================== Sensor rows ====================

/// Cage sensor statistics in one bin.
///
/// Serialized flat: one `<SENSOR>_<STAT>` column per available sensor and
/// statistic. Sensors with no reading in the bin have no columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub start_frame: i64,
    pub end_frame: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub readings: BTreeMap<SensorKind, SensorStats>,
}

impl Serialize for SensorRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + 5 * self.readings.len()))?;
        map.serialize_entry("START_FRAME", &self.start_frame)?;
        map.serialize_entry("END_FRAME", &self.end_frame)?;
        map.serialize_entry("START_TIME", &self.start_time)?;
        map.serialize_entry("END_TIME", &self.end_time)?;
        for (sensor, moments) in &self.readings {
            let column = sensor.column();
            map.serialize_entry(&format!("{}_MEAN", column), &moments.mean)?;
            map.serialize_entry(&format!("{}_MIN", column), &moments.min)?;
            map.serialize_entry(&format!("{}_MAX", column), &moments.max)?;
            map.serialize_entry(&format!("{}_STD", column), &moments.std)?;
            map.serialize_entry(&format!("{}_SEM", column), &moments.sem())?;
        }
        map.end()
    }
}

/// Whether a sensor contributed to a sensor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensorAvailability {
    Available { samples: usize },
    NotAvailable { reason: String },
}

/// Sensor rows plus the availability of every requested sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorTable {
    pub rows: Vec<SensorRow>,
    pub availability: BTreeMap<SensorKind, SensorAvailability>,
}

impl SensorTable {
    pub fn is_available(&self, sensor: SensorKind) -> bool {
        matches!(
            self.availability.get(&sensor),
            Some(SensorAvailability::Available { .. })
        )
    }

    pub fn available_sensors(&self) -> Vec<SensorKind> {
        self.availability
            .keys()
            .copied()
            .filter(|sensor| self.is_available(*sensor))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_records(&self) -> serde_json::Result<Vec<Map<String, Value>>> {
        self.rows.iter().map(to_record).collect()
    }

    pub fn column_names(&self) -> serde_json::Result<Vec<String>> {
        Ok(column_names(&self.to_records()?))
    }
}

fn to_record<T: Serialize>(row: &T) -> serde_json::Result<Map<String, Value>> {
    match serde_json::to_value(row)? {
        Value::Object(map) => Ok(map),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "row did not serialize to an object: {}",
            other
        ))),
    }
}

fn column_names(records: &[Map<String, Value>]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|record| record.keys()) {
        if !names.contains(key) {
            names.push(key.clone());
        }
    }
    names
}
