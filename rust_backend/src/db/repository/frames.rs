//! Frame repository trait: recording timeline and cage sensors.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{FrameStamp, SensorKind, SensorSample};

/// Repository trait for the `FRAME` table.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait FrameRepository: Send + Sync {
    /// Check if the repository is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Last recorded frame and its timestamp.
    ///
    /// # Returns
    /// * `Ok(None)` - If the recording holds no frame
    async fn last_frame(&self) -> RepositoryResult<Option<FrameStamp>>;

    /// Number of recorded frames in `[frame_min, frame_max]`.
    async fn count_frames(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64>;

    /// Readings of one cage sensor in `[frame_min, frame_max]`, ordered by frame.
    ///
    /// Frames without a reading are skipped.
    ///
    /// # Returns
    /// * `Err(RepositoryError::SchemaError | NotFound)` - If the recording
    ///   does not carry this sensor
    async fn fetch_sensor_samples(
        &self,
        sensor: SensorKind,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<SensorSample>>;
}
