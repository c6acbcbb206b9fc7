//! Animal repository trait: tracked animals and their detections.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Animal, Detection};

/// Repository trait for the `ANIMAL` and `DETECTION` tables.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AnimalRepository: Send + Sync {
    /// All animals of the recording, ordered by id.
    async fn list_animals(&self) -> RepositoryResult<Vec<Animal>>;

    /// Detections in `[frame_min, frame_max]`, ordered by animal then frame.
    ///
    /// # Arguments
    /// * `frame_min` - First frame, inclusive
    /// * `frame_max` - Last frame, inclusive
    async fn fetch_detections(
        &self,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<Detection>>;

    /// Number of detections in `[frame_min, frame_max]`.
    async fn count_detections(&self, frame_min: i64, frame_max: i64) -> RepositoryResult<u64>;
}
