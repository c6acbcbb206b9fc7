//! Event repository trait: behavioural event intervals.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{merge_timeline, EventInterval, EventTally};

/// Repository trait for the `EVENT` table.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Intervals of one event overlapping `[frame_min, frame_max]`.
    ///
    /// Intervals are returned unclipped, ordered by animal then start frame.
    ///
    /// # Arguments
    /// * `event_name` - Event name as stored in the recording (e.g. `"Stop"`)
    /// * `frame_min` - First frame, inclusive
    /// * `frame_max` - Last frame, inclusive
    async fn fetch_events(
        &self,
        event_name: &str,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<Vec<EventInterval>>;

    /// Count and duration of one event for one animal in `[frame_min, frame_max]`.
    ///
    /// Overlapping intervals are merged before counting.
    async fn event_tally(
        &self,
        event_name: &str,
        animal_id: i64,
        frame_min: i64,
        frame_max: i64,
    ) -> RepositoryResult<EventTally> {
        let own: Vec<EventInterval> = self
            .fetch_events(event_name, frame_min, frame_max)
            .await?
            .into_iter()
            .filter(|event| event.animal_id == animal_id)
            .collect();
        Ok(EventTally::from_timeline(
            &merge_timeline(own),
            frame_min,
            frame_max,
        ))
    }
}
