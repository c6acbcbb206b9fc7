//! Error types for binning and aggregation.
//!
//! Configuration problems are raised before any chunk is processed. Data store
//! failures are carried unchanged inside [`AnalysisError::DataStore`].

use crate::db::repository::RepositoryError;
use crate::models::SensorKind;

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type for clock, planning and aggregation operations
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Data store error: {0}")]
    DataStore(#[from] RepositoryError),

    #[error("Analysis cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },
}

impl AnalysisError {
    /// Shorthand used by the validation code paths.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidConfiguration(message.into())
    }
}

/// A cage sensor that could not be read for the analysed range.
///
/// Not fatal: the sensor is left out of the sensor table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Sensor {sensor} not available: {reason}")]
pub struct SensorUnavailable {
    pub sensor: SensorKind,
    pub reason: String,
}
