//! Time-binned behaviour analysis of Live Mouse Tracker recordings.
//!
//! A recording is split into calendar-aligned bins ([`binning::BinTable`]),
//! consecutive bins are grouped into memory-bounded chunks
//! ([`binning::ChunkPlan`]), and per-animal metric tables are computed chunk
//! by chunk ([`services::Aggregator`]). [`services::AnalysisSession`] ties the
//! pieces together over a repository ([`db`]).

pub mod binning;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time;

pub use error::{AnalysisError, AnalysisResult, SensorUnavailable};
