//! Calendar-aligned binning and chunk planning.
//!
//! - [`BinTable`] splits a recording into bins whose edges fall on round
//!   wall-clock times.
//! - [`ChunkPlan`] groups consecutive bins into chunks bounded by the
//!   processing window.
//! - [`AnalysisPlan`] resolves both from the settings and the recording.

pub mod bins;
pub mod chunks;
pub mod plan;


pub use bins::{AnalysisWindow, Bin, BinEdge, BinTable};
pub use chunks::{Chunk, ChunkPlan};
pub use plan::AnalysisPlan;
