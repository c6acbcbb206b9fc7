//! Grouping of consecutive bins into processing chunks.
//!
//! A chunk is the unit of data loading: one query per chunk and table
//! family, so the memory held at any time is bounded by the processing
//! window instead of the recording length.

use serde::Serialize;

use super::bins::Bin;
use crate::error::{AnalysisError, AnalysisResult};
use crate::time::Clock;

/// Consecutive bins processed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub bins: Vec<Bin>,
    /// First usable frame of the first bin.
    pub start_frame: i64,
    /// Last usable frame of the last bin.
    pub end_frame: i64,
}

impl Chunk {
    fn open(bin: Bin) -> Self {
        Self {
            start_frame: bin.start_frame,
            end_frame: bin.end_frame,
            bins: vec![bin],
        }
    }

    fn push(&mut self, bin: Bin) {
        self.end_frame = bin.end_frame;
        self.bins.push(bin);
    }

    fn calendar_start_frame(&self) -> i64 {
        self.bins
            .first()
            .map(|bin| bin.calendar_start_frame)
            .unwrap_or(self.start_frame)
    }

    /// Usable frames covered by the chunk.
    pub fn span(&self) -> i64 {
        self.end_frame - self.start_frame + 1
    }

    /// Frames between the aligned edges of the first and last bin.
    pub fn calendar_span(&self) -> i64 {
        let end = self
            .bins
            .last()
            .map(|bin| bin.calendar_end_frame)
            .unwrap_or(self.end_frame);
        end - self.calendar_start_frame() + 1
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Ordered list of chunks covering a bin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkPlan {
    max_chunk_frames: i64,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Check a processing window against the clock and bin size.
    ///
    /// The window must hold at least one hour of frames and at least one bin.
    pub fn validate_window(
        clock: &Clock,
        max_chunk_frames: i64,
        bin_duration_frames: i64,
    ) -> AnalysisResult<()> {
        if max_chunk_frames < clock.frames_per_hour() {
            return Err(AnalysisError::invalid(format!(
                "Processing window must be at least 1 hour ({} frames), got {}",
                clock.frames_per_hour(),
                max_chunk_frames
            )));
        }
        if max_chunk_frames < bin_duration_frames {
            return Err(AnalysisError::invalid(format!(
                "Processing window ({} frames) is shorter than one bin ({} frames)",
                max_chunk_frames, bin_duration_frames
            )));
        }
        Ok(())
    }

    /// Greedily pack bins into chunks.
    ///
    /// A bin joins the current chunk while the calendar span from the
    /// chunk's first edge to the bin's end edge stays within
    /// `max_chunk_frames`; otherwise it opens a new chunk. The bound is
    /// inclusive: a chunk may span exactly `max_chunk_frames`, so a whole
    /// calendar day fits one 1-day window.
    ///
    /// # Arguments
    /// * `bins` - Ordered, non-overlapping bins
    /// * `max_chunk_frames` - Processing window in frames
    /// * `clock` - Clock used to validate the window
    /// * `bin_duration_frames` - Bin size used to validate the window
    pub fn plan(
        bins: &[Bin],
        max_chunk_frames: i64,
        clock: &Clock,
        bin_duration_frames: i64,
    ) -> AnalysisResult<Self> {
        Self::validate_window(clock, max_chunk_frames, bin_duration_frames)?;

        let mut chunks: Vec<Chunk> = Vec::new();
        for bin in bins {
            match chunks.last_mut() {
                Some(chunk)
                    if bin.calendar_end_frame - chunk.calendar_start_frame() + 1
                        <= max_chunk_frames =>
                {
                    chunk.push(bin.clone())
                }
                _ => chunks.push(Chunk::open(bin.clone())),
            }
        }

        log::debug!(
            "Planned {} chunk(s) for {} bin(s) (max {} frames per chunk)",
            chunks.len(),
            bins.len(),
            max_chunk_frames
        );

        Ok(Self {
            max_chunk_frames,
            chunks,
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn max_chunk_frames(&self) -> i64 {
        self.max_chunk_frames
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All bins in chunk order.
    pub fn bins(&self) -> impl Iterator<Item = &Bin> {
        self.chunks.iter().flat_map(|chunk| chunk.bins.iter())
    }

    /// `(start_frame, end_frame)` of every chunk.
    pub fn frame_ranges(&self) -> Vec<(i64, i64)> {
        self.chunks
            .iter()
            .map(|chunk| (chunk.start_frame, chunk.end_frame))
            .collect()
    }
}
