//! SlideReader trait for format-agnostic slide access.
//!
//! Jobs that consume slides (the tile extractor, the `info` listing) only need
//! series metadata and rectangular pixel regions. This trait is that surface;
//! [`crate::slide::TiffSlide`] is the TIFF/BigTIFF implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SlideError;

// =============================================================================
// Series Information
// =============================================================================

/// Metadata of one series (image directory) of a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    /// Position of the series in the file
    pub index: usize,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Number of Z planes (always 1 for TIFF slides)
    pub depth: u32,

    /// Channels of the regions returned by `read_region`
    pub channels: u32,

    /// Number of time points (always 1 for TIFF slides)
    pub timepoints: u32,

    /// Width of a storage block (tile, or full-width strip)
    pub tile_width: u32,

    /// Height of a storage block
    pub tile_height: u32,

    /// Compression of the stored blocks
    pub compression: String,

    /// First line of the series description, if any. SVS files name their
    /// `label` and `macro` images here.
    pub label: Option<String>,
}

impl SeriesInfo {
    /// Pixel area of the series, used to rank candidate series.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Byte length of an interleaved region of the given size.
    pub fn region_len(&self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.channels as usize
    }
}

// =============================================================================
// SlideReader Trait
// =============================================================================

/// Format-agnostic interface for reading pixel regions from a slide.
///
/// Implementations must be usable from async code and are expected to bound
/// any internal caching.
#[async_trait]
pub trait SlideReader: Send + Sync {
    /// Number of series in the slide.
    fn series_count(&self) -> usize;

    /// Metadata of one series, or `None` if the index is out of range.
    fn series_info(&self, series: usize) -> Option<SeriesInfo>;

    /// Read a `width` x `height` region at `(x, y)` of a series.
    ///
    /// Returns interleaved, row-major bytes with `channels` samples per pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The series does not exist
    /// - The region does not fit inside the series
    /// - Reading or decoding a covering block fails
    async fn read_region(
        &self,
        series: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, SlideError>;

    /// Metadata of every series, in file order.
    fn all_series(&self) -> Vec<SeriesInfo> {
        (0..self.series_count())
            .filter_map(|i| self.series_info(i))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
