//! Slide to tile directory extraction.
//!
//! ```text
//!  select series ─► region grid ─► read_region ─► resize ─► autocontrast
//!                                                                │
//!                          save {stem}_{x}_{y}.tiff ◄─ keep ◄─ filters
//! ```
//!
//! Slide open and series selection failures abort the run. Everything that
//! goes wrong with a single region is logged, counted and skipped.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use tracing::{info, warn};

use super::filter::{classify_tile, Rejection, TileFilterParams};
use super::grid::{Region, RegionGrid, DEFAULT_REGION_SIZE};
use crate::error::{ExtractError, SlideError};
use crate::imaging::autocontrast;
use crate::slide::{SeriesSelector, SlideReader};

/// Default side of a saved tile
pub const DEFAULT_TILE_SIZE: u32 = 224;

/// Default bound for automatic series selection
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

// =============================================================================
// Parameters
// =============================================================================

/// Parameters of a tile extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorParams {
    /// Which series to tile
    pub selector: SeriesSelector,

    /// Side of the regions read from the series
    pub region_size: u32,

    /// Side of the saved tiles
    pub tile_size: u32,

    /// Rejection thresholds
    pub filter: TileFilterParams,
}

impl Default for ExtractorParams {
    fn default() -> Self {
        Self {
            selector: SeriesSelector::LargestWithin {
                max_dimension: DEFAULT_MAX_DIMENSION,
            },
            region_size: DEFAULT_REGION_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            filter: TileFilterParams::default(),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Outcome counts of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub series: usize,
    pub output_dir: PathBuf,
    pub visited: usize,
    pub saved: usize,
    pub rejected_white: usize,
    pub rejected_color: usize,
    pub read_failures: usize,
    pub size_mismatches: usize,
    pub save_failures: usize,
}

// =============================================================================
// Extraction
// =============================================================================

/// Resize a region to `tile_size` square (unless it already is) and stretch
/// its contrast.
pub fn prepare_tile(region: RgbImage, tile_size: u32) -> RgbImage {
    let mut tile = if region.dimensions() == (tile_size, tile_size) {
        region
    } else {
        imageops::resize(&region, tile_size, tile_size, FilterType::Lanczos3)
    };
    autocontrast(&mut tile);
    tile
}

/// File name of the tile cut at `(x, y)`.
pub fn tile_file_name(slide_stem: &str, x: u32, y: u32) -> String {
    format!("{}_{}_{}.tiff", slide_stem, x, y)
}

/// Log every series of the slide.
pub fn log_series<S: SlideReader + ?Sized>(slide: &S) {
    info!(series = slide.series_count(), "Slide series");
    for s in slide.all_series() {
        info!(
            index = s.index,
            width = s.width,
            height = s.height,
            depth = s.depth,
            channels = s.channels,
            timepoints = s.timepoints,
            compression = %s.compression,
            "Series"
        );
    }
}

/// Tile the selected series of `slide` into `output_root/slide_stem/`.
pub async fn extract_tiles<S: SlideReader + ?Sized>(
    slide: &S,
    slide_stem: &str,
    output_root: &Path,
    params: &ExtractorParams,
) -> Result<ExtractSummary, ExtractError> {
    log_series(slide);

    let series = params.selector.resolve(slide)?;
    let info = slide
        .series_info(series)
        .ok_or(SlideError::SeriesOutOfRange {
            series,
            count: slide.series_count(),
        })?;
    info!(
        series,
        width = info.width,
        height = info.height,
        label = info.label.as_deref().unwrap_or("-"),
        selector = %params.selector,
        "Selected series"
    );

    let output_dir = output_root.join(slide_stem);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|source| ExtractError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

    let grid = RegionGrid::central(info.width, info.height, params.region_size);
    info!(
        regions = grid.len(),
        x_range = ?(grid.x_start, grid.x_end),
        y_range = ?(grid.y_start, grid.y_end),
        "Extracting regions"
    );

    let mut summary = ExtractSummary {
        series,
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    for region in grid.regions() {
        summary.visited += 1;
        let Region {
            x,
            y,
            width,
            height,
        } = region;

        let bytes = match slide.read_region(series, x, y, width, height).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(x, y, width, height, error = %e, "Region read failed, skipping");
                summary.read_failures += 1;
                continue;
            }
        };

        let expected = info.region_len(width, height);
        let pixels = match (bytes.len() == expected)
            .then(|| RgbImage::from_raw(width, height, bytes.to_vec()))
            .flatten()
        {
            Some(pixels) => pixels,
            None => {
                warn!(
                    x,
                    y,
                    expected,
                    actual = bytes.len(),
                    "Region buffer has unexpected size, skipping"
                );
                summary.size_mismatches += 1;
                continue;
            }
        };

        let tile = prepare_tile(pixels, params.tile_size);
        match classify_tile(&tile, &params.filter) {
            Some(Rejection::MostlyWhite) => {
                info!(x, y, "Rejected: mostly white");
                summary.rejected_white += 1;
                continue;
            }
            Some(Rejection::MostlyGreenOrBlue) => {
                info!(x, y, "Rejected: mostly green or blue");
                summary.rejected_color += 1;
                continue;
            }
            None => {}
        }

        let path = output_dir.join(tile_file_name(slide_stem, x, y));
        match tile.save_with_format(&path, ImageFormat::Tiff) {
            Ok(()) => {
                info!(path = %path.display(), "Saved tile");
                summary.saved += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Tile save failed, skipping");
                summary.save_failures += 1;
            }
        }
    }

    info!(
        visited = summary.visited,
        saved = summary.saved,
        rejected_white = summary.rejected_white,
        rejected_color = summary.rejected_color,
        read_failures = summary.read_failures,
        size_mismatches = summary.size_mismatches,
        save_failures = summary.save_failures,
        "Extraction finished"
    );
    Ok(summary)
}
