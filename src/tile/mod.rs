//! Tile extraction.
//!
//! Cuts the central part of one slide series into fixed-size tiles, keeps the
//! ones that look like tissue and writes them as TIFF files.
//!
//! # Components
//!
//! - [`RegionGrid`]: which regions of the series are visited
//! - [`classify_tile`]: mostly-white and mostly-green-or-blue rejection
//! - [`extract_tiles`]: the read / resize / normalize / filter / save loop

mod extractor;
mod filter;
mod grid;

pub use extractor::{
    extract_tiles, log_series, prepare_tile, tile_file_name, ExtractSummary, ExtractorParams,
    DEFAULT_MAX_DIMENSION, DEFAULT_TILE_SIZE,
};
pub use filter::{
    classify_tile, is_mostly_green_or_blue, is_mostly_white, Rejection, TileFilterParams,
};
pub use grid::{Region, RegionGrid, DEFAULT_REGION_SIZE};
