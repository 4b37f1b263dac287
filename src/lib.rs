//! # slide-sieve
//!
//! Batch preprocessing for histology whole slide images (WSI).
//!
//! Three jobs run one after the other on a slide collection:
//!
//! 1. **Extract**: cut the central region of a slide series into fixed-size
//!    tiles, dropping background and pen-mark tiles.
//! 2. **Clean**: classify a tile tree into tissue and noise, then report,
//!    quarantine or delete the noise together with corrupt and hidden files.
//! 3. **Count**: segment hematoxylin-stained nuclei in every tile and append
//!    per-tile shape statistics to a CSV table.
//!
//! ## Architecture
//!
//! - [`io`] - Byte range readers and block caching
//! - [`mod@format`] - TIFF/BigTIFF directory parsing and tile decoding
//! - [`slide`] - Slide abstraction, series selection and region reads
//! - [`imaging`] - Color conversion, masks, statistics and region properties
//! - [`tile`] - Region grid, rejection filters and the tile extractor
//! - [`clean`] - Tissue classifier, clean plans and disposal
//! - [`nuclei`] - Nuclei segmentation, features and the CSV table
//! - [`config`] - CLI argument types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use slide_sieve::{extract_tiles, ExtractorParams, TiffSlide};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let slide = TiffSlide::open_path("case-17.svs").await?;
//!     let summary =
//!         extract_tiles(&slide, "case-17", Path::new("tiles"), &ExtractorParams::default())
//!             .await?;
//!     println!("saved {} tiles", summary.saved);
//!     Ok(())
//! }
//! ```

pub mod clean;
pub mod config;
pub mod error;
pub mod format;
pub mod imaging;
pub mod io;
pub mod nuclei;
pub mod slide;
pub mod tile;
pub mod walk;

// Re-export commonly used types
pub use clean::{
    clean_tiles, purge, CleanOutcome, CleanPlan, CleanSummary, Disposal, PlannedRemoval,
    PurgeSummary, RemovalReason, TileStats, TissueClassifierParams,
};
pub use config::{CleanArgs, Cli, Command, CountArgs, ExtractArgs, InfoArgs, PurgeArgs};
pub use error::{CleanError, CountError, ExtractError, IoError, SegmentError, SlideError, TiffError};
pub use imaging::{HsvRange, Mask, RegionProps};
pub use io::{BlockCache, FileRangeReader, MemoryRangeReader, RangeReader};
pub use nuclei::{
    analyze_tile, count_nuclei, segment_nuclei, CountSummary, FeatureRow, FeatureTable,
    NucleiFeatures, NucleiParams, Segmentation,
};
pub use slide::{DecodedBlockCache, SeriesInfo, SeriesSelector, SlideReader, TiffSlide};
pub use tile::{extract_tiles, ExtractSummary, ExtractorParams, Rejection, TileFilterParams};
pub use walk::{scan_tiles, TileEntry};
