//! Slide abstraction layer.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Tile extractor / info listing     │
//! └────────────────────┬────────────────────┘
//!                      │ series metadata, RGB regions
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideReader trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   TiffSlide (TIFF / BigTIFF / SVS)      │
//! │   + DecodedBlockCache                   │
//! └────────────────────┬────────────────────┘
//!                      │ byte ranges
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   BlockCache<FileRangeReader>           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use slide_sieve::slide::{SeriesSelector, SlideReader, TiffSlide};
//!
//! let slide = TiffSlide::open_path("sample.svs").await?;
//! let series = SeriesSelector::LargestWithin { max_dimension: 10_000 }.resolve(&slide)?;
//! let rgb = slide.read_region(series, 0, 0, 448, 448).await?;
//! ```

mod cache;
mod reader;
mod select;
mod tiff_slide;

pub use cache::{BlockKey, DecodedBlockCache, DEFAULT_DECODED_CACHE_CAPACITY};
pub use reader::{SeriesInfo, SlideReader};
pub use select::SeriesSelector;
pub use tiff_slide::TiffSlide;
