use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File could not be opened
    #[error("Cannot open {path}: {message}")]
    Open { path: String, message: String },

    /// Read failed after the file was opened
    #[error("Read error: {0}")]
    Read(String),
}

/// Errors that can occur when parsing or decoding TIFF based slides
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// Compression scheme we cannot decode
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Sample layout we cannot decode (bit depth, planar config, photometric)
    #[error("Unsupported sample layout: {0}")]
    UnsupportedLayout(String),

    /// Tile payload failed to decode
    #[error("Tile decode error: {0}")]
    Decode(String),
}

/// Errors raised by the slide abstraction layer
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    #[error(transparent)]
    Tiff(#[from] TiffError),

    /// Series index does not exist in the slide
    #[error("Series {series} out of range (slide has {count} series)")]
    SeriesOutOfRange { series: usize, count: usize },

    /// Requested region does not fit in the series extent
    #[error(
        "Region {width}x{height} at ({x}, {y}) exceeds series extent {series_width}x{series_height}"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        series_width: u32,
        series_height: u32,
    },

    /// No series satisfied the selection criteria
    #[error("No series with both sides <= {max_dimension} pixels")]
    NoMatchingSeries { max_dimension: u32 },
}

impl From<IoError> for SlideError {
    fn from(err: IoError) -> Self {
        SlideError::Tiff(TiffError::Io(err))
    }
}

/// Fatal errors of the tile extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Slide error: {0}")]
    Slide(#[from] SlideError),

    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors of the tile cleaner and plan purge
#[derive(Debug, Error)]
pub enum CleanError {
    /// Root directory is missing or not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Plan file could not be read or written
    #[error("Plan file {path}: {source}")]
    PlanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Plan file content is not a valid plan
    #[error("Invalid plan file {path}: {source}")]
    PlanFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-tile segmentation failures
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Tile could not be decoded
    #[error("Cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Tissue mask selected no pixels, so the contrast range is undefined
    #[error("Tissue mask is empty")]
    EmptyTissue,
}

/// Errors of the nuclei counter
#[derive(Debug, Error)]
pub enum CountError {
    /// Root directory is missing or not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Output table could not be opened or appended to
    #[error("Output table {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
