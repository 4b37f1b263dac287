//! Command line configuration for slide-sieve.
//!
//! One subcommand per batch job, each with its own clap `Args` struct:
//!
//! - `info` - list the series of a slide
//! - `extract` - tile the central region of a slide series
//! - `clean` - classify tiles and dispose of noise, corrupt and hidden files
//! - `purge` - delete the files listed in a saved clean plan
//! - `count` - segment nuclei in every tile and append features to a CSV
//!
//! # Environment Variables
//!
//! Every threshold can also be set through an environment variable with the
//! `SIEVE_` prefix, for example:
//!
//! - `SIEVE_OUTPUT_DIR` - Tile output root of `extract` (default: tiles)
//! - `SIEVE_SERIES` - Explicit series index for `extract`
//! - `SIEVE_MAX_DIMENSION` - Largest series side considered (default: 16384)
//! - `SIEVE_WHITE_RATIO` - Mostly-white rejection ratio (default: 0.5)
//! - `SIEVE_VARIATION_THRESHOLD` - Cleaner variation threshold (default: 20)
//! - `SIEVE_TABLE` - Output CSV of `count` (default: nuclei_features.csv)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::clean::{Disposal, TissueClassifierParams};
use crate::imaging::HsvRange;
use crate::nuclei::NucleiParams;
use crate::slide::{SeriesSelector, DEFAULT_DECODED_CACHE_CAPACITY};
use crate::tile::{
    ExtractorParams, TileFilterParams, DEFAULT_MAX_DIMENSION, DEFAULT_REGION_SIZE,
    DEFAULT_TILE_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default tile output root.
pub const DEFAULT_OUTPUT_DIR: &str = "tiles";

/// Default nuclei feature table.
pub const DEFAULT_TABLE: &str = "nuclei_features.csv";

// =============================================================================
// CLI Arguments
// =============================================================================

/// slide-sieve - batch tiling, tile cleaning and nuclei counting for
/// histology whole slide images.
#[derive(Parser, Debug, Clone)]
#[command(name = "slide-sieve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the series of a slide file.
    Info(InfoArgs),

    /// Extract filtered tiles from the central region of a slide series.
    Extract(ExtractArgs),

    /// Classify tiles and report, quarantine or delete the noise.
    Clean(CleanArgs),

    /// Delete every file listed in a saved clean plan.
    Purge(PurgeArgs),

    /// Count nuclei in every tile and append one CSV row per tile.
    Count(CountArgs),
}

// =============================================================================
// Info
// =============================================================================

/// Arguments of the `info` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Slide file (TIFF, BigTIFF or SVS).
    pub slide: PathBuf,
}

// =============================================================================
// Extract
// =============================================================================

/// Arguments of the `extract` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Slide file (TIFF, BigTIFF or SVS).
    pub slide: PathBuf,

    /// Root directory; tiles land in `<output>/<slide stem>/`.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, env = "SIEVE_OUTPUT_DIR")]
    pub output: PathBuf,

    /// Explicit series index. Overrides --max-dimension.
    #[arg(long, env = "SIEVE_SERIES")]
    pub series: Option<usize>,

    /// Pick the largest series whose sides are both within this many pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "SIEVE_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// Side of the square regions read from the slide.
    #[arg(long, default_value_t = DEFAULT_REGION_SIZE, env = "SIEVE_REGION_SIZE")]
    pub region_size: u32,

    /// Side of the saved tiles.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "SIEVE_TILE_SIZE")]
    pub tile_size: u32,

    /// Luma above which a pixel counts as white.
    #[arg(long, default_value_t = 230, env = "SIEVE_WHITE_THRESHOLD")]
    pub white_threshold: u8,

    /// Reject tiles whose white fraction exceeds this ratio.
    #[arg(long, default_value_t = 0.5, env = "SIEVE_WHITE_RATIO")]
    pub white_ratio: f64,

    /// Minimum dominant channel value of a green or blue pixel.
    #[arg(long, default_value_t = 100, env = "SIEVE_COLOR_THRESHOLD")]
    pub color_threshold: u8,

    /// Margin by which the dominant channel must exceed the others.
    #[arg(long, default_value_t = 10, env = "SIEVE_COLOR_MARGIN")]
    pub color_margin: u8,

    /// Reject tiles whose green-or-blue fraction exceeds this ratio.
    #[arg(long, default_value_t = 0.5, env = "SIEVE_COLOR_RATIO")]
    pub color_ratio: f64,

    /// Byte budget of the decoded slide tile cache.
    #[arg(long, default_value_t = DEFAULT_DECODED_CACHE_CAPACITY, env = "SIEVE_CACHE_BYTES")]
    pub cache_bytes: usize,
}

impl ExtractArgs {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.region_size == 0 {
            return Err("region_size must be greater than 0".to_string());
        }
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.series.is_none() && self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }
        check_ratio("white_ratio", self.white_ratio)?;
        check_ratio("color_ratio", self.color_ratio)?;
        Ok(())
    }

    /// Series selection rule: explicit index when given, size bound otherwise.
    pub fn selector(&self) -> SeriesSelector {
        match self.series {
            Some(index) => SeriesSelector::Index(index),
            None => SeriesSelector::LargestWithin {
                max_dimension: self.max_dimension,
            },
        }
    }

    pub fn filter_params(&self) -> TileFilterParams {
        TileFilterParams {
            white_threshold: self.white_threshold,
            white_ratio: self.white_ratio,
            color_threshold: self.color_threshold,
            color_margin: self.color_margin,
            color_ratio: self.color_ratio,
        }
    }

    pub fn extractor_params(&self) -> ExtractorParams {
        ExtractorParams {
            selector: self.selector(),
            region_size: self.region_size,
            tile_size: self.tile_size,
            filter: self.filter_params(),
        }
    }

    /// Directory name of the slide's tiles, taken from the file stem.
    pub fn slide_stem(&self) -> String {
        self.slide
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "slide".to_string())
    }
}

// =============================================================================
// Clean
// =============================================================================

/// Arguments of the `clean` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Root of the tile tree.
    pub root: PathBuf,

    /// Delete removed files immediately.
    #[arg(long, default_value_t = false, conflicts_with = "quarantine")]
    pub delete: bool,

    /// Move removed files under this directory instead of deleting them.
    #[arg(long, env = "SIEVE_QUARANTINE")]
    pub quarantine: Option<PathBuf>,

    /// Write the clean plan to this JSON file.
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Lower HSV bound of the pink tissue band, as H,S,V.
    #[arg(long, default_value = "150,50,50", value_parser = parse_hsv, env = "SIEVE_PINK_LOWER")]
    pub pink_lower: [u8; 3],

    /// Upper HSV bound of the pink tissue band, as H,S,V.
    #[arg(long, default_value = "180,255,255", value_parser = parse_hsv, env = "SIEVE_PINK_UPPER")]
    pub pink_upper: [u8; 3],

    /// Lower HSV bound of the pale background band, as H,S,V.
    #[arg(long, default_value = "0,0,200", value_parser = parse_hsv, env = "SIEVE_WHITE_LOWER")]
    pub white_lower: [u8; 3],

    /// Upper HSV bound of the pale background band, as H,S,V.
    #[arg(long, default_value = "180,55,255", value_parser = parse_hsv, env = "SIEVE_WHITE_UPPER")]
    pub white_upper: [u8; 3],

    /// A tissue tile's pink-or-pale fraction must exceed this ratio.
    #[arg(long, default_value_t = 0.5, env = "SIEVE_TISSUE_COLOR_RATIO")]
    pub color_ratio: f64,

    /// A tissue tile's mean RGB standard deviation must exceed this value.
    #[arg(long, default_value_t = 20.0, env = "SIEVE_VARIATION_THRESHOLD")]
    pub variation_threshold: f64,
}

impl CleanArgs {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        check_ratio("color_ratio", self.color_ratio)?;
        if !self.variation_threshold.is_finite() || self.variation_threshold < 0.0 {
            return Err("variation_threshold must be a non-negative number".to_string());
        }
        check_band("pink", self.pink_lower, self.pink_upper)?;
        check_band("white", self.white_lower, self.white_upper)?;
        if self.delete && self.quarantine.is_some() {
            return Err("--delete and --quarantine are mutually exclusive".to_string());
        }
        if let Some(ref dir) = self.quarantine {
            if dir == &self.root {
                return Err("quarantine directory must differ from the tile root".to_string());
            }
        }
        Ok(())
    }

    pub fn classifier_params(&self) -> TissueClassifierParams {
        TissueClassifierParams {
            pink: HsvRange::new(self.pink_lower, self.pink_upper),
            white: HsvRange::new(self.white_lower, self.white_upper),
            color_ratio: self.color_ratio,
            variation_threshold: self.variation_threshold,
        }
    }

    pub fn disposal(&self) -> Disposal {
        match (&self.quarantine, self.delete) {
            (Some(dir), _) => Disposal::Quarantine(dir.clone()),
            (None, true) => Disposal::Delete,
            (None, false) => Disposal::Report,
        }
    }
}

// =============================================================================
// Purge
// =============================================================================

/// Arguments of the `purge` subcommand.
#[derive(Args, Debug, Clone)]
pub struct PurgeArgs {
    /// Clean plan written by `clean --plan`.
    #[arg(long)]
    pub plan: PathBuf,
}

// =============================================================================
// Count
// =============================================================================

/// Arguments of the `count` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CountArgs {
    /// Root of the tile tree.
    pub root: PathBuf,

    /// CSV table rows are appended to.
    #[arg(short, long, default_value = DEFAULT_TABLE, env = "SIEVE_TABLE")]
    pub output: PathBuf,

    /// Intensity below which a pixel is tissue.
    #[arg(long, default_value_t = 0.9, env = "SIEVE_TISSUE_THRESHOLD")]
    pub tissue_threshold: f32,

    /// Minimum tissue component size in pixels.
    #[arg(long, default_value_t = 500, env = "SIEVE_TISSUE_MIN_SIZE")]
    pub tissue_min_size: usize,

    /// Largest tissue hole that gets filled, in pixels.
    #[arg(long, default_value_t = 500, env = "SIEVE_TISSUE_HOLE_SIZE")]
    pub tissue_hole_size: usize,

    /// Radius of the disk closing the tissue mask.
    #[arg(long, default_value_t = 10, env = "SIEVE_CLOSING_RADIUS")]
    pub closing_radius: u8,

    /// Lower HSV bound of the nucleus band, as H,S,V.
    #[arg(long, default_value = "120,50,20", value_parser = parse_hsv, env = "SIEVE_NUCLEUS_LOWER")]
    pub nucleus_lower: [u8; 3],

    /// Upper HSV bound of the nucleus band, as H,S,V.
    #[arg(long, default_value = "160,255,255", value_parser = parse_hsv, env = "SIEVE_NUCLEUS_UPPER")]
    pub nucleus_upper: [u8; 3],

    /// Percentile mapped to 0 by the contrast stretch.
    #[arg(long, default_value_t = 2.0, env = "SIEVE_LOW_PERCENTILE")]
    pub low_percentile: f64,

    /// Percentile mapped to 1 by the contrast stretch.
    #[arg(long, default_value_t = 98.0, env = "SIEVE_HIGH_PERCENTILE")]
    pub high_percentile: f64,

    /// Stretched intensity below which a pixel may belong to a nucleus.
    #[arg(long, default_value_t = 0.2, env = "SIEVE_INTENSITY_THRESHOLD")]
    pub intensity_threshold: f32,

    /// Minimum nucleus size in pixels.
    #[arg(long, default_value_t = 10, env = "SIEVE_NUCLEUS_MIN_SIZE")]
    pub nucleus_min_size: usize,

    /// Largest nucleus hole that gets filled, in pixels.
    #[arg(long, default_value_t = 10, env = "SIEVE_NUCLEUS_HOLE_SIZE")]
    pub nucleus_hole_size: usize,
}

impl CountArgs {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.tissue_threshold) {
            return Err("tissue_threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.intensity_threshold) {
            return Err("intensity_threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.low_percentile)
            || !(0.0..=100.0).contains(&self.high_percentile)
        {
            return Err("percentiles must be between 0 and 100".to_string());
        }
        if self.low_percentile > self.high_percentile {
            return Err("low_percentile must not exceed high_percentile".to_string());
        }
        check_band("nucleus", self.nucleus_lower, self.nucleus_upper)?;
        Ok(())
    }

    pub fn nuclei_params(&self) -> NucleiParams {
        NucleiParams {
            tissue_threshold: self.tissue_threshold,
            tissue_min_size: self.tissue_min_size,
            tissue_hole_size: self.tissue_hole_size,
            closing_radius: self.closing_radius,
            nucleus_color: HsvRange::new(self.nucleus_lower, self.nucleus_upper),
            low_percentile: self.low_percentile,
            high_percentile: self.high_percentile,
            intensity_threshold: self.intensity_threshold,
            nucleus_min_size: self.nucleus_min_size,
            nucleus_hole_size: self.nucleus_hole_size,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn check_ratio(name: &str, value: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} must be between 0 and 1", name))
    }
}

fn check_band(name: &str, lower: [u8; 3], upper: [u8; 3]) -> Result<(), String> {
    if lower[0] > 180 || upper[0] > 180 {
        return Err(format!("{} band hue must be at most 180", name));
    }
    if lower.iter().zip(upper.iter()).any(|(lo, hi)| lo > hi) {
        return Err(format!("{} band lower bound exceeds upper bound", name));
    }
    Ok(())
}

/// Parse an `H,S,V` triple.
pub fn parse_hsv(value: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected H,S,V but got '{}'", value));
    }

    let mut hsv = [0u8; 3];
    for (slot, part) in hsv.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("'{}' is not a value between 0 and 255", part))?;
    }
    Ok(hsv)
}

// =============================================================================
// Tests
// =============================================================================
