//! Background and artifact rejection for extracted tiles.
//!
//! Two independent tests, either of which rejects a tile:
//!
//! - **mostly white**: glass and empty background, judged on luma
//! - **mostly green or blue**: pen marks and out-of-stain debris

use image::RgbImage;

use crate::imaging::luma;

/// Thresholds of the tile rejection tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFilterParams {
    /// Luma above which a pixel counts as white
    pub white_threshold: u8,

    /// Fraction of white pixels above which the tile is rejected
    pub white_ratio: f64,

    /// Minimum value of the dominant channel of a green or blue pixel
    pub color_threshold: u8,

    /// How far the dominant channel must exceed each other channel
    pub color_margin: u8,

    /// Fraction of green or blue pixels above which the tile is rejected
    pub color_ratio: f64,
}

impl Default for TileFilterParams {
    fn default() -> Self {
        Self {
            white_threshold: 230,
            white_ratio: 0.5,
            color_threshold: 100,
            color_margin: 10,
            color_ratio: 0.5,
        }
    }
}

/// Why a tile was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MostlyWhite,
    MostlyGreenOrBlue,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MostlyWhite => write!(f, "mostly white"),
            Rejection::MostlyGreenOrBlue => write!(f, "mostly green or blue"),
        }
    }
}

fn ratio(count: usize, img: &RgbImage) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

/// Whether more than `white_ratio` of the pixels have luma above
/// `white_threshold`.
pub fn is_mostly_white(img: &RgbImage, params: &TileFilterParams) -> bool {
    let white = img
        .pixels()
        .filter(|p| luma(p.0) > params.white_threshold)
        .count();
    ratio(white, img) > params.white_ratio
}

/// Whether more than `color_ratio` of the pixels are dominated by green or
/// by blue.
pub fn is_mostly_green_or_blue(img: &RgbImage, params: &TileFilterParams) -> bool {
    let threshold = params.color_threshold as u16;
    let margin = params.color_margin as u16;
    let dominates = |c: u16, a: u16, b: u16| c > threshold && c > a + margin && c > b + margin;

    let colored = img
        .pixels()
        .filter(|p| {
            let [r, g, b] = p.0.map(u16::from);
            dominates(g, r, b) || dominates(b, r, g)
        })
        .count();
    ratio(colored, img) > params.color_ratio
}

/// Run both tests; `None` means the tile is kept.
pub fn classify_tile(img: &RgbImage, params: &TileFilterParams) -> Option<Rejection> {
    if is_mostly_white(img, params) {
        Some(Rejection::MostlyWhite)
    } else if is_mostly_green_or_blue(img, params) {
        Some(Rejection::MostlyGreenOrBlue)
    } else {
        None
    }
}
