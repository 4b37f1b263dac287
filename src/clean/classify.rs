//! Tissue versus noise classification of a tile.
//!
//! A tissue tile is dominated by H&E pink or by pale background (color
//! ratio test) AND is not flat (variation test). Saturated pen marks, dark
//! debris and blurred or empty tiles fail one of the two.

use image::RgbImage;

use crate::imaging::{channel_std, HsvRange};

/// Thresholds of the tissue classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TissueClassifierParams {
    /// Eosin pink band
    pub pink: HsvRange,

    /// Low-saturation bright band
    pub white: HsvRange,

    /// Fraction of pink-or-white pixels a tissue tile must exceed
    pub color_ratio: f64,

    /// Mean RGB standard deviation a tissue tile must exceed
    pub variation_threshold: f64,
}

impl Default for TissueClassifierParams {
    fn default() -> Self {
        Self {
            pink: HsvRange::new([150, 50, 50], [180, 255, 255]),
            white: HsvRange::new([0, 0, 200], [180, 55, 255]),
            color_ratio: 0.5,
            variation_threshold: 20.0,
        }
    }
}

/// Measurements the classifier decides on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileStats {
    /// Fraction of pixels in the pink or white band
    pub color_ratio: f64,

    /// Mean of the R, G and B population standard deviations
    pub mean_std: f64,
}

impl TileStats {
    /// Measure a tile.
    pub fn measure(img: &RgbImage, params: &TissueClassifierParams) -> Self {
        let total = img.width() as u64 * img.height() as u64;
        let in_band = img
            .pixels()
            .filter(|p| params.pink.contains_rgb(p) || params.white.contains_rgb(p))
            .count();
        let color_ratio = if total == 0 {
            0.0
        } else {
            in_band as f64 / total as f64
        };

        let std = channel_std(img);
        Self {
            color_ratio,
            mean_std: std.iter().sum::<f64>() / 3.0,
        }
    }

    pub fn passes_color(&self, params: &TissueClassifierParams) -> bool {
        self.color_ratio > params.color_ratio
    }

    pub fn passes_variation(&self, params: &TissueClassifierParams) -> bool {
        self.mean_std > params.variation_threshold
    }

    /// Both tests must pass.
    pub fn is_tissue(&self, params: &TissueClassifierParams) -> bool {
        self.passes_color(params) && self.passes_variation(params)
    }
}
