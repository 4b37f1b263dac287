//! Per-pixel color conversions.
//!
//! Three conventions are in use and they are not interchangeable:
//!
//! - [`rgb_to_hsv`]: 8-bit HSV with H in [0, 180] and S, V in [0, 255]
//!   (hue degrees halved so it fits a byte). Band thresholds in the cleaner
//!   and nuclei counter are expressed in this scale.
//! - [`luma`]: ITU-R 601-2 luma in integer fixed point, as 8-bit
//!   grayscale conversions in common imaging libraries compute it.
//! - [`intensity`]: floating point luminance in [0, 1] with the
//!   0.2125 / 0.7154 / 0.0721 weights used by the segmentation stages.

use image::{Rgb, RgbImage};

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round() as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// ITU-R 601-2 luma of an RGB pixel.
pub fn luma(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(|c| c as u32);
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

/// Luminance of an RGB pixel scaled to [0, 1].
pub fn intensity(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    0.2125 * r + 0.7154 * g + 0.0721 * b
}

/// Luminance of every pixel of an image, row-major.
pub fn intensity_image(img: &RgbImage) -> Vec<f32> {
    img.pixels().map(|p| intensity(p.0)).collect()
}

/// Inclusive box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Whether every component of `hsv` lies within the bounds.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }

    /// Whether an RGB pixel falls inside the range once converted.
    pub fn contains_rgb(&self, pixel: &Rgb<u8>) -> bool {
        self.contains(rgb_to_hsv(pixel.0))
    }
}
