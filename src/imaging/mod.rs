//! Pixel-level building blocks shared by the extractor, cleaner and counter.

pub mod color;
pub mod mask;
pub mod regions;
pub mod stats;

pub use color::{intensity, intensity_image, luma, rgb_to_hsv, HsvRange};
pub use mask::Mask;
pub use regions::{label, region_props, LabelImage, RegionProps};
pub use stats::{autocontrast, channel_std, mean, median, percentile, rescale_intensity};
