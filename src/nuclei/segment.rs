//! Nuclei segmentation of a single tile.
//!
//! ```text
//!  RGB ─► intensity < 0.9 ─► drop objects/holes < 500 ─► close(disk 10) = tissue
//!   │
//!   └─► black outside tissue ─┬─► HSV purple band ∧ tissue = color mask
//!                             └─► intensity, stretch [p2, p98] of tissue → [0, 1]
//!                                   └─► < 0.2 = dark mask
//!
//!  color ∧ dark ─► drop objects/holes < 10 ─► 8-connected labels
//! ```

use image::{Rgb, RgbImage};

use crate::error::SegmentError;
use crate::imaging::{
    intensity_image, label, percentile, rescale_intensity, HsvRange, LabelImage, Mask,
};

/// Thresholds of the segmentation pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NucleiParams {
    /// Intensity below which a pixel is tissue
    pub tissue_threshold: f32,

    /// Tissue components smaller than this are dropped
    pub tissue_min_size: usize,

    /// Background holes in the tissue smaller than this are filled
    pub tissue_hole_size: usize,

    /// Radius of the disk closing the tissue mask
    pub closing_radius: u8,

    /// Hematoxylin purple band
    pub nucleus_color: HsvRange,

    /// Percentile mapped to 0 by the contrast stretch
    pub low_percentile: f64,

    /// Percentile mapped to 1 by the contrast stretch
    pub high_percentile: f64,

    /// Stretched intensity below which a pixel is dark enough for a nucleus
    pub intensity_threshold: f32,

    /// Nucleus components smaller than this are dropped
    pub nucleus_min_size: usize,

    /// Holes inside nuclei smaller than this are filled
    pub nucleus_hole_size: usize,
}

impl Default for NucleiParams {
    fn default() -> Self {
        Self {
            tissue_threshold: 0.9,
            tissue_min_size: 500,
            tissue_hole_size: 500,
            closing_radius: 10,
            nucleus_color: HsvRange::new([120, 50, 20], [160, 255, 255]),
            low_percentile: 2.0,
            high_percentile: 98.0,
            intensity_threshold: 0.2,
            nucleus_min_size: 10,
            nucleus_hole_size: 10,
        }
    }
}

/// Every intermediate of the pipeline.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub tissue: Mask,
    pub color: Mask,
    pub nuclei: Mask,
    pub labels: LabelImage,
    /// Number of labeled nuclei
    pub count: u32,
    /// Stretched intensity, row-major
    pub intensity: Vec<f32>,
    /// Intensities mapped to 0 and 1
    pub contrast_range: (f32, f32),
}

/// Tissue mask: dark pixels, cleaned of specks and pinholes, then closed.
pub fn tissue_mask(gray: &[f32], width: u32, height: u32, params: &NucleiParams) -> Mask {
    let mut tissue = Mask::from_fn(width, height, |x, y| {
        gray[y as usize * width as usize + x as usize] < params.tissue_threshold
    });
    tissue.remove_small_objects(params.tissue_min_size);
    tissue.remove_small_holes(params.tissue_hole_size);
    tissue.close_disk(params.closing_radius)
}

/// Run the full pipeline on one tile.
pub fn segment_nuclei(img: &RgbImage, params: &NucleiParams) -> Result<Segmentation, SegmentError> {
    let (width, height) = img.dimensions();

    let gray = intensity_image(img);
    let tissue = tissue_mask(&gray, width, height, params);

    let mut masked = img.clone();
    for (x, y, pixel) in masked.enumerate_pixels_mut() {
        if !tissue.get(x, y) {
            *pixel = Rgb([0, 0, 0]);
        }
    }

    let color = Mask::from_fn(width, height, |x, y| {
        params.nucleus_color.contains_rgb(masked.get_pixel(x, y))
    })
    .and(&tissue);

    let mut intensity = intensity_image(&masked);
    let mut tissue_values: Vec<f32> = intensity
        .iter()
        .zip(tissue.bits())
        .filter_map(|(&v, &t)| t.then_some(v))
        .collect();
    let low = percentile(&mut tissue_values, params.low_percentile)
        .ok_or(SegmentError::EmptyTissue)?;
    let high = percentile(&mut tissue_values, params.high_percentile)
        .ok_or(SegmentError::EmptyTissue)?;
    rescale_intensity(&mut intensity, low, high);

    let dark = Mask::from_fn(width, height, |x, y| {
        intensity[y as usize * width as usize + x as usize] < params.intensity_threshold
    });

    let mut nuclei = color.and(&dark);
    nuclei.remove_small_objects(params.nucleus_min_size);
    nuclei.remove_small_holes(params.nucleus_hole_size);

    let (labels, count) = label(&nuclei);

    Ok(Segmentation {
        tissue,
        color,
        nuclei,
        labels,
        count,
        intensity,
        contrast_range: (low, high),
    })
}
