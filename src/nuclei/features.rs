//! Per-tile aggregate morphometry.

use crate::imaging::{mean, median, region_props, RegionProps};

use super::segment::Segmentation;

/// Aggregate statistics of the nuclei of one tile.
///
/// Aggregates are `None` when the tile has no nuclei.
#[derive(Debug, Clone, PartialEq)]
pub struct NucleiFeatures {
    pub count: u32,
    pub mean_area: Option<f64>,
    pub median_eccentricity: Option<f64>,
    pub mean_perimeter: Option<f64>,
    pub mean_solidity: Option<f64>,
}

impl NucleiFeatures {
    /// Aggregate region measurements. `count` is the largest label.
    pub fn from_regions(count: u32, regions: &[RegionProps]) -> Self {
        let collect = |f: fn(&RegionProps) -> f64| regions.iter().map(f).collect::<Vec<_>>();
        Self {
            count,
            mean_area: mean(&collect(|r| r.area as f64)),
            median_eccentricity: median(&collect(|r| r.eccentricity)),
            mean_perimeter: mean(&collect(|r| r.perimeter)),
            mean_solidity: mean(&collect(|r| r.solidity)),
        }
    }
}

/// Measure every labeled nucleus of a segmentation.
pub fn measure_nuclei(seg: &Segmentation) -> (Vec<RegionProps>, NucleiFeatures) {
    let regions = region_props(&seg.labels, seg.count, &seg.intensity);
    let features = NucleiFeatures::from_regions(seg.count, &regions);
    (regions, features)
}
