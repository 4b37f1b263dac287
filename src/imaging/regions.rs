//! Connected-component labeling and per-region shape measurements.
//!
//! Measurements follow the usual region-property definitions:
//!
//! - **perimeter**: border pixels (region minus its 4-neighbourhood erosion)
//!   weighted by the configuration of their border neighbours, so straight
//!   runs count 1 per pixel and diagonal runs count sqrt(2).
//! - **eccentricity / orientation**: from the eigen-decomposition of the
//!   second central moments, in (row, column) coordinates.
//! - **solidity**: area over the pixel count of the convex hull image, the
//!   hull being taken over the midpoints of every pixel edge.

use std::f64::consts::{FRAC_PI_4, SQRT_2};

use image::{ImageBuffer, Luma};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::mask::Mask;

/// Label image: 0 for background, `1..=count` for components.
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Label 8-connected components of a mask.
///
/// Labels are assigned in raster order of each component's first pixel, so
/// the largest label equals the number of components.
pub fn label(mask: &Mask) -> (LabelImage, u32) {
    let labels = connected_components(&mask.to_gray(), Connectivity::Eight, Luma([0u8]));
    let count = labels.pixels().map(|p| p[0]).max().unwrap_or(0);
    (labels, count)
}

/// Measurements of one labeled region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProps {
    pub label: u32,
    /// Pixel count
    pub area: usize,
    /// (row, column) of the center of mass
    pub centroid: (f64, f64),
    /// (min_row, min_col, max_row, max_col), max exclusive
    pub bbox: (u32, u32, u32, u32),
    pub perimeter: f64,
    pub eccentricity: f64,
    /// Angle between the row axis and the major axis, in (-pi/2, pi/2]
    pub orientation: f64,
    pub solidity: f64,
    pub mean_intensity: f64,
}

/// Measure every region of `labels`. `intensity` is row-major and the same
/// shape as the label image.
pub fn region_props(labels: &LabelImage, count: u32, intensity: &[f32]) -> Vec<RegionProps> {
    let mut pixels: Vec<Vec<(u32, u32)>> = vec![Vec::new(); count as usize];
    for (x, y, p) in labels.enumerate_pixels() {
        if p[0] > 0 {
            pixels[p[0] as usize - 1].push((y, x));
        }
    }

    let width = labels.width() as usize;
    pixels
        .iter()
        .enumerate()
        .filter(|(_, coords)| !coords.is_empty())
        .map(|(i, coords)| measure(i as u32 + 1, coords, intensity, width))
        .collect()
}

fn measure(label: u32, coords: &[(u32, u32)], intensity: &[f32], width: usize) -> RegionProps {
    let area = coords.len();
    let n = area as f64;

    let (mut min_r, mut min_c, mut max_r, mut max_c) = (u32::MAX, u32::MAX, 0, 0);
    let (mut sum_r, mut sum_c, mut sum_i) = (0f64, 0f64, 0f64);
    for &(r, c) in coords {
        min_r = min_r.min(r);
        min_c = min_c.min(c);
        max_r = max_r.max(r);
        max_c = max_c.max(c);
        sum_r += r as f64;
        sum_c += c as f64;
        sum_i += intensity[r as usize * width + c as usize] as f64;
    }
    let centroid = (sum_r / n, sum_c / n);

    let (mut var_r, mut var_c, mut cov) = (0f64, 0f64, 0f64);
    for &(r, c) in coords {
        let dr = r as f64 - centroid.0;
        let dc = c as f64 - centroid.1;
        var_r += dr * dr;
        var_c += dc * dc;
        cov += dr * dc;
    }
    var_r /= n;
    var_c /= n;
    cov /= n;

    let local = LocalGrid::new(coords, min_r, min_c, max_r, max_c);

    RegionProps {
        label,
        area,
        centroid,
        bbox: (min_r, min_c, max_r + 1, max_c + 1),
        perimeter: local.perimeter(),
        eccentricity: eccentricity(var_r, var_c, cov),
        orientation: orientation(var_r, var_c, cov),
        solidity: n / local.convex_area(coords) as f64,
        mean_intensity: sum_i / n,
    }
}

fn eccentricity(var_r: f64, var_c: f64, cov: f64) -> f64 {
    let half_trace = (var_r + var_c) / 2.0;
    let spread = (((var_r - var_c) / 2.0).powi(2) + cov * cov).sqrt();
    let l1 = (half_trace + spread).max(0.0);
    let l2 = (half_trace - spread).max(0.0);
    if l1 == 0.0 {
        0.0
    } else {
        (1.0 - l2 / l1).sqrt()
    }
}

fn orientation(var_r: f64, var_c: f64, cov: f64) -> f64 {
    // Inertia tensor [[a, b], [b, c]]
    let (a, b, c) = (var_c, -cov, var_r);
    if a - c == 0.0 {
        if b < 0.0 {
            -FRAC_PI_4
        } else {
            FRAC_PI_4
        }
    } else {
        0.5 * (-2.0 * b).atan2(c - a)
    }
}

/// The region's bounding box with a one pixel zero margin.
struct LocalGrid {
    min_r: u32,
    min_c: u32,
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl LocalGrid {
    fn new(coords: &[(u32, u32)], min_r: u32, min_c: u32, max_r: u32, max_c: u32) -> Self {
        let width = (max_c - min_c) as usize + 3;
        let height = (max_r - min_r) as usize + 3;
        let mut cells = vec![false; width * height];
        for &(r, c) in coords {
            cells[((r - min_r) as usize + 1) * width + (c - min_c) as usize + 1] = true;
        }
        Self {
            min_r,
            min_c,
            width,
            height,
            cells,
        }
    }

    fn index(&self, r: usize, c: usize) -> usize {
        r * self.width + c
    }

    fn perimeter(&self) -> f64 {
        let mut border = vec![false; self.cells.len()];
        for r in 1..self.height - 1 {
            for c in 1..self.width - 1 {
                let i = self.index(r, c);
                if !self.cells[i] {
                    continue;
                }
                let interior = self.cells[i - 1]
                    && self.cells[i + 1]
                    && self.cells[i - self.width]
                    && self.cells[i + self.width];
                border[i] = !interior;
            }
        }

        let mut total = 0.0;
        for r in 1..self.height - 1 {
            for c in 1..self.width - 1 {
                let i = self.index(r, c);
                if !border[i] {
                    continue;
                }
                let edges = [i - 1, i + 1, i - self.width, i + self.width]
                    .iter()
                    .filter(|&&j| border[j])
                    .count();
                let corners = [
                    i - self.width - 1,
                    i - self.width + 1,
                    i + self.width - 1,
                    i + self.width + 1,
                ]
                .iter()
                .filter(|&&j| border[j])
                .count();
                total += border_weight(1 + 2 * edges + 10 * corners);
            }
        }
        total
    }

    /// Pixels of the bounding box whose centers lie inside or on the convex
    /// hull of the region's pixel-edge midpoints.
    fn convex_area(&self, coords: &[(u32, u32)]) -> usize {
        // Doubled coordinates keep the edge midpoints integral
        let mut points = Vec::with_capacity(coords.len() * 4);
        for &(r, c) in coords {
            let (y, x) = (2 * (r - self.min_r) as i64, 2 * (c - self.min_c) as i64);
            points.push(Point::new(x + 1, y));
            points.push(Point::new(x - 1, y));
            points.push(Point::new(x, y + 1));
            points.push(Point::new(x, y - 1));
        }
        let hull = convex_hull(points);
        if hull.len() < 3 {
            return coords.len();
        }

        let mut count = 0;
        for r in 0..self.height - 2 {
            for c in 0..self.width - 2 {
                if inside_convex(&hull, Point::new(2 * c as i64, 2 * r as i64)) {
                    count += 1;
                }
            }
        }
        count.max(coords.len())
    }
}

fn border_weight(code: usize) -> f64 {
    match code {
        5 | 7 | 15 | 17 | 25 | 27 => 1.0,
        21 | 33 => SQRT_2,
        13 | 23 => (1.0 + SQRT_2) / 2.0,
        _ => 0.0,
    }
}

/// Point-in-convex-polygon test for either vertex winding; points on an
/// edge count as inside.
fn inside_convex(hull: &[Point<i64>], p: Point<i64>) -> bool {
    let (mut positive, mut negative) = (false, false);
    for (i, a) in hull.iter().enumerate() {
        let b = hull[(i + 1) % hull.len()];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        positive |= cross > 0;
        negative |= cross < 0;
        if positive && negative {
            return false;
        }
    }
    true
}
