//! Boolean pixel masks and their morphological cleanup.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};

const FOREGROUND: u8 = 255;

/// A boolean grid, row-major, the same shape as the image it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// An all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// A mask from row-major flags. Returns `None` on a length mismatch.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Option<Self> {
        (bits.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            bits,
        })
    }

    /// A mask with `f(x, y)` at every position.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Nonzero pixels of a grayscale image.
    pub fn from_gray(img: &GrayImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            bits: img.pixels().map(|p| p[0] > 0).collect(),
        }
    }

    /// Foreground as 255, background as 0.
    pub fn to_gray(&self) -> GrayImage {
        let raw = self
            .bits
            .iter()
            .map(|&b| if b { FOREGROUND } else { 0 })
            .collect();
        // Length matches by construction
        GrayImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.bits[y as usize * self.width as usize + x as usize] = value;
    }

    /// Row-major flags.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Pixel-wise AND with a mask of the same shape.
    pub fn and(&self, other: &Mask) -> Mask {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        Mask {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| a && b)
                .collect(),
        }
    }

    /// Pixel-wise NOT.
    pub fn not(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            bits: self.bits.iter().map(|&b| !b).collect(),
        }
    }

    /// Clear 4-connected foreground components of fewer than `min_size` pixels.
    pub fn remove_small_objects(&mut self, min_size: usize) {
        if min_size == 0 {
            return;
        }
        let labels = connected_components(&self.to_gray(), Connectivity::Four, Luma([0u8]));

        let mut sizes: Vec<usize> = Vec::new();
        for label in labels.pixels().map(|p| p[0] as usize) {
            if label >= sizes.len() {
                sizes.resize(label + 1, 0);
            }
            sizes[label] += 1;
        }

        for (bit, label) in self.bits.iter_mut().zip(labels.pixels()) {
            let label = label[0] as usize;
            if label != 0 && sizes[label] < min_size {
                *bit = false;
            }
        }
    }

    /// Fill 4-connected background components of fewer than `area_threshold`
    /// pixels, including components that touch the image border.
    pub fn remove_small_holes(&mut self, area_threshold: usize) {
        let mut holes = self.not();
        holes.remove_small_objects(area_threshold);
        *self = holes.not();
    }

    /// Morphological closing with a Euclidean disk of the given radius.
    ///
    /// Pixels outside the image do not erode the result.
    pub fn close_disk(&self, radius: u8) -> Mask {
        let closed = morphology::close(&self.to_gray(), Norm::L2, radius);
        Mask::from_gray(&closed)
    }
}
