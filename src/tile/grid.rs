//! Region grid over the central part of a series.
//!
//! The outer quarter of each axis usually holds slide edges, labels and
//! coverslip artifacts, so only `[D/4, D - D/4)` is visited:
//!
//! ```text
//!   0        D/4                 D - D/4       D
//!   ┌─────────┬─────┬─────┬─────┬───┬─────────┐
//!   │         │ 448 │ 448 │ 448 │ r │         │   r = trailing remainder
//!   └─────────┴─────┴─────┴─────┴───┴─────────┘
//! ```

/// Default side of an extracted region, in series pixels
pub const DEFAULT_REGION_SIZE: u32 = 448;

/// A rectangle of series pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Non-overlapping regions covering the central half of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionGrid {
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
    pub step: u32,
}

impl RegionGrid {
    /// Grid over `[width/4, width - width/4) x [height/4, height - height/4)`.
    pub fn central(width: u32, height: u32, step: u32) -> Self {
        Self {
            x_start: width / 4,
            x_end: width - width / 4,
            y_start: height / 4,
            y_end: height - height / 4,
            step: step.max(1),
        }
    }

    /// Regions in column-major order: x outer, y inner. Trailing regions are
    /// cut to the grid bounds.
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        let step = self.step as usize;
        (self.x_start..self.x_end).step_by(step).flat_map(move |x| {
            (self.y_start..self.y_end).step_by(step).map(move |y| Region {
                x,
                y,
                width: self.step.min(self.x_end - x),
                height: self.step.min(self.y_end - y),
            })
        })
    }

    /// Number of regions the grid yields.
    pub fn len(&self) -> usize {
        let across = (self.x_end - self.x_start).div_ceil(self.step);
        let down = (self.y_end - self.y_start).div_ceil(self.step);
        across as usize * down as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
