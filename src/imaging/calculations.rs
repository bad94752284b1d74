//! Pure calculation functions for split and stitch geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{GridSpec, StitchMode};

/// A rectangle in source pixel coordinates, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Split a `width × height` image into `grid.rows × grid.cols` regions.
///
/// Cells have a nominal size of `floor(width / cols) × floor(height / rows)`;
/// the last column and last row absorb the remainder so the regions cover the
/// source exactly. Regions are returned in row-major order.
///
/// The grid must be valid (`rows, cols ≥ 1`).
///
/// # Examples
/// ```
/// # use gridstitch::imaging::{GridSpec, grid_regions};
/// let regions = grid_regions(101, 100, GridSpec::new(1, 2));
/// assert_eq!(regions[0].width(), 50);
/// assert_eq!(regions[1].width(), 51); // last column absorbs the remainder
/// ```
pub fn grid_regions(width: u32, height: u32, grid: GridSpec) -> Vec<Region> {
    let cell_w = width / grid.cols;
    let cell_h = height / grid.rows;

    let mut regions = Vec::with_capacity(grid.cell_count());
    for r in 0..grid.rows {
        for c in 0..grid.cols {
            let right = if c == grid.cols - 1 {
                width
            } else {
                (c + 1) * cell_w
            };
            let bottom = if r == grid.rows - 1 {
                height
            } else {
                (r + 1) * cell_h
            };
            regions.push(Region {
                left: c * cell_w,
                top: r * cell_h,
                right,
                bottom,
            });
        }
    }
    regions
}

/// Common width every image is normalized to before stacking.
///
/// `Crop` narrows to the minimum width; `Resize` and `Fill` widen to the
/// maximum. Returns `None` for an empty input.
pub fn target_width(mode: StitchMode, widths: &[u32]) -> Option<u32> {
    let widths = widths.iter().copied();
    match mode {
        StitchMode::Crop => widths.min(),
        StitchMode::Resize | StitchMode::Fill => widths.max(),
    }
}

/// Height after scaling `width × height` uniformly to `target_width`.
///
/// Rounded to the nearest pixel, never below 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let h = (target_width as f64 * height as f64 / width as f64).round() as u32;
    h.max(1)
}

/// Offset that centers `inner` within `outer` (floored; `inner ≤ outer`).
pub fn center_offset(outer: u32, inner: u32) -> u32 {
    (outer - inner) / 2
}

/// Largest centered square inside a `width × height` image.
pub fn square_crop(width: u32, height: u32) -> Region {
    let side = width.min(height);
    let left = center_offset(width, side);
    let top = center_offset(height, side);
    Region {
        left,
        top,
        right: left + side,
        bottom: top + side,
    }
}

/// Dimensions that fit `width × height` inside a `max × max` box.
///
/// Preserves aspect ratio and never upscales: returns `None` when the image
/// already fits.
pub fn fit_within(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width <= max && height <= max {
        return None;
    }
    if width >= height {
        let h = (max as f64 * height as f64 / width as f64).round() as u32;
        Some((max, h.max(1)))
    } else {
        let w = (max as f64 * width as f64 / height as f64).round() as u32;
        Some((w.max(1), max))
    }
}
