//! Shared test utilities for the gridstitch test suite.
//!
//! Builds synthetic rasters and writes them into temp directories, so tests
//! never depend on fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = write_png(tmp.path(), "photo.png", &gradient(64, 48));
//! assert_eq!(image::image_dimensions(&path).unwrap(), (64, 48));
//! ```

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// =========================================================================
// Synthetic rasters
// =========================================================================

/// Opaque mid-grey image.
pub fn solid_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

/// Half-transparent red image.
pub fn solid_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([255, 0, 0, 128]),
    ))
}

/// Opaque image whose pixels encode their own coordinates.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

// =========================================================================
// Files
// =========================================================================

/// Write `image` as PNG to `dir/name` and return the path.
pub fn write_png(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

// =========================================================================
// Polling
// =========================================================================

/// Poll `f` until it returns `Some` or `timeout` elapses.
pub fn wait_for<T>(timeout: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = f() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
