//! High-level in-memory raster operations.
//!
//! These functions combine the pure geometry in
//! [`calculations`](super::calculations) with `image` crate primitives. They
//! never touch the filesystem; the split/stitch entry points do I/O through
//! an [`ImageBackend`](super::ImageBackend).
//!
//! All inputs are expected to be `Rgb8` or `Rgba8` (see
//! [`normalize_color`](super::source::normalize_color)).

use super::calculations::{
    Region, center_offset, fit_within, scaled_height, square_crop, target_width,
};
use super::params::{OutputFormat, StitchMode};
use super::source::ColorMode;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

/// Resampling filter for every downscale/upscale in the crate.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Background for `Fill` padding on opaque canvases.
const FILL_OPAQUE: Rgb<u8> = Rgb([255, 255, 255]);
/// Background for `Fill` padding on alpha canvases: fully transparent white.
const FILL_TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Copy a region out of an image.
pub fn crop_region(image: &DynamicImage, region: Region) -> DynamicImage {
    image.crop_imm(region.left, region.top, region.width(), region.height())
}

/// Normalize one image to `target` width under `mode`.
///
/// An image already `target` wide is returned untouched regardless of mode.
/// Otherwise:
/// - `Resize`: uniform Lanczos3 scale, height rounded.
/// - `Crop`: horizontal center crop, full height kept.
/// - `Fill`: centered on a `target`-wide canvas of the image's own color mode,
///   margins white (opaque) or transparent (alpha).
pub fn normalize_width(image: DynamicImage, mode: StitchMode, target: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width == target {
        return image;
    }

    match mode {
        StitchMode::Resize => {
            let new_height = scaled_height(width, height, target);
            image.resize_exact(target, new_height, RESAMPLE_FILTER)
        }
        StitchMode::Crop => {
            let left = center_offset(width, target);
            image.crop_imm(left, 0, target, height)
        }
        StitchMode::Fill => {
            let left = center_offset(target, width) as i64;
            match ColorMode::of(&image) {
                ColorMode::Rgba => {
                    let mut canvas = RgbaImage::from_pixel(target, height, FILL_TRANSPARENT);
                    imageops::replace(&mut canvas, &image.to_rgba8(), left, 0);
                    DynamicImage::ImageRgba8(canvas)
                }
                ColorMode::Rgb => {
                    let mut canvas = RgbImage::from_pixel(target, height, FILL_OPAQUE);
                    imageops::replace(&mut canvas, &image.to_rgb8(), left, 0);
                    DynamicImage::ImageRgb8(canvas)
                }
            }
        }
    }
}

/// Stack `images` top to bottom after normalizing them to a common width.
///
/// The canvas is RGBA if any normalized image carries alpha, RGB otherwise.
/// Opaque images pasted onto an RGBA canvas keep full opacity. Returns `None`
/// for an empty input.
pub fn compose_vertical(images: Vec<DynamicImage>, mode: StitchMode) -> Option<DynamicImage> {
    let widths: Vec<u32> = images.iter().map(DynamicImage::width).collect();
    let target = target_width(mode, &widths)?;

    let normalized: Vec<DynamicImage> = images
        .into_iter()
        .map(|img| normalize_width(img, mode, target))
        .collect();

    let total_height: u32 = normalized.iter().map(DynamicImage::height).sum();
    let any_alpha = normalized.iter().any(|img| img.color().has_alpha());

    let composite = if any_alpha {
        let mut canvas = RgbaImage::new(target, total_height);
        let mut y = 0i64;
        for img in &normalized {
            imageops::replace(&mut canvas, &img.to_rgba8(), 0, y);
            y += img.height() as i64;
        }
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas = RgbImage::new(target, total_height);
        let mut y = 0i64;
        for img in &normalized {
            imageops::replace(&mut canvas, &img.to_rgb8(), 0, y);
            y += img.height() as i64;
        }
        DynamicImage::ImageRgb8(canvas)
    };
    Some(composite)
}

/// Composite an RGBA raster onto opaque white. Opaque rasters pass through.
pub fn flatten_alpha(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }
    let rgba = image.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(flat)
}

/// Make a raster encodable as `format`: flatten alpha when the format has none.
pub fn prepare_for_format(image: DynamicImage, format: OutputFormat) -> DynamicImage {
    if format.supports_alpha() {
        image
    } else {
        flatten_alpha(image)
    }
}

/// Downscale to fit a `max × max` box, preserving aspect ratio. Never upscales.
pub fn fit_to_box(image: DynamicImage, max: u32) -> DynamicImage {
    match fit_within(image.width(), image.height(), max) {
        Some((w, h)) => image.resize_exact(w, h, RESAMPLE_FILTER),
        None => image,
    }
}

/// Center-crop to the largest square, then downscale to at most `size × size`.
pub fn square_thumbnail(image: &DynamicImage, size: u32) -> DynamicImage {
    let square = crop_region(image, square_crop(image.width(), image.height()));
    fit_to_box(square, size)
}
