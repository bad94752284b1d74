//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are shared by
//! the [`split`](crate::split) and [`stitch`](crate::stitch) entry points, the
//! preview/thumbnail pipelines, and the config layer.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`GridSpec`]: Rows × columns for a split. Validated by the splitter, not here.
//! - [`StitchMode`]: Width-normalization policy before vertical composition.
//! - [`PreviewPreset`]: Named preview box sizes (low, medium, high).
//! - [`OutputFormat`]: Encoders the crate can write, with their capabilities.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
///
/// Every construction path, serde included, goes through [`Quality::new`],
/// so the value is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Grid dimensions for a split: `rows × cols` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
}

impl GridSpec {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Both dimensions must be at least 1.
    pub fn is_valid(&self) -> bool {
        self.rows >= 1 && self.cols >= 1
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { rows: 2, cols: 2 }
    }
}

/// How images of differing widths are normalized before vertical concatenation.
///
/// - `Resize`: scale every image to the widest width, preserving aspect ratio.
/// - `Crop`: center-crop every image to the narrowest width.
/// - `Fill`: pad every image to the widest width with a background margin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchMode {
    #[default]
    Resize,
    Crop,
    Fill,
}

impl StitchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StitchMode::Resize => "resize",
            StitchMode::Crop => "crop",
            StitchMode::Fill => "fill",
        }
    }
}

impl fmt::Display for StitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized stitch mode or output format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseParamError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for StitchMode {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resize" => Ok(StitchMode::Resize),
            "crop" => Ok(StitchMode::Crop),
            "fill" => Ok(StitchMode::Fill),
            _ => Err(ParseParamError {
                kind: "stitch mode",
                value: s.to_string(),
                expected: "resize, crop, fill",
            }),
        }
    }
}

/// Named preview box sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewPreset {
    #[default]
    Low,
    Medium,
    High,
}

impl PreviewPreset {
    /// Edge of the box each source is fitted into.
    pub fn max_width(self) -> u32 {
        match self {
            PreviewPreset::Low => 300,
            PreviewPreset::Medium => 600,
            PreviewPreset::High => 1000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PreviewPreset::Low => "low",
            PreviewPreset::Medium => "medium",
            PreviewPreset::High => "high",
        }
    }
}

impl fmt::Display for PreviewPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewPreset {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PreviewPreset::Low),
            "medium" => Ok(PreviewPreset::Medium),
            "high" => Ok(PreviewPreset::High),
            _ => Err(ParseParamError {
                kind: "preview preset",
                value: s.to_string(),
                expected: "low, medium, high",
            }),
        }
    }
}

/// Output encoders compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    WebP,
    Bmp,
    Gif,
    #[serde(alias = "tif")]
    Tiff,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Bmp,
        OutputFormat::Gif,
        OutputFormat::Tiff,
        OutputFormat::Avif,
    ];

    /// Map a file extension (case-insensitive, without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            "bmp" => Some(OutputFormat::Bmp),
            "gif" => Some(OutputFormat::Gif),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "avif" => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    /// Canonical extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Avif => "avif",
        }
    }

    /// Whether the encoder can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Whether an EXIF blob can be carried into the encoded file.
    pub fn supports_exif(self) -> bool {
        matches!(
            self,
            OutputFormat::Jpeg | OutputFormat::Png | OutputFormat::WebP | OutputFormat::Avif
        )
    }

    /// Whether [`Quality`] affects the encoder.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Avif)
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Avif => ImageFormat::Avif,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.image_format() == format)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.')).ok_or_else(|| ParseParamError {
            kind: "output format",
            value: s.to_string(),
            expected: "jpg, png, webp, bmp, gif, tiff, avif",
        })
    }
}
