//! Raster backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the boundary between the split/stitch logic
//! and file/byte I/O. It has two operations: open (read + decode a source)
//! and save (encode + write a raster). Everything in between (crop, resize,
//! paste, flatten) is pure in-memory work in
//! [`operations`](super::operations).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{OutputFormat, Quality};
use super::source::{SourceId, SourceImage};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode {input}: {message}")]
    Decode { input: String, message: String },
    #[error("Failed to encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("{format} cannot encode this raster: {message}")]
    Unsupported {
        format: OutputFormat,
        message: String,
    },
}

/// Encoder settings for a single save.
#[derive(Debug, Clone, Copy)]
pub struct EncodeParams<'a> {
    pub format: OutputFormat,
    pub quality: Quality,
    /// EXIF payload to carry over; ignored when the format cannot hold it.
    pub exif: Option<&'a [u8]>,
}

/// Trait for raster backends.
///
/// `Sync` so one backend can serve rayon jobs and pipeline workers at once.
pub trait ImageBackend: Sync {
    /// Read and decode a source, normalizing pixels to 8-bit RGB/RGBA.
    fn open(&self, source: &SourceId) -> Result<SourceImage, BackendError>;

    /// Encode `image` and write it to `path`.
    ///
    /// The raster must already be compatible with `params.format` (callers
    /// flatten alpha for formats without it).
    fn save(&self, image: &DynamicImage, path: &Path, params: &EncodeParams)
    -> Result<(), BackendError>;
}
