//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (content sniffing) |
//! | **Crop / split** | `DynamicImage::crop_imm` |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Stitch** | `imageops::replace` onto an RGB or RGBA canvas |
//! | **EXIF** | `ImageDecoder::exif_metadata` / `ImageEncoder::set_exif_metadata` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for grid and stitch geometry (unit testable)
//! - **Parameters**: Data structures describing formats, grids and modes
//! - **Source**: Input identities and decoded rasters
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: In-memory raster transforms used by split, stitch,
//!   preview and thumbnails

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod source;

pub use backend::{BackendError, EncodeParams, ImageBackend};
pub use calculations::{Region, grid_regions};
pub use params::{GridSpec, OutputFormat, ParseParamError, PreviewPreset, Quality, StitchMode};
pub use rust_backend::{RustBackend, collect_images, supported_input_extensions};
pub use source::{ColorMode, SourceId, SourceImage};
