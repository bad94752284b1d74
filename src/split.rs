//! Splitter: cut one image into a `rows × cols` grid of files.
//!
//! ```text
//! holiday.png (101×60), 2×2        out/
//! ┌──────┬───────┐                 ├── holiday_1.png   50×30
//! │  1   │   2   │                 ├── holiday_2.png   51×30
//! ├──────┼───────┤       →         ├── holiday_3.png   50×30
//! │  3   │   4   │                 └── holiday_4.png   51×30
//! └──────┴───────┘
//! ```
//!
//! The regions come from [`grid_regions`](crate::imaging::grid_regions) and
//! cover the source exactly. Cells are written in row-major order; the first
//! failing write aborts the rest and already-written cells stay on disk.

use crate::error::ProcessError;
use crate::imaging::operations::{crop_region, prepare_for_format};
use crate::imaging::{
    EncodeParams, GridSpec, ImageBackend, OutputFormat, Quality, SourceId, grid_regions,
};
use crate::naming::{resolve_split_target, split_output_name};
use std::path::{Path, PathBuf};

/// Parameters of one split.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitOptions {
    pub grid: GridSpec,
    /// `None` keeps the source's extension when it can be encoded.
    pub format: Option<OutputFormat>,
    pub quality: Quality,
}

/// Split `source` into grid cells written to `output_dir`.
///
/// Returns the written paths in row-major order. `output_dir` must exist.
pub fn split(
    backend: &impl ImageBackend,
    source: &SourceId,
    output_dir: &Path,
    options: &SplitOptions,
) -> Result<Vec<PathBuf>, ProcessError> {
    let grid = options.grid;
    if !grid.is_valid() {
        return Err(ProcessError::invalid(format!(
            "grid must have at least one row and column, got {}x{}",
            grid.rows, grid.cols
        )));
    }
    if !output_dir.is_dir() {
        return Err(ProcessError::Io {
            path: output_dir.to_path_buf(),
            message: "output directory does not exist".to_string(),
        });
    }

    let image = backend.open(source)?;
    let (width, height) = (image.width(), image.height());
    if grid.cols > width || grid.rows > height {
        return Err(ProcessError::invalid(format!(
            "{}x{} grid is finer than the {width}x{height} image {source}",
            grid.rows, grid.cols
        )));
    }

    let (ext, format) = resolve_split_target(source, options.format);
    let stem = source.stem();
    let params = EncodeParams {
        format,
        quality: options.quality,
        exif: image.exif.as_deref(),
    };

    let regions = grid_regions(width, height, grid);
    let mut outputs = Vec::with_capacity(regions.len());
    for (i, region) in regions.into_iter().enumerate() {
        let path = output_dir.join(split_output_name(&stem, i + 1, &ext));
        let cell = prepare_for_format(crop_region(&image.image, region), format);
        backend.save(&cell, &path, &params)?;
        tracing::debug!(source = %source, output = %path.display(), ?region, "wrote cell");
        outputs.push(path);
    }

    tracing::info!(
        source = %source,
        cells = outputs.len(),
        dir = %output_dir.display(),
        "split complete"
    );
    Ok(outputs)
}
