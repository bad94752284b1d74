//! Compositor, file mode: stack sources top to bottom into one file.
//!
//! Widths are normalized per [`StitchMode`] by
//! [`compose_vertical`](crate::imaging::operations::compose_vertical); this
//! module adds the file-level concerns: decoding every source, reconciling
//! the output path with the requested format, flattening alpha for formats
//! without it, and carrying the first source's EXIF.

use crate::error::ProcessError;
use crate::imaging::operations::{compose_vertical, prepare_for_format};
use crate::imaging::{EncodeParams, ImageBackend, OutputFormat, Quality, SourceId, StitchMode};
use crate::naming::resolve_stitch_output;
use std::path::{Path, PathBuf};

/// Parameters of one stitch.
#[derive(Debug, Clone, Copy, Default)]
pub struct StitchOptions {
    pub mode: StitchMode,
    /// `None` keeps the output path's extension.
    pub format: Option<OutputFormat>,
    pub quality: Quality,
}

/// Stitch `sources` in order into `output_path`.
///
/// Returns the path actually written, which differs from `output_path` when
/// the requested format forced a new extension. Needs at least two sources.
pub fn stitch(
    backend: &impl ImageBackend,
    sources: &[SourceId],
    output_path: &Path,
    options: &StitchOptions,
) -> Result<PathBuf, ProcessError> {
    if sources.len() < 2 {
        return Err(ProcessError::invalid(format!(
            "stitching needs at least 2 images, got {}",
            sources.len()
        )));
    }
    let (path, format) = resolve_stitch_output(output_path, options.format)?;

    let mut images = Vec::with_capacity(sources.len());
    let mut exif = None;
    for (i, source) in sources.iter().enumerate() {
        let decoded = backend.open(source)?;
        if i == 0 {
            exif = decoded.exif;
        }
        images.push(decoded.image);
    }

    let composite = compose_vertical(images, options.mode)
        .ok_or_else(|| ProcessError::invalid("nothing to stitch"))?;
    let (width, height) = (composite.width(), composite.height());
    let composite = prepare_for_format(composite, format);

    let params = EncodeParams {
        format,
        quality: options.quality,
        exif: exif.as_deref(),
    };
    backend.save(&composite, &path, &params)?;

    tracing::info!(
        sources = sources.len(),
        mode = %options.mode,
        width,
        height,
        output = %path.display(),
        "stitch complete"
    );
    Ok(path)
}
