//! Centralized output naming for split cells and stitched composites.
//!
//! Every file the crate writes gets its name here, so split and stitch agree
//! on extensions and the CLI can predict output paths.
//!
//! ## Split cells
//!
//! `{source_stem}_{n}.{ext}` with `n` counting from 1 in row-major order:
//! - `holiday.png` split 2×2 → `holiday_1.png` … `holiday_4.png`
//! - with `--format jpg` → `holiday_1.jpg` … `holiday_4.jpg`
//!
//! ## Stitched composites
//!
//! The output path's extension and the requested format are reconciled by
//! [`resolve_stitch_output`]. Without an explicit path the composite is named
//! `stitched_{first_stem}` (see [`default_stitch_output`]).

use crate::error::ProcessError;
use crate::imaging::{OutputFormat, SourceId};
use std::path::{Path, PathBuf};

/// Format used when neither the caller nor the source names one.
pub const DEFAULT_FORMAT: OutputFormat = OutputFormat::Jpeg;

/// Prefix of the default composite name.
pub const STITCHED_PREFIX: &str = "stitched_";

/// File name of the `index`-th (1-based) split cell.
pub fn split_output_name(stem: &str, index: usize, ext: &str) -> String {
    format!("{stem}_{index}.{ext}")
}

/// Extension and encoder for a source's split cells.
///
/// An explicit format wins and uses its canonical extension. Otherwise the
/// source's own extension is kept verbatim (`.JPEG` stays `.JPEG`) when an
/// encoder exists for it; anything else falls back to [`DEFAULT_FORMAT`].
pub fn resolve_split_target(
    source: &SourceId,
    explicit: Option<OutputFormat>,
) -> (String, OutputFormat) {
    if let Some(format) = explicit {
        return (format.extension().to_string(), format);
    }
    match source.extension() {
        Some(ext) => match OutputFormat::from_extension(&ext) {
            Some(format) => (ext, format),
            None => (DEFAULT_FORMAT.extension().to_string(), DEFAULT_FORMAT),
        },
        None => (DEFAULT_FORMAT.extension().to_string(), DEFAULT_FORMAT),
    }
}

/// Reconcile a stitch output path with an optional explicit format.
///
/// - Explicit format matching the path's extension (any spelling): path kept.
/// - Explicit format differing from it: the extension is rewritten.
/// - No explicit format: the path's extension decides; a path without one
///   gets [`DEFAULT_FORMAT`], an unknown one is rejected.
pub fn resolve_stitch_output(
    path: &Path,
    explicit: Option<OutputFormat>,
) -> Result<(PathBuf, OutputFormat), ProcessError> {
    let path_ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty());
    let path_format = path_ext.as_deref().and_then(OutputFormat::from_extension);

    match (explicit, path_format, path_ext) {
        (Some(format), Some(existing), _) if format == existing => {
            Ok((path.to_path_buf(), format))
        }
        (Some(format), _, _) => Ok((path.with_extension(format.extension()), format)),
        (None, Some(existing), _) => Ok((path.to_path_buf(), existing)),
        (None, None, None) => Ok((
            path.with_extension(DEFAULT_FORMAT.extension()),
            DEFAULT_FORMAT,
        )),
        (None, None, Some(ext)) => Err(ProcessError::invalid(format!(
            "no encoder for extension '.{ext}' of {}; pass an explicit format",
            path.display()
        ))),
    }
}

/// File stem of the default composite: `stitched_<first stem>`.
pub fn stitched_file_stem(first: &SourceId) -> String {
    format!("{STITCHED_PREFIX}{}", first.stem())
}

/// Default composite path for a stitch of sources starting with `first`.
///
/// Placed in `output_dir`, else next to the first source, else the working
/// directory. The path carries no extension: [`resolve_stitch_output`] picks
/// the format, which is [`DEFAULT_FORMAT`] unless one is requested.
pub fn default_stitch_output(first: &SourceId, output_dir: Option<&Path>) -> PathBuf {
    let dir = output_dir
        .or_else(|| first.parent_dir())
        .unwrap_or_else(|| Path::new(""));
    dir.join(stitched_file_stem(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn split_names_count_from_one() {
        assert_eq!(split_output_name("holiday", 1, "png"), "holiday_1.png");
        assert_eq!(split_output_name("a.b", 10, "jpg"), "a.b_10.jpg");
    }

    #[test]
    fn split_target_prefers_explicit_format() {
        let src = SourceId::path("/in/photo.png");
        assert_eq!(
            resolve_split_target(&src, Some(OutputFormat::Jpeg)),
            ("jpg".to_string(), OutputFormat::Jpeg)
        );
    }

    #[test]
    fn split_target_keeps_source_spelling() {
        let src = SourceId::path("/in/photo.JPEG");
        assert_eq!(
            resolve_split_target(&src, None),
            ("JPEG".to_string(), OutputFormat::Jpeg)
        );
    }

    #[test]
    fn split_target_defaults_without_usable_extension() {
        let no_ext = SourceId::memory("clipboard", vec![0u8]);
        assert_eq!(
            resolve_split_target(&no_ext, None),
            ("jpg".to_string(), OutputFormat::Jpeg)
        );
        let odd = SourceId::path("/in/scan.jfif");
        assert_eq!(resolve_split_target(&odd, None).1, OutputFormat::Jpeg);
    }

    #[test]
    fn stitch_output_rewrites_mismatched_extension() {
        let (path, format) =
            resolve_stitch_output(Path::new("/out/combo.jpg"), Some(OutputFormat::Png)).unwrap();
        assert_eq!(path, PathBuf::from("/out/combo.png"));
        assert_eq!(format, OutputFormat::Png);
    }

    #[test]
    fn stitch_output_keeps_equivalent_spelling() {
        let (path, format) =
            resolve_stitch_output(Path::new("/out/combo.jpeg"), Some(OutputFormat::Jpeg)).unwrap();
        assert_eq!(path, PathBuf::from("/out/combo.jpeg"));
        assert_eq!(format, OutputFormat::Jpeg);
    }

    #[test]
    fn stitch_output_uses_path_extension() {
        let (path, format) = resolve_stitch_output(Path::new("/out/combo.webp"), None).unwrap();
        assert_eq!(path, PathBuf::from("/out/combo.webp"));
        assert_eq!(format, OutputFormat::WebP);
    }

    #[test]
    fn stitch_output_defaults_when_path_has_no_extension() {
        let (path, format) = resolve_stitch_output(Path::new("/out/combo"), None).unwrap();
        assert_eq!(path, PathBuf::from("/out/combo.jpg"));
        assert_eq!(format, OutputFormat::Jpeg);
    }

    #[test]
    fn stitch_output_rejects_unknown_extension() {
        let err = resolve_stitch_output(Path::new("/out/combo.xyz"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn stitch_output_explicit_format_overrides_unknown_extension() {
        let (path, _) =
            resolve_stitch_output(Path::new("/out/combo.xyz"), Some(OutputFormat::Png)).unwrap();
        assert_eq!(path, PathBuf::from("/out/combo.png"));
    }

    #[test]
    fn default_stitch_name_follows_first_source() {
        let first = SourceId::path("/photos/001-dawn.png");
        assert_eq!(stitched_file_stem(&first), "stitched_001-dawn");
        assert_eq!(
            default_stitch_output(&first, None),
            PathBuf::from("/photos/stitched_001-dawn")
        );
        assert_eq!(
            default_stitch_output(&first, Some(Path::new("/out"))),
            PathBuf::from("/out/stitched_001-dawn")
        );
    }

    #[test]
    fn default_stitch_output_ignores_first_source_format() {
        let first = SourceId::path("/photos/top.png");
        let default = default_stitch_output(&first, None);

        let (path, format) = resolve_stitch_output(&default, None).unwrap();
        assert_eq!(path, PathBuf::from("/photos/stitched_top.jpg"));
        assert_eq!(format, OutputFormat::Jpeg);

        let (path, format) = resolve_stitch_output(&default, Some(OutputFormat::Png)).unwrap();
        assert_eq!(path, PathBuf::from("/photos/stitched_top.png"));
        assert_eq!(format, OutputFormat::Png);
    }

    #[test]
    fn default_stitch_name_for_memory_source() {
        let first = SourceId::memory("pasted", vec![0u8]);
        assert_eq!(
            default_stitch_output(&first, None),
            PathBuf::from("stitched_pasted")
        );
    }
}
