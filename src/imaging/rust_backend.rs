//! Pure Rust backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image::ImageReader` with content sniffing |
//! | EXIF read | `ImageDecoder::exif_metadata` (JPEG, PNG, WebP) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality honored) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → PNG, WebP (lossless), BMP, TIFF | the format's `ImageEncoder` |
//! | Encode → GIF | `DynamicImage::write_to` |
//! | EXIF write | `ImageEncoder::set_exif_metadata` (JPEG, PNG, WebP, AVIF) |
//!
//! Encoding happens into a memory buffer so a failed encode never leaves a
//! partial file behind.

use super::backend::{BackendError, EncodeParams, ImageBackend};
use super::params::OutputFormat;
use super::source::{SourceId, SourceImage, normalize_color};
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageError, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// Extensions whose decoders are compiled in.
///
/// AVIF is absent: the `image` crate's `"avif"` feature only enables the
/// encoder, yet `ImageFormat::reading_enabled()` reports `true` for it.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("bmp", ImageFormat::Bmp),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension we can decode (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// List the decodable images anywhere under `dir`, sorted by path.
///
/// Subdirectories are walked recursively; other files are ignored.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
    let mut images = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| BackendError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct Decoded {
    image: DynamicImage,
    format: Option<ImageFormat>,
    exif: Option<Vec<u8>>,
}

/// Decode raw bytes, sniffing the container from content rather than name.
fn decode_bytes(source: &SourceId, bytes: &[u8]) -> Result<Decoded, BackendError> {
    let decode_err = |message: String| BackendError::Decode {
        input: source.to_string(),
        message,
    };
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;
    let format = reader.format();
    if format.is_none() {
        return Err(decode_err("unrecognized image format".to_string()));
    }
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| decode_err(e.to_string()))?;
    let exif = match decoder.exif_metadata() {
        Ok(exif) => exif.filter(|blob| !blob.is_empty()),
        Err(e) => {
            tracing::debug!(source = %source, error = %e, "unreadable EXIF ignored");
            None
        }
    };
    let image = DynamicImage::from_decoder(decoder).map_err(|e| decode_err(e.to_string()))?;
    Ok(Decoded {
        image,
        format,
        exif,
    })
}

/// Attach `exif` when the encoder can carry it, then encode `img`.
fn write_encoded(
    img: &DynamicImage,
    mut encoder: impl ImageEncoder,
    exif: Option<&[u8]>,
) -> Result<(), ImageError> {
    if let Some(exif) = exif
        && let Err(e) = encoder.set_exif_metadata(exif.to_vec())
    {
        tracing::debug!(error = %e, "EXIF dropped");
    }
    img.write_with_encoder(encoder)
}

/// Encode into memory with the per-format encoder settings.
fn encode(img: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    let quality = params.quality.value() as u8;
    let exif = params.exif.filter(|_| params.format.supports_exif());
    match params.format {
        OutputFormat::Jpeg => {
            write_encoded(img, JpegEncoder::new_with_quality(&mut buf, quality), exif)?
        }
        OutputFormat::Png => write_encoded(img, PngEncoder::new(&mut buf), exif)?,
        OutputFormat::WebP => write_encoded(img, WebPEncoder::new_lossless(&mut buf), exif)?,
        OutputFormat::Bmp => write_encoded(img, BmpEncoder::new(&mut buf), exif)?,
        OutputFormat::Tiff => write_encoded(img, TiffEncoder::new(&mut buf), exif)?,
        OutputFormat::Avif => write_encoded(
            img,
            AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality),
            exif,
        )?,
        OutputFormat::Gif => img.write_to(&mut buf, ImageFormat::Gif)?,
    }
    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn open(&self, source: &SourceId) -> Result<SourceImage, BackendError> {
        let bytes = source.read_bytes().map_err(|e| match source {
            SourceId::Path(path) => BackendError::Io {
                path: path.clone(),
                source: e,
            },
            SourceId::Memory { .. } => BackendError::Decode {
                input: source.to_string(),
                message: e.to_string(),
            },
        })?;
        let decoded = decode_bytes(source, &bytes)?;
        Ok(SourceImage {
            id: source.clone(),
            image: normalize_color(decoded.image),
            format: decoded.format,
            exif: decoded.exif,
        })
    }

    fn save(
        &self,
        image: &DynamicImage,
        path: &Path,
        params: &EncodeParams,
    ) -> Result<(), BackendError> {
        let bytes = encode(image, params).map_err(|e| match e {
            ImageError::Unsupported(u) => BackendError::Unsupported {
                format: params.format,
                message: u.to_string(),
            },
            other => BackendError::Encode {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        })?;

        std::fs::write(path, bytes).map_err(|e| BackendError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::imaging::source::ColorMode;
    use crate::test_helpers::{gradient, solid_rgba, write_png};

    fn params(format: OutputFormat) -> EncodeParams<'static> {
        EncodeParams {
            format,
            quality: Quality::new(85),
            exif: None,
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
        assert!(!exts.contains(&"avif"));
    }

    #[test]
    fn supported_image_check_ignores_case() {
        assert!(is_supported_image(Path::new("/a/B.JPG")));
        assert!(is_supported_image(Path::new("c.Png")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    #[test]
    fn open_file_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_png(tmp.path(), "test.png", &gradient(200, 150));

        let source = RustBackend::new().open(&SourceId::path(&path)).unwrap();
        assert_eq!((source.width(), source.height()), (200, 150));
        assert_eq!(source.format, Some(ImageFormat::Png));
        assert_eq!(source.color_mode(), ColorMode::Rgb);
        assert!(source.exif.is_none());
    }

    #[test]
    fn open_memory_source_sniffs_content() {
        let mut buf = Cursor::new(Vec::new());
        gradient(10, 20).write_to(&mut buf, ImageFormat::Png).unwrap();
        // Misleading name: decoding must not trust it
        let id = SourceId::memory("pasted.jpg", buf.into_inner());

        let source = RustBackend::new().open(&id).unwrap();
        assert_eq!((source.width(), source.height()), (10, 20));
        assert_eq!(source.format, Some(ImageFormat::Png));
    }

    #[test]
    fn open_keeps_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_png(tmp.path(), "alpha.png", &solid_rgba(4, 4));

        let source = RustBackend::new().open(&SourceId::path(&path)).unwrap();
        assert_eq!(source.color_mode(), ColorMode::Rgba);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let result = RustBackend::new().open(&SourceId::path("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io { .. })));
    }

    #[test]
    fn open_garbage_is_decode_error() {
        let id = SourceId::memory("broken.png", b"definitely not an image".to_vec());
        let result = RustBackend::new().open(&id);
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn save_and_reopen_each_decodable_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        for format in [
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::WebP,
            OutputFormat::Bmp,
            OutputFormat::Tiff,
        ] {
            let path = tmp.path().join(format!("out.{}", format.extension()));
            backend.save(&gradient(32, 24), &path, &params(format)).unwrap();

            let reopened = backend.open(&SourceId::path(&path)).unwrap();
            assert_eq!(
                (reopened.width(), reopened.height()),
                (32, 24),
                "{format} round trip changed dimensions"
            );
        }
    }

    #[test]
    fn save_avif_writes_nonempty_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.avif");
        RustBackend::new()
            .save(&gradient(16, 16), &path, &params(OutputFormat::Avif))
            .unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn jpeg_quality_changes_output_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let img = gradient(128, 128);

        let low = tmp.path().join("low.jpg");
        let high = tmp.path().join("high.jpg");
        let mut p = params(OutputFormat::Jpeg);
        p.quality = Quality::new(10);
        backend.save(&img, &low, &p).unwrap();
        p.quality = Quality::new(100);
        backend.save(&img, &high, &p).unwrap();

        let low_len = std::fs::metadata(&low).unwrap().len();
        let high_len = std::fs::metadata(&high).unwrap().len();
        assert!(low_len < high_len);
    }

    #[test]
    fn exif_carries_into_jpeg_png_and_webp() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let payload = b"II*\0\x08\0\0\0\0\0".to_vec();

        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP] {
            let path = tmp.path().join(format!("exif.{}", format.extension()));
            let mut p = params(format);
            p.exif = Some(&payload);
            backend.save(&gradient(8, 8), &path, &p).unwrap();

            let reopened = backend.open(&SourceId::path(&path)).unwrap();
            assert_eq!(
                reopened.exif.as_deref(),
                Some(payload.as_slice()),
                "{format} lost its EXIF"
            );
        }
    }

    #[test]
    fn exif_is_dropped_silently_where_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = RustBackend::new();
        let payload = b"II*\0\x08\0\0\0\0\0".to_vec();

        for format in [OutputFormat::Bmp, OutputFormat::Gif] {
            let path = tmp.path().join(format!("exif.{}", format.extension()));
            let mut p = params(format);
            p.exif = Some(&payload);
            backend.save(&gradient(8, 8), &path, &p).unwrap();

            let reopened = backend.open(&SourceId::path(&path)).unwrap();
            assert!(reopened.exif.is_none(), "{format} should not carry EXIF");
        }
    }

    #[test]
    fn exif_read_from_jpeg_written_by_another_encoder() {
        let tmp = tempfile::TempDir::new().unwrap();
        let payload = b"MM\0*\0\0\0\x08\0\0".to_vec();
        let path = tmp.path().join("camera.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        let mut encoder = JpegEncoder::new_with_quality(&mut file, 90);
        encoder.set_exif_metadata(payload.clone()).unwrap();
        gradient(16, 16).write_with_encoder(encoder).unwrap();
        drop(file);

        let source = RustBackend::new().open(&SourceId::path(&path)).unwrap();
        assert_eq!(source.exif, Some(payload));
    }

    #[test]
    fn save_into_missing_directory_is_io_error() {
        let result = RustBackend::new().save(
            &gradient(4, 4),
            Path::new("/nonexistent/dir/out.png"),
            &params(OutputFormat::Png),
        );
        assert!(matches!(result, Err(BackendError::Io { .. })));
    }

    #[test]
    fn collect_images_recurses_sorted_and_filtered() {
        let tmp = tempfile::TempDir::new().unwrap();
        let img = gradient(2, 2);
        write_png(tmp.path(), "b.png", &img);
        img.save(tmp.path().join("a.jpg")).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir_all(tmp.path().join("nested/deeper")).unwrap();
        write_png(tmp.path(), "nested/c.png", &img);
        write_png(tmp.path(), "nested/deeper/d.png", &img);
        std::fs::write(tmp.path().join("nested/readme.md"), "x").unwrap();

        let found = collect_images(tmp.path()).unwrap();
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.png"),
                PathBuf::from("nested/deeper/d.png"),
            ]
        );
    }

    #[test]
    fn collect_images_missing_dir_errors() {
        assert!(collect_images(Path::new("/nonexistent/dir")).is_err());
    }
}
