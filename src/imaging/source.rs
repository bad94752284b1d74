//! Source identities and decoded source images.
//!
//! A [`SourceId`] names an input: a file on disk or a named in-memory byte
//! buffer. Identity (equality, hashing) is the path or the name, never the
//! bytes, so the thumbnail cache can key on it cheaply. A [`SourceImage`] is
//! one decode of a source; it is never cached across operations.

use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identity of an input image.
#[derive(Clone)]
pub enum SourceId {
    Path(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl SourceId {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourceId::Path(path.into())
    }

    /// An in-memory source. `name` is its identity and is used for output
    /// naming the same way a file name would be (`"scan.png"` → stem `scan`).
    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        SourceId::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    fn name_path(&self) -> &Path {
        match self {
            SourceId::Path(p) => p,
            SourceId::Memory { name, .. } => Path::new(name),
        }
    }

    /// File stem used for derived output names. Falls back to `"image"`.
    pub fn stem(&self) -> String {
        self.name_path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_string())
    }

    /// Original extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.name_path()
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty())
    }

    /// Directory containing a file source; `None` for in-memory sources.
    pub fn parent_dir(&self) -> Option<&Path> {
        match self {
            SourceId::Path(p) => p.parent(),
            SourceId::Memory { .. } => None,
        }
    }

    /// Raw encoded bytes of the source.
    pub fn read_bytes(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match self {
            SourceId::Path(p) => std::fs::read(p).map(Cow::Owned),
            SourceId::Memory { bytes, .. } => Ok(Cow::Borrowed(bytes)),
        }
    }
}

impl PartialEq for SourceId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SourceId::Path(a), SourceId::Path(b)) => a == b,
            (SourceId::Memory { name: a, .. }, SourceId::Memory { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for SourceId {}

impl Hash for SourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            SourceId::Path(p) => {
                0u8.hash(state);
                p.hash(state);
            }
            SourceId::Memory { name, .. } => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Path(p) => f.debug_tuple("Path").field(p).finish(),
            SourceId::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Path(p) => write!(f, "{}", p.display()),
            SourceId::Memory { name, .. } => write!(f, "<memory:{name}>"),
        }
    }
}

impl From<PathBuf> for SourceId {
    fn from(path: PathBuf) -> Self {
        SourceId::Path(path)
    }
}

impl From<&Path> for SourceId {
    fn from(path: &Path) -> Self {
        SourceId::Path(path.to_path_buf())
    }
}

/// Opaque RGB or RGB with alpha. Every decoded raster is one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
}

impl ColorMode {
    pub fn of(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            ColorMode::Rgba
        } else {
            ColorMode::Rgb
        }
    }
}

/// Normalize any decoded buffer to 8-bit RGB or RGBA, keeping alpha iff present.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// One decode of a source, immutable once read.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: SourceId,
    /// Pixels, normalized to `Rgb8` or `Rgba8`.
    pub image: DynamicImage,
    /// Container format the bytes were decoded from, if recognized.
    pub format: Option<ImageFormat>,
    /// Raw EXIF (TIFF-structured) payload, copied verbatim to outputs.
    pub exif: Option<Vec<u8>>,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn color_mode(&self) -> ColorMode {
        ColorMode::of(&self.image)
    }
}
