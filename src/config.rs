//! Configuration module.
//!
//! Handles loading, validating, and merging `gridstitch.toml`. Stock defaults
//! are the base layer; a user config file overrides any subset of them, and
//! command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [split]
//! rows = 2                     # Grid rows (>= 1)
//! cols = 2                     # Grid columns (>= 1)
//! subfolder_per_source = false # Write each source's cells to <out>/<stem>/
//! empty_selection = "all"      # Nothing checked: "all" or "none"
//!
//! [stitch]
//! mode = "resize"              # "resize", "crop" or "fill"
//!
//! [output]
//! # format = "png"             # Omit to keep the source/path extension
//! quality = 95                 # JPEG/AVIF quality (1-100)
//!
//! [preview]
//! quality = "low"              # "low" (300), "medium" (600) or "high" (1000)
//! # max_width = 300            # Exact box edge in pixels; overrides quality
//!
//! [thumbnails]
//! size = 120                   # Square thumbnail edge in pixels
//! # capacity = 500             # Omit for an unbounded cache
//!
//! [processing]
//! # max_processes = 4          # Omit for auto = CPU cores
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [split]
//! cols = 3
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::batch::EmptySelection;
use crate::imaging::{GridSpec, OutputFormat, PreviewPreset, Quality, StitchMode};
use crate::split::SplitOptions;
use crate::stitch::StitchOptions;
use crate::thumbnail::ThumbnailConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "gridstitch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `gridstitch.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub split: SplitConfig,
    pub stitch: StitchConfig,
    pub output: OutputConfig,
    pub preview: PreviewConfig,
    pub thumbnails: ThumbnailsConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split.rows == 0 || self.split.cols == 0 {
            return Err(ConfigError::Validation(
                "split.rows and split.cols must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.preview.max_width == Some(0) {
            return Err(ConfigError::Validation(
                "preview.max_width must be non-zero".into(),
            ));
        }
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        if self.thumbnails.capacity == Some(0) {
            return Err(ConfigError::Validation(
                "thumbnails.capacity must be non-zero (omit it for no limit)".into(),
            ));
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.output.quality)
    }

    /// Preview box edge: the explicit `max_width`, else the preset's.
    pub fn preview_max_width(&self) -> u32 {
        self.preview
            .max_width
            .unwrap_or_else(|| self.preview.quality.max_width())
    }

    pub fn split_options(&self) -> SplitOptions {
        SplitOptions {
            grid: GridSpec::new(self.split.rows, self.split.cols),
            format: self.output.format,
            quality: self.quality(),
        }
    }

    pub fn stitch_options(&self) -> StitchOptions {
        StitchOptions {
            mode: self.stitch.mode,
            format: self.output.format,
            quality: self.quality(),
        }
    }

    pub fn thumbnail_config(&self) -> ThumbnailConfig {
        ThumbnailConfig {
            size: self.thumbnails.size,
            capacity: self.thumbnails.capacity,
        }
    }
}

/// Grid split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub rows: u32,
    pub cols: u32,
    /// Write each source's cells into a subfolder named after its stem.
    pub subfolder_per_source: bool,
    /// What an empty selection means: `"all"` or `"none"`.
    pub empty_selection: EmptySelection,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let grid = GridSpec::default();
        Self {
            rows: grid.rows,
            cols: grid.cols,
            subfolder_per_source: false,
            empty_selection: EmptySelection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StitchConfig {
    pub mode: StitchMode,
}

/// Encoder settings shared by split and stitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Forced output format. When absent, split keeps the source extension
    /// and stitch keeps the output path's extension.
    pub format: Option<OutputFormat>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            quality: Quality::default().value(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Named box size used when `max_width` is absent.
    pub quality: PreviewPreset,
    /// Sources are downscaled to fit a `max_width × max_width` box.
    pub max_width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub size: u32,
    /// Maximum cached thumbnails; absent means unbounded.
    pub capacity: Option<usize>,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        let defaults = ThumbnailConfig::default();
        Self {
            size: defaults.size,
            capacity: defaults.capacity,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel split workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file yields the stock defaults. Otherwise user values are merged
/// on top of the defaults, unknown keys are rejected, and the result is
/// validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gridstitch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# gridstitch configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# gridstitch reads ./gridstitch.toml, or the file given with --config.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Grid split
# ---------------------------------------------------------------------------
[split]
# Number of rows and columns to cut each image into (both >= 1).
# Cells are numbered row by row: <stem>_1, <stem>_2, ...
rows = 2
cols = 2

# Write each source's cells into <output>/<source stem>/ instead of
# directly into the output directory.
subfolder_per_source = false

# What to do when no image is explicitly selected:
# "all" processes every image, "none" processes nothing.
empty_selection = "all"

# ---------------------------------------------------------------------------
# Vertical stitch
# ---------------------------------------------------------------------------
[stitch]
# How images of different widths are aligned before stacking:
#   "resize" - scale every image to the widest width
#   "crop"   - center-crop every image to the narrowest width
#   "fill"   - pad every image to the widest width (white or transparent)
mode = "resize"

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# Force an output format: jpg, png, webp, bmp, gif, tiff, avif.
# Omit to keep the source extension (split) or output path extension (stitch).
# format = "png"

# JPEG/AVIF encoding quality (1 = worst, 100 = best).
quality = 95

# ---------------------------------------------------------------------------
# Stitch preview
# ---------------------------------------------------------------------------
[preview]
# Each source is downscaled to fit a square box first. Box edge presets:
#   "low" = 300, "medium" = 600, "high" = 1000 pixels
quality = "low"

# Exact box edge in pixels; overrides quality when set.
# max_width = 300

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Edge of the square thumbnails, in pixels. Smaller images are not upscaled.
size = 120

# Maximum number of cached thumbnails; oldest are dropped first.
# Omit for no limit.
# capacity = 500

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel split workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!((config.split.rows, config.split.cols), (2, 2));
        assert!(!config.split.subfolder_per_source);
        assert_eq!(config.split.empty_selection, EmptySelection::ProcessAll);
        assert_eq!(config.stitch.mode, StitchMode::Resize);
        assert_eq!(config.output.format, None);
        assert_eq!(config.output.quality, 95);
        assert_eq!(config.preview.quality, PreviewPreset::Low);
        assert_eq!(config.preview.max_width, None);
        assert_eq!(config.preview_max_width(), 300);
        assert_eq!(config.thumbnails.size, 120);
        assert_eq!(config.thumbnails.capacity, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[split]
cols = 5

[output]
format = "jpg"
quality = 80
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.split.cols, 5);
        assert_eq!(config.output.format, Some(OutputFormat::Jpeg));
        assert_eq!(config.output.quality, 80);
        // Unspecified defaults preserved
        assert_eq!(config.split.rows, 2);
        assert_eq!(config.stitch.mode, StitchMode::Resize);
    }

    #[test]
    fn parse_enums_by_name() {
        let toml = r#"
[split]
empty_selection = "none"

[stitch]
mode = "fill"

[output]
format = "webp"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.split.empty_selection, EmptySelection::ProcessNone);
        assert_eq!(config.stitch.mode, StitchMode::Fill);
        assert_eq!(config.output.format, Some(OutputFormat::WebP));
    }

    #[test]
    fn derived_options_follow_config() {
        let config: Config = toml::from_str(
            r#"
[split]
rows = 3
cols = 4

[stitch]
mode = "crop"

[output]
format = "png"
quality = 60

[thumbnails]
size = 64
capacity = 10
"#,
        )
        .unwrap();

        let split = config.split_options();
        assert_eq!(split.grid, GridSpec::new(3, 4));
        assert_eq!(split.format, Some(OutputFormat::Png));
        assert_eq!(split.quality.value(), 60);

        let stitch = config.stitch_options();
        assert_eq!(stitch.mode, StitchMode::Crop);
        assert_eq!(stitch.quality.value(), 60);

        assert_eq!(
            config.thumbnail_config(),
            ThumbnailConfig {
                size: 64,
                capacity: Some(10)
            }
        );
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[stitch]
mode = "crop"

[preview]
max_width = 512
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.stitch.mode, StitchMode::Crop);
        assert_eq!(config.preview_max_width(), 512);
        // Unspecified values should be defaults
        assert_eq!(config.output.quality, 95);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"
[split]
rows = 0
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 95"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[split]
rows = 2
cols = 2
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[split]
cols = 5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let split = merged.get("split").unwrap();
        assert_eq!(split.get("rows").unwrap().as_integer(), Some(2));
        assert_eq!(split.get("cols").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn merge_toml_adds_new_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[output]
quality = 95
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
format = "png"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("format").unwrap().as_str(), Some("png"));
        assert_eq!(output.get("quality").unwrap().as_integer(), Some(95));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[split]
rowz = 3
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[resize]
width = 100
"#;
        let result: Result<Config, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_enum_value_rejected() {
        let result: Result<Config, _> = toml::from_str("[stitch]\nmode = \"stretch\"\n");
        assert!(result.is_err());
        let result: Result<Config, _> = toml::from_str("[output]\nformat = \"psd\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_boundaries() {
        let mut config = Config::default();
        config.output.quality = 1;
        assert!(config.validate().is_ok());
        config.output.quality = 100;
        assert!(config.validate().is_ok());
        config.output.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.output.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        let mut config = Config::default();
        config.split.cols = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.preview.max_width = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thumbnails.size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.thumbnails.capacity = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn preview_preset_sets_box_unless_max_width_given() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[preview]
quality = "high"
"#,
        )
        .unwrap();
        let config = resolve_config(base.clone(), Some(overlay)).unwrap();
        assert_eq!(config.preview.quality, PreviewPreset::High);
        assert_eq!(config.preview_max_width(), 1000);

        let overlay: toml::Value = toml::from_str(
            r#"
[preview]
quality = "medium"
max_width = 450
"#,
        )
        .unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.preview_max_width(), 450);
    }

    #[test]
    fn preview_preset_rejects_unknown_name() {
        let result: Result<Config, _> = toml::from_str("[preview]\nquality = \"ultra\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
quality = 200
"#,
        )
        .unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for section in ["split", "stitch", "output", "preview", "thumbnails", "processing"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[split]",
            "[stitch]",
            "[output]",
            "[preview]",
            "[thumbnails]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }
}
