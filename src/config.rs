//! Engine configuration.
//!
//! Handles loading, validating, and layering `thumbwright.toml` files. Stock
//! defaults are the base layer; each file passed on the command line is
//! merged on top of the previous one, so a site-wide file can be refined by a
//! host-specific one.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! images = "images"              # Source photo collection
//! transcoded = "cache/transcoded" # Mirrored tree of thumbnails and conversions
//! faces = "cache/faces"          # Flat directory of person thumbnails
//!
//! [threading]
//! enabled = true                 # false = one render at a time
//! thumbnail_threads = 0          # 0 = CPU count minus one
//!
//! [thumbnails]
//! sizes = [240, 480]             # Short-side sizes of grid thumbnails
//! icon_size = 45                 # Map icon size (1-100)
//! person_size = 200              # Person (face) thumbnail size
//! person_face_margin = 0.6       # Margin around a face, as a ratio of its box
//! quality_priority = true        # Slower, sharper resampling and higher JPEG quality
//!
//! [converting]
//! enabled = true
//! resolution = 1080              # Short side of converted previews
//!
//! [processing]
//! library = "image"              # "image" (pure Rust) or "magick" (ImageMagick)
//! magick_binary = "convert"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from TOML.
///
/// All fields have defaults; files only need the values they override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Filesystem roots for sources and artifacts.
    pub paths: PathsConfig,
    /// Worker budget.
    pub threading: ThreadingConfig,
    /// Thumbnail sizes and face-crop policy.
    pub thumbnails: ThumbnailsConfig,
    /// Full-size preview conversion.
    pub converting: ConvertingConfig,
    /// Image library variant.
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thumbs = &self.thumbnails;
        if thumbs.sizes.is_empty() {
            return Err(ConfigError::Validation(
                "thumbnails.sizes must not be empty".into(),
            ));
        }
        if thumbs.sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "thumbnails.sizes values must be non-zero".into(),
            ));
        }
        if thumbs.icon_size == 0 || thumbs.icon_size > 100 {
            return Err(ConfigError::Validation(
                "thumbnails.icon_size must be 1-100".into(),
            ));
        }
        if thumbs.person_size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.person_size must be non-zero".into(),
            ));
        }
        if !thumbs.person_face_margin.is_finite() || thumbs.person_face_margin < 0.0 {
            return Err(ConfigError::Validation(
                "thumbnails.person_face_margin must be a non-negative number".into(),
            ));
        }
        if self.converting.resolution == 0 {
            return Err(ConfigError::Validation(
                "converting.resolution must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Filesystem roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the source collection. Transcoded paths mirror it.
    pub images: PathBuf,
    /// Root of thumbnails and converted previews.
    pub transcoded: PathBuf,
    /// Root of person thumbnails.
    pub faces: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            images: PathBuf::from("images"),
            transcoded: PathBuf::from("cache/transcoded"),
            faces: PathBuf::from("cache/faces"),
        }
    }
}

/// Background rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThreadingConfig {
    /// When false, renders run one at a time.
    pub enabled: bool,
    /// Explicit worker count. 0 means CPU count minus one.
    pub thumbnail_threads: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thumbnail_threads: 0,
        }
    }
}

/// Resolve how many renders may run at once.
///
/// - threading disabled → 1
/// - `thumbnail_threads > 0` → that value
/// - otherwise → CPU count minus one, at least 1
pub fn effective_concurrency(config: &ThreadingConfig) -> usize {
    if !config.enabled {
        return 1;
    }
    if config.thumbnail_threads > 0 {
        return config.thumbnail_threads;
    }
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores.saturating_sub(1).max(1)
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Short-side pixel sizes generated for grids. The best match is requested by callers.
    pub sizes: Vec<u32>,
    /// Map icon size.
    pub icon_size: u32,
    /// Person (face) thumbnail size.
    pub person_size: u32,
    /// Margin added around a face box, as a fraction of the box dimension.
    pub person_face_margin: f64,
    /// Favour output fidelity over encode speed.
    pub quality_priority: bool,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            sizes: vec![240, 480],
            icon_size: 45,
            person_size: 200,
            person_face_margin: 0.6,
            quality_priority: true,
        }
    }
}

/// Converted (full-screen preview) photo settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertingConfig {
    pub enabled: bool,
    /// Short side of converted photos.
    pub resolution: u32,
}

impl Default for ConvertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: 1080,
        }
    }
}

/// Which image library renders artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLibrary {
    /// Pure Rust `image` crate, rendered on dedicated worker threads.
    #[default]
    Image,
    /// ImageMagick `convert`, internally parallel.
    Magick,
}

/// Image library selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub library: ImageLibrary,
    /// Path or name of the ImageMagick binary (only used with `library = "magick"`).
    pub magick_binary: PathBuf,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            library: ImageLibrary::default(),
            magick_binary: PathBuf::from(crate::imaging::magick_backend::DEFAULT_MAGICK_BINARY),
        }
    }
}

// =============================================================================
// Config loading, layering, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge layers in order on top of the stock defaults, then deserialize and validate.
pub fn resolve_config(layers: Vec<toml::Value>) -> Result<EngineConfig, ConfigError> {
    let merged = layers
        .into_iter()
        .try_fold(stock_defaults_value()?, |acc, layer| {
            Ok::<_, ConfigError>(merge_toml(acc, layer))
        })?;
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load and layer config files. Missing files are skipped.
pub fn load_config(files: &[PathBuf]) -> Result<EngineConfig, ConfigError> {
    let mut layers = Vec::new();
    for file in files {
        if let Some(value) = load_raw_config(file)? {
            layers.push(value);
        }
    }
    resolve_config(layers)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbwright configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Filesystem roots
# ---------------------------------------------------------------------------
[paths]
# Root of the source photo collection.
images = "images"
# Thumbnails and converted previews, mirroring the source tree.
transcoded = "cache/transcoded"
# Person thumbnails, keyed by a hash of photo + face.
faces = "cache/faces"

# ---------------------------------------------------------------------------
# Worker budget
# ---------------------------------------------------------------------------
[threading]
# When false, artifacts are rendered one at a time.
enabled = true
# Number of concurrent renders. 0 = number of CPUs minus one.
thumbnail_threads = 0

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Short-side sizes of grid thumbnails. Changing this list makes artifacts of
# removed sizes eligible for sweeping.
sizes = [240, 480]
# Map icon size in pixels (1-100).
icon_size = 45
# Person (face) thumbnail size in pixels.
person_size = 200
# Margin around a detected face, as a fraction of the face box.
person_face_margin = 0.6
# Slower Lanczos resampling and JPEG quality 90 instead of 75.
quality_priority = true

# ---------------------------------------------------------------------------
# Converted previews
# ---------------------------------------------------------------------------
[converting]
enabled = true
# Short side of converted photos in pixels.
resolution = 1080

# ---------------------------------------------------------------------------
# Image library
# ---------------------------------------------------------------------------
[processing]
# "image": pure Rust, one worker thread per render slot.
# "magick": ImageMagick convert, needed for video thumbnails.
library = "image"
magick_binary = "convert"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.thumbnails.sizes, vec![240, 480]);
        assert_eq!(config.thumbnails.icon_size, 45);
        assert_eq!(config.thumbnails.person_size, 200);
        assert_eq!(config.thumbnails.person_face_margin, 0.6);
        assert!(config.thumbnails.quality_priority);
        assert_eq!(config.converting.resolution, 1080);
        assert_eq!(config.processing.library, ImageLibrary::Image);
        assert!(config.threading.enabled);
        assert_eq!(config.threading.thumbnail_threads, 0);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[thumbnails]
sizes = [120, 240, 480]
"##;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.thumbnails.sizes, vec![120, 240, 480]);
        // Siblings in the same table keep their defaults
        assert_eq!(config.thumbnails.icon_size, 45);
        assert_eq!(config.converting.resolution, 1080);
    }

    #[test]
    fn parse_library_variant() {
        let config: EngineConfig = toml::from_str(
            r#"
[processing]
library = "magick"
magick_binary = "/usr/local/bin/magick"
"#,
        )
        .unwrap();
        assert_eq!(config.processing.library, ImageLibrary::Magick);
        assert_eq!(
            config.processing.magick_binary,
            PathBuf::from("/usr/local/bin/magick")
        );
    }

    #[test]
    fn unknown_library_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str(
            r#"
[processing]
library = "vips"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: EngineConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = EngineConfig::default();
        assert_eq!(config.thumbnails.sizes, defaults.thumbnails.sizes);
        assert_eq!(config.paths.transcoded, defaults.paths.transcoded);
        assert_eq!(config.processing.library, defaults.processing.library);
        config.validate().unwrap();
    }

    // =========================================================================
    // effective_concurrency tests
    // =========================================================================

    #[test]
    fn concurrency_disabled_threading_is_one() {
        let config = ThreadingConfig {
            enabled: false,
            thumbnail_threads: 8,
        };
        assert_eq!(effective_concurrency(&config), 1);
    }

    #[test]
    fn concurrency_explicit_count() {
        let config = ThreadingConfig {
            enabled: true,
            thumbnail_threads: 3,
        };
        assert_eq!(effective_concurrency(&config), 3);
    }

    #[test]
    fn concurrency_auto_is_cores_minus_one() {
        let config = ThreadingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_concurrency(&config), (cores - 1).max(1));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&[tmp.path().join("missing.toml")]).unwrap();
        assert_eq!(config.thumbnails.sizes, vec![240, 480]);
    }

    #[test]
    fn load_config_layers_in_order() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site.toml");
        let host = tmp.path().join("host.toml");
        fs::write(
            &site,
            r#"
[thumbnails]
sizes = [100, 200]
icon_size = 30

[threading]
thumbnail_threads = 2
"#,
        )
        .unwrap();
        fs::write(
            &host,
            r#"
[thumbnails]
icon_size = 60
"#,
        )
        .unwrap();

        let config = load_config(&[site, host]).unwrap();
        assert_eq!(config.thumbnails.sizes, vec![100, 200]);
        assert_eq!(config.thumbnails.icon_size, 60);
        assert_eq!(config.threading.thumbnail_threads, 2);
        assert_eq!(config.thumbnails.person_size, 200);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&[path]);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_runs_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("zero.toml");
        fs::write(&path, "[converting]\nresolution = 0\n").unwrap();

        let result = load_config(&[path]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("sizes = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("sizes = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["sizes"].as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str("[thumbnails]\nsize = [1]\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str("[video]\nenabled = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_sizes_empty() {
        let mut config = EngineConfig::default();
        config.thumbnails.sizes = vec![];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_sizes_zero() {
        let mut config = EngineConfig::default();
        config.thumbnails.sizes = vec![240, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_icon_size_bounds() {
        let mut config = EngineConfig::default();
        config.thumbnails.icon_size = 100;
        assert!(config.validate().is_ok());
        config.thumbnails.icon_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_negative_margin() {
        let mut config = EngineConfig::default();
        config.thumbnails.person_face_margin = -0.1;
        assert!(config.validate().is_err());
        config.thumbnails.person_face_margin = f64::NAN;
        assert!(config.validate().is_err());
    }
}
