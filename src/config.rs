//! Gallery configuration.
//!
//! Handles loading, validating, and merging `gall.toml` files. Each scanned
//! directory may carry its own `gall.toml`; its values are merged over the
//! stock defaults. Command-line flags override both.
//!
//! ## Keys
//!
//! ```toml
//! # Every key may be omitted; these are the defaults
//!
//! base_url = "/photos"       # URL the gallery root is published under
//! row_size = 5               # Cells per row in index grids
//! stylesheet = "style.css"   # Root-relative; installed if missing
//!
//! [processing]
//! backend = "imagemagick"    # "imagemagick" or "rust"
//! convert_program = "convert"
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! fail_fast = false          # Abort the build on the first failed resize
//! ```
//!
//! ## Sparse Files
//!
//! A `gall.toml` only needs the keys it changes:
//!
//! ```toml
//! [processing]
//! backend = "rust"
//! ```
//!
//! Misspelled or unknown keys are an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the per-directory config file.
pub const CONFIG_FILE: &str = "gall.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid gall.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot encode defaults: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gall.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallConfig {
    /// URL the scanned directory's parent tree is published under.
    pub base_url: String,
    /// Grid cells per table row on index pages.
    pub row_size: usize,
    /// Stylesheet path relative to the gallery root.
    pub stylesheet: String,
    pub processing: ProcessingConfig,
}

impl Default for GallConfig {
    fn default() -> Self {
        Self {
            base_url: "/photos".to_string(),
            row_size: 5,
            stylesheet: "style.css".to_string(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GallConfig {
    /// Reject values the build cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_size == 0 {
            return Err(ConfigError::Validation("row_size must be at least 1".into()));
        }
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation("base_url must not be empty".into()));
        }
        let stylesheet = Path::new(&self.stylesheet);
        let escapes_root = stylesheet
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if self.stylesheet.is_empty() || escapes_root {
            return Err(ConfigError::Validation(
                "stylesheet must be a relative path inside the gallery".into(),
            ));
        }
        if self.processing.convert_program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "processing.convert_program must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Which resize backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ImageMagick's `convert`, one process per derivative.
    #[default]
    Imagemagick,
    /// The in-process `image` crate.
    Rust,
}

/// How derivatives are resized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub backend: BackendKind,
    /// Program invoked by the ImageMagick backend.
    pub convert_program: String,
    /// Worker threads per build; all cores when unset. See [`effective_threads`].
    pub max_processes: Option<usize>,
    /// Abort the build on the first failed resize instead of reporting it
    /// and moving on.
    pub fail_fast: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            convert_program: "convert".to_string(),
            max_processes: None,
            fail_fast: false,
        }
    }
}

/// Worker threads for the build: `max_processes` if set, never more than
/// the machine has cores.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(limit) => limit.min(cores),
        None => cores,
    }
}

/// [`GallConfig::default`] as a TOML table, the layer `gall.toml` is
/// merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GallConfig::default())?)
}

/// Lay `overlay` over `base`. Tables merge recursively; any other overlay
/// value wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let value = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, replacement) => replacement,
    }
}

/// The raw contents of `dir/gall.toml`, or `None` when there is no such file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&text)?))
}

/// Deserialize and validate `base` with `overlay` (if any) laid over it.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GallConfig, ConfigError> {
    let merged = match overlay {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: GallConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults with `dir/gall.toml` merged on top, validated.
pub fn load_config(dir: &Path) -> Result<GallConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?)
}

/// A fully-commented stock `gall.toml` with all keys and explanations.
///
/// Printed by `gall --gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# gall configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as gall.toml in a directory you run gall on.
# Unknown keys will cause an error.

# URL the directory is published under. The directory argument is appended,
# so `gall 2004` publishes at /photos/2004/. Overridden by --url.
base_url = "/photos"

# Number of thumbnails per row on index pages.
row_size = 5

# Stylesheet linked from every page, relative to the gallery root.
# A default stylesheet is written here if the file does not exist.
stylesheet = "style.css"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Resize backend: "imagemagick" runs an external convert program,
# "rust" resizes in-process.
backend = "imagemagick"

# Program the imagemagick backend runs.
convert_program = "convert"

# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Stop the whole build at the first image that fails to resize.
# When false, failures are reported at the end and gall exits non-zero.
fail_fast = false
"##
}
