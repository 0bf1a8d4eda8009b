//! Parameter types for resize operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the build pipeline (which decides which derivatives are
//! missing) and a [`backend`](super::backend) (which does the pixel work), so
//! backends can be swapped, or mocked in tests, without touching the pipeline.
//!
//! ## Types
//!
//! - [`Geometry`]: target bounding box, written `WxH` (e.g. `133x133`).
//! - [`ResizeMode`]: how the source is fitted into the box.
//! - [`ResizeRequest`]: source, target, geometry and mode for one derivative.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid geometry '{0}', expected WxH with non-zero sides")]
pub struct GeometryParseError(pub String);

/// Target bounding box for a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The geometry with ImageMagick's "only shrink larger images" flag.
    pub fn shrink_only(self) -> String {
        format!("{self}>")
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Geometry {
    type Err = GeometryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || GeometryParseError(s.to_string());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(err)?;
        let width: u32 = w.trim().parse().map_err(|_| err())?;
        let height: u32 = h.trim().parse().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(err());
        }
        Ok(Self { width, height })
    }
}

/// How a source image is fitted into its [`Geometry`].
///
/// - `Scale`: fast box-filter shrink to fit inside the box. Never enlarges.
/// - `Resize`: high-quality filtered shrink to fit inside the box. Never enlarges.
/// - `CropResize`: fill the box completely and center-crop the overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    Scale,
    Resize,
    CropResize,
}

impl ResizeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResizeMode::Scale => "scale",
            ResizeMode::Resize => "resize",
            ResizeMode::CropResize => "crop_resize",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full specification for producing one resized derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub mode: ResizeMode,
    pub source: PathBuf,
    pub target: PathBuf,
    pub geometry: Geometry,
}
