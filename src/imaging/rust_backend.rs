//! Pure Rust resize backend, no ImageMagick needed.
//!
//! ## Crate mapping
//!
//! | Mode | `image` crate call |
//! |---|---|
//! | Decode (JPEG, GIF, PNG) | `ImageReader::open(..).with_guessed_format()` |
//! | `Scale` | `DynamicImage::thumbnail` (fast integer box filter) |
//! | `Resize` | `DynamicImage::resize` with `Lanczos3` |
//! | `CropResize` | `DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Encode | `DynamicImage::save`, format from the target extension |
//!
//! `Scale` and `Resize` never enlarge: an image already inside the box is
//! re-encoded at its own size, matching ImageMagick's `>` geometry flag.

use super::backend::{BackendError, ResizeBackend};
use super::params::{Geometry, ResizeMode, ResizeRequest};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::path::Path;

/// Backend using the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::ProcessingFailed {
            path: path.to_path_buf(),
            message: format!("decode failed: {e}"),
        })
}

fn fits_within(img: &DynamicImage, geometry: Geometry) -> bool {
    let (w, h) = img.dimensions();
    w <= geometry.width && h <= geometry.height
}

/// Apply a resize mode to a decoded image.
fn apply(img: DynamicImage, mode: ResizeMode, geometry: Geometry) -> DynamicImage {
    match mode {
        ResizeMode::Scale if fits_within(&img, geometry) => img,
        ResizeMode::Scale => img.thumbnail(geometry.width, geometry.height),
        ResizeMode::Resize if fits_within(&img, geometry) => img,
        ResizeMode::Resize => img.resize(geometry.width, geometry.height, FilterType::Lanczos3),
        ResizeMode::CropResize => {
            img.resize_to_fill(geometry.width, geometry.height, FilterType::Lanczos3)
        }
    }
}

impl ResizeBackend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn resize(&self, request: &ResizeRequest) -> Result<(), BackendError> {
        let img = load_image(&request.source)?;
        let out = apply(img, request.mode, request.geometry);
        out.save(&request.target)
            .map_err(|e| BackendError::ProcessingFailed {
                path: request.target.clone(),
                message: format!("encode failed: {e}"),
            })
    }
}
