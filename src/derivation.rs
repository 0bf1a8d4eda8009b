//! One concrete derivative of one source file.
//!
//! A [`Derivation`] knows where its artifacts go and how to make them, but
//! not whether they exist: disk state changes between runs, so the pipeline
//! checks existence at build time instead of caching it here.

use crate::imaging::{Geometry, ResizeMode, ResizeRequest};
use crate::media::{DerivationKind, DerivationSpec};
use crate::naming::derived_path;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    source: PathBuf,
    kind: DerivationKind,
    spec: &'static DerivationSpec,
    path: PathBuf,
    html: PathBuf,
}

impl Derivation {
    pub fn new(source: &Path, kind: DerivationKind, spec: &'static DerivationSpec) -> Self {
        Self {
            source: source.to_path_buf(),
            kind,
            spec,
            path: derived_path(source, spec.token, None),
            html: derived_path(source, spec.token, Some(".html")),
        }
    }

    /// Source file this derivative is built from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn kind(&self) -> DerivationKind {
        self.kind
    }

    pub fn token(&self) -> &'static str {
        self.spec.token
    }

    pub fn geometry(&self) -> Geometry {
        self.spec.geometry
    }

    pub fn mode(&self) -> ResizeMode {
        self.spec.mode
    }

    /// Location of the resized image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the companion page. Only meaningful when [`has_html`](Self::has_html).
    pub fn html(&self) -> &Path {
        &self.html
    }

    pub fn has_image(&self) -> bool {
        self.spec.has_image
    }

    pub fn has_html(&self) -> bool {
        self.spec.has_html
    }

    /// The request that produces this derivative's image at `target`.
    pub fn resize_request(&self, target: &Path) -> ResizeRequest {
        ResizeRequest {
            mode: self.spec.mode,
            source: self.source.clone(),
            target: target.to_path_buf(),
            geometry: self.spec.geometry,
        }
    }
}
