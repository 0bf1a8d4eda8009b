//! Resize backend trait and shared error type.
//!
//! The [`ResizeBackend`] trait is the seam between the build pipeline and
//! whatever actually shrinks pixels. Two implementations ship:
//!
//! - [`ConvertBackend`](super::convert::ConvertBackend) shells out to
//!   ImageMagick's `convert`, the reference external tool.
//! - [`RustBackend`](super::rust_backend::RustBackend) does the same work
//!   in-process with the `image` crate.
//!
//! Backends must be `Sync`: the pipeline fans resize requests out across a
//! rayon pool.

use super::params::ResizeRequest;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("failed to process {path}: {message}")]
    ProcessingFailed { path: PathBuf, message: String },
}

/// Trait for resize backends.
pub trait ResizeBackend: Sync {
    /// Short name shown in logs (`imagemagick`, `rust`, ...).
    fn name(&self) -> &'static str;

    /// Write `request.source`, fitted into `request.geometry`, to `request.target`.
    ///
    /// The parent directory of the target already exists. On error the
    /// backend may leave a partial file behind; the caller cleans it up.
    fn resize(&self, request: &ResizeRequest) -> Result<(), BackendError>;
}
