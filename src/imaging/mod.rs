//! Image resizing: the external collaborator behind every derivative.
//!
//! | Backend | Implementation |
//! |---|---|
//! | **imagemagick** (default) | `convert` subprocess, one call per derivative |
//! | **rust** | `image` crate, in-process |
//!
//! The module is split into:
//! - **Parameters**: what to produce ([`Geometry`], [`ResizeMode`], [`ResizeRequest`])
//! - **Backend**: the [`ResizeBackend`] trait and its error type
//! - **Implementations**: [`ConvertBackend`] and [`RustBackend`]

pub mod backend;
pub mod convert;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ResizeBackend};
pub use convert::ConvertBackend;
pub use params::{Geometry, GeometryParseError, ResizeMode, ResizeRequest};
pub use rust_backend::RustBackend;
