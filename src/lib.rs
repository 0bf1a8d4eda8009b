//! # gall
//!
//! A static HTML photo gallery builder. Point it at a directory of photos and
//! it writes, next to your originals, everything a plain web server needs to
//! publish them: an index page per directory, a thumbnail and a medium-sized
//! copy of every image, and a page per medium with previous/next links.
//!
//! # Architecture: Scan, then Build
//!
//! ```text
//! 1. Scan    photos/  →  GalleryTree      (filesystem → in-memory tree)
//! 2. Build   tree     →  index.html, tn/, med/   (four phases)
//! ```
//!
//! Nothing is persisted between runs except the artifacts themselves. A
//! rebuild rescans the directory and resizes only what is missing; every page
//! is rewritten so navigation always matches the current files.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Media kinds, their derivation tables, and path classification |
//! | [`naming`] | Derived artifact paths (`tn/a_tn.jpg`) and display titles |
//! | [`derivation`] | One derivative of one source file: paths, geometry, resize request |
//! | [`tree`] | The gallery tree: scanning, cached aggregates, thumbnails, ancestry |
//! | [`urls`] | Public URLs for files under the gallery root |
//! | [`render`] | The [`render::Renderer`] seam and its Maud implementation |
//! | [`pipeline`] | The four build phases, progress events, build report |
//! | [`prune`] | Removal of derivatives whose source is gone |
//! | [`imaging`] | Resize backends: ImageMagick `convert` or the `image` crate |
//! | [`config`] | `gall.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Node identifiers shared across modules |
//!
//! # Design Decisions
//!
//! ## Existence Is the Cache
//!
//! There is no manifest or database. An image artifact whose path exists is
//! considered built. Resizes write to a `.partial-` sibling and rename on
//! success, so a crash or a failed conversion never leaves a truncated file
//! at the real path.
//!
//! ## Arena Tree
//!
//! The tree owns all galleries and items in two vectors; parents, children
//! and siblings refer to each other by index. Aggregates (recursive item
//! lists, counts, propagated thumbnails, ancestor chains) are computed on
//! first use and memoized in `OnceLock`s, which keeps them safe to read from
//! the rayon workers of the build phases.
//!
//! ## Maud Over Template Files
//!
//! Pages are generated with [Maud](https://maud.lambda.xyz/): templates are
//! Rust code, checked at compile time and escaped by default, with no
//! template directory to ship next to the binary.

pub mod config;
pub mod derivation;
pub mod imaging;
pub mod media;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod prune;
pub mod render;
pub mod tree;
pub mod types;
pub mod urls;

#[cfg(test)]
pub(crate) mod test_helpers;
