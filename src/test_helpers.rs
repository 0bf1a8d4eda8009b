//! Shared test utilities for the gall test suite.
//!
//! Provides fixture builders, lookup helpers and bulk extractors that work
//! with a scanned [`GalleryTree`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_sample();
//! let tree = GalleryTree::scan(tmp.path()).unwrap();
//!
//! let trip = find_gallery(&tree, "Trip");
//! assert_eq!(image_names(&tree, tree.gallery(trip).images()), ["c.jpg"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::tree::GalleryTree;
use crate::types::{GalleryId, ItemId};

// =========================================================================
// Fixture setup
// =========================================================================

/// Create empty files, making parent directories as needed.
pub fn touch_all(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "").unwrap();
    }
}

/// Create directories (and their parents).
pub fn mkdirs(root: &Path, dirs: &[&str]) {
    for dir in dirs {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
}

/// The small two-level gallery used throughout the tests:
///
/// ```text
/// a.jpg
/// b.jpg
/// Trip/c.jpg
/// ```
pub fn setup_sample() -> TempDir {
    let tmp = TempDir::new().unwrap();
    touch_all(tmp.path(), &["a.jpg", "b.jpg", "Trip/c.jpg"]);
    tmp
}

// =========================================================================
// Tree lookups, panics with a clear message on miss
// =========================================================================

/// Find a gallery by title. Panics if not found.
pub fn find_gallery(tree: &GalleryTree, title: &str) -> GalleryId {
    tree.walk_galleries()
        .into_iter()
        .find(|&g| tree.gallery(g).title() == title)
        .unwrap_or_else(|| {
            let titles = gallery_titles(tree, &tree.walk_galleries());
            panic!("gallery '{title}' not found. Available: {titles:?}")
        })
}

/// Find an image or movie by file name. Panics if not found.
pub fn find_item(tree: &GalleryTree, name: &str) -> ItemId {
    tree.walk_items()
        .into_iter()
        .find(|&i| tree.item(i).title() == name)
        .unwrap_or_else(|| {
            let names = image_names(tree, &tree.walk_items());
            panic!("item '{name}' not found. Available: {names:?}")
        })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// File names of the given items, in order.
pub fn image_names<'a>(tree: &'a GalleryTree, ids: &[ItemId]) -> Vec<&'a str> {
    ids.iter().map(|&i| tree.item(i).title()).collect()
}

/// Titles of the given galleries, in order.
pub fn gallery_titles<'a>(tree: &'a GalleryTree, ids: &[GalleryId]) -> Vec<&'a str> {
    ids.iter().map(|&g| tree.gallery(g).title()).collect()
}

/// Every file under `root`, relative and `/`-separated, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}
