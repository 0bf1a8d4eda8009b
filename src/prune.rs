//! Removal of orphaned derivatives.
//!
//! When a source image is deleted or renamed its `tn/` and `med/` files stay
//! behind. An orphan is a file inside the `tn/` or `med/` directory of a
//! scanned gallery that no current derivation would produce, including
//! `.partial-` leftovers from an interrupted build. Nothing outside those
//! directories is ever touched.
//!
//! Pruning refuses to run on a tree whose scan reported errors: an unreadable
//! subdirectory would make all of its derivatives look orphaned.

use crate::media::{DERIVATIVE_DIRS, DerivationKind};
use crate::tree::GalleryTree;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PruneError {
    #[error("scan reported {0} error(s); not pruning an incomplete tree")]
    IncompleteScan(usize),
    #[error("cannot list derivatives: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Files pruning removed (or would remove, in a dry run).
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Every artifact path the current tree would produce.
fn expected_artifacts(tree: &GalleryTree) -> HashSet<PathBuf> {
    let mut expected = HashSet::new();
    for id in tree.walk_items() {
        let item = tree.item(id);
        for kind in DerivationKind::ALL {
            let derivation = item.derivation(kind);
            if derivation.has_image() {
                expected.insert(derivation.path().to_path_buf());
            }
            if derivation.has_html() {
                expected.insert(derivation.html().to_path_buf());
            }
        }
    }
    expected
}

/// Orphaned files in the derivative directories of every scanned gallery,
/// sorted.
pub fn find_orphans(tree: &GalleryTree) -> Result<Vec<PathBuf>, PruneError> {
    let expected = expected_artifacts(tree);
    let mut orphans = Vec::new();

    for id in tree.walk_galleries() {
        for dir_name in DERIVATIVE_DIRS {
            let dir = tree.gallery(id).path().join(dir_name);
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    debug!("Leaving directory {} alone", entry.path().display());
                    continue;
                }
                if !expected.contains(entry.path()) {
                    orphans.push(entry.into_path());
                }
            }
        }
    }

    orphans.sort();
    Ok(orphans)
}

/// Delete orphaned derivatives. With `dry_run` nothing is deleted.
pub fn prune(tree: &GalleryTree, dry_run: bool) -> Result<PruneReport, PruneError> {
    if !tree.errors().is_empty() {
        return Err(PruneError::IncompleteScan(tree.errors().len()));
    }

    let orphans = find_orphans(tree)?;
    if !dry_run {
        for path in &orphans {
            fs::remove_file(path).map_err(|source| PruneError::Remove {
                path: path.clone(),
                source,
            })?;
            info!("Removed {}", path.display());
        }
    }

    Ok(PruneReport {
        removed: orphans,
        dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn built_sample() -> TempDir {
        let tmp = setup_sample();
        touch_all(
            tmp.path(),
            &[
                "tn/a_tn.jpg",
                "tn/b_tn.jpg",
                "med/a_med.jpg",
                "med/a_med.html",
                "med/b_med.jpg",
                "med/b_med.html",
                "Trip/tn/c_tn.jpg",
                "Trip/med/c_med.jpg",
                "Trip/med/c_med.html",
            ],
        );
        tmp
    }

    #[test]
    fn fully_built_tree_has_no_orphans() {
        let tmp = built_sample();
        let tree = GalleryTree::scan(tmp.path()).unwrap();
        assert!(find_orphans(&tree).unwrap().is_empty());
    }

    #[test]
    fn deleted_source_leaves_orphans() {
        let tmp = built_sample();
        fs::remove_file(tmp.path().join("b.jpg")).unwrap();
        let tree = GalleryTree::scan(tmp.path()).unwrap();

        assert_eq!(
            find_orphans(&tree).unwrap(),
            [
                tmp.path().join("med/b_med.html"),
                tmp.path().join("med/b_med.jpg"),
                tmp.path().join("tn/b_tn.jpg"),
            ]
        );
    }

    #[test]
    fn partial_leftovers_are_orphans() {
        let tmp = built_sample();
        touch_all(tmp.path(), &["Trip/tn/.partial-c_tn.jpg"]);
        let tree = GalleryTree::scan(tmp.path()).unwrap();

        assert_eq!(
            find_orphans(&tree).unwrap(),
            [tmp.path().join("Trip/tn/.partial-c_tn.jpg")]
        );
    }

    #[test]
    fn files_outside_derivative_dirs_are_never_orphans() {
        let tmp = built_sample();
        touch_all(tmp.path(), &["notes.txt", "style.css", "Trip/old_tn.jpg"]);
        let tree = GalleryTree::scan(tmp.path()).unwrap();
        assert!(find_orphans(&tree).unwrap().is_empty());
    }

    #[test]
    fn prune_removes_orphans() {
        let tmp = built_sample();
        fs::remove_file(tmp.path().join("Trip/c.jpg")).unwrap();
        let tree = GalleryTree::scan(tmp.path()).unwrap();

        let report = prune(&tree, false).unwrap();

        assert_eq!(report.removed.len(), 3);
        assert!(!tmp.path().join("Trip/tn/c_tn.jpg").exists());
        assert!(tmp.path().join("tn/a_tn.jpg").exists());
    }

    #[test]
    fn dry_run_removes_nothing() {
        let tmp = built_sample();
        fs::remove_file(tmp.path().join("a.jpg")).unwrap();
        let tree = GalleryTree::scan(tmp.path()).unwrap();

        let report = prune(&tree, true).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.removed.len(), 3);
        assert!(tmp.path().join("tn/a_tn.jpg").exists());
    }

    #[test]
    #[cfg(unix)]
    fn incomplete_scan_is_not_pruned() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = built_sample();
        let trip = tmp.path().join("Trip");
        fs::set_permissions(&trip, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&trip).is_ok() {
            // Running as root; permissions are not enforced.
            fs::set_permissions(&trip, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let tree = GalleryTree::scan(tmp.path()).unwrap();
        fs::set_permissions(&trip, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(prune(&tree, false), Err(PruneError::IncompleteScan(1))));
    }
}
