//! Media kinds, their capability tables, and path classification.
//!
//! Each kind of gallery file carries a constant [`Capabilities`] record: the
//! file extensions it claims and the table of derivations built from it.
//! Everything else in the crate dispatches on [`MediaKind`] and reads the
//! table, so adding a kind means adding a variant and a record here.
//!
//! ## Derivation tables
//!
//! | Kind | Derivation | Token | Geometry | Mode | Image | HTML |
//! |---|---|---|---|---|---|---|
//! | Image | thumbnail | `tn` | 133x133 | scale | yes | no |
//! | Image | medium | `med` | 800x800 | resize | yes | yes |
//! | Movie | thumbnail | `tn` | 133x133 | scale | no | no |
//! | Movie | medium | `med` | 800x800 | resize | no | no |
//!
//! Movies share the layout but build nothing yet: there is no frame grabber
//! behind the resize backends.

use crate::imaging::{Geometry, ResizeMode};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use tracing::warn;

/// Directory names that hold generated derivatives, never content.
pub const DERIVATIVE_DIRS: &[&str] = &["tn", "med"];

/// The named derivations every gallery file has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationKind {
    Thumbnail,
    Medium,
}

impl DerivationKind {
    pub const ALL: [DerivationKind; 2] = [DerivationKind::Thumbnail, DerivationKind::Medium];

    pub(crate) fn slot(self) -> usize {
        match self {
            DerivationKind::Thumbnail => 0,
            DerivationKind::Medium => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DerivationKind::Thumbnail => "thumbnail",
            DerivationKind::Medium => "medium",
        }
    }
}

impl fmt::Display for DerivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one derivation is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationSpec {
    /// Directory token and filename suffix (`tn`, `med`).
    pub token: &'static str,
    pub geometry: Geometry,
    pub mode: ResizeMode,
    /// Produces a resized image.
    pub has_image: bool,
    /// Produces a companion detail page.
    pub has_html: bool,
}

/// Static capability record for a media kind.
#[derive(Debug)]
pub struct Capabilities {
    /// Lower-case extensions including the dot.
    pub extensions: &'static [&'static str],
    /// Indexed by [`DerivationKind::slot`].
    pub derivations: [DerivationSpec; 2],
}

const THUMBNAIL_GEOMETRY: Geometry = Geometry::new(133, 133);
const MEDIUM_GEOMETRY: Geometry = Geometry::new(800, 800);

static IMAGE: Capabilities = Capabilities {
    extensions: &[".jpg", ".gif"],
    derivations: [
        DerivationSpec {
            token: "tn",
            geometry: THUMBNAIL_GEOMETRY,
            mode: ResizeMode::Scale,
            has_image: true,
            has_html: false,
        },
        DerivationSpec {
            token: "med",
            geometry: MEDIUM_GEOMETRY,
            mode: ResizeMode::Resize,
            has_image: true,
            has_html: true,
        },
    ],
};

static MOVIE: Capabilities = Capabilities {
    extensions: &[".avi", ".mov"],
    derivations: [
        DerivationSpec {
            token: "tn",
            geometry: THUMBNAIL_GEOMETRY,
            mode: ResizeMode::Scale,
            has_image: false,
            has_html: false,
        },
        DerivationSpec {
            token: "med",
            geometry: MEDIUM_GEOMETRY,
            mode: ResizeMode::Resize,
            has_image: false,
            has_html: false,
        },
    ],
};

/// Kind of a gallery file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Movie,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Movie];

    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            MediaKind::Image => &IMAGE,
            MediaKind::Movie => &MOVIE,
        }
    }

    pub fn spec(self, kind: DerivationKind) -> &'static DerivationSpec {
        &self.capabilities().derivations[kind.slot()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Movie => "movie",
        }
    }

    /// The kind claiming this file's extension, compared case-insensitively.
    pub fn for_path(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        MediaKind::ALL.into_iter().find(|kind| {
            kind.capabilities()
                .extensions
                .iter()
                .any(|known| known.trim_start_matches('.') == ext)
        })
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    Media(MediaKind),
    Unknown,
}

/// Classify a path on disk.
///
/// Symlinks are followed. A symlink whose target cannot be inspected
/// (dangling, looping, unreadable) is `Unknown`; any other metadata failure
/// (permission denied, vanished mid-scan) is an error.
pub fn classify(path: &Path) -> io::Result<PathKind> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if is_symlink(path) => {
            warn!("Skipping link {}: {e}", path.display());
            return Ok(PathKind::Unknown);
        }
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        return Ok(PathKind::Directory);
    }
    Ok(MediaKind::for_path(path).map_or(PathKind::Unknown, PathKind::Media))
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Whether a directory name is reserved for derivatives.
pub fn is_derivative_dir(name: &str) -> bool {
    DERIVATIVE_DIRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn extensions_match_case_insensitively() {
        assert_eq!(MediaKind::for_path(Path::new("a.jpg")), Some(MediaKind::Image));
        assert_eq!(MediaKind::for_path(Path::new("a.JPG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::for_path(Path::new("b.Gif")), Some(MediaKind::Image));
        assert_eq!(MediaKind::for_path(Path::new("c.MOV")), Some(MediaKind::Movie));
        assert_eq!(MediaKind::for_path(Path::new("c.avi")), Some(MediaKind::Movie));
    }

    #[test]
    fn unknown_extensions_are_unclaimed() {
        assert_eq!(MediaKind::for_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::for_path(Path::new("photo.jpeg")), None);
        assert_eq!(MediaKind::for_path(Path::new("README")), None);
    }

    #[test]
    fn classify_on_disk() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Trip.jpg")).unwrap();
        fs::write(tmp.path().join("a.jpg"), "").unwrap();
        fs::write(tmp.path().join("m.avi"), "").unwrap();
        fs::write(tmp.path().join("index.html"), "").unwrap();

        // A directory wins over its extension.
        assert_eq!(
            classify(&tmp.path().join("Trip.jpg")).unwrap(),
            PathKind::Directory
        );
        assert_eq!(
            classify(&tmp.path().join("a.jpg")).unwrap(),
            PathKind::Media(MediaKind::Image)
        );
        assert_eq!(
            classify(&tmp.path().join("m.avi")).unwrap(),
            PathKind::Media(MediaKind::Movie)
        );
        assert_eq!(
            classify(&tmp.path().join("index.html")).unwrap(),
            PathKind::Unknown
        );
    }

    #[test]
    fn missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(classify(&tmp.path().join("gone.jpg")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn dangling_symlink_is_unknown() {
        let tmp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("x.jpg")).unwrap();
        assert_eq!(
            classify(&tmp.path().join("x.jpg")).unwrap(),
            PathKind::Unknown
        );
    }

    #[test]
    #[cfg(unix)]
    fn looping_symlink_is_unknown() {
        let tmp = TempDir::new().unwrap();
        let x = tmp.path().join("x");
        let y = tmp.path().join("y");
        std::os::unix::fs::symlink(&y, &x).unwrap();
        std::os::unix::fs::symlink(&x, &y).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("self"), tmp.path().join("self")).unwrap();

        assert_eq!(classify(&x).unwrap(), PathKind::Unknown);
        assert_eq!(classify(&tmp.path().join("self")).unwrap(), PathKind::Unknown);
    }

    #[test]
    fn image_and_movie_tables_differ_only_in_flags() {
        for kind in DerivationKind::ALL {
            let image = MediaKind::Image.spec(kind);
            let movie = MediaKind::Movie.spec(kind);
            assert_eq!(image.token, movie.token);
            assert_eq!(image.geometry, movie.geometry);
            assert!(image.has_image);
            assert!(!movie.has_image);
            assert!(!movie.has_html);
        }
        assert!(MediaKind::Image.spec(DerivationKind::Medium).has_html);
        assert!(!MediaKind::Image.spec(DerivationKind::Thumbnail).has_html);
    }

    #[test]
    fn derivative_dirs() {
        assert!(is_derivative_dir("tn"));
        assert!(is_derivative_dir("med"));
        assert!(!is_derivative_dir("Tn"));
        assert!(!is_derivative_dir("medium"));
    }
}
