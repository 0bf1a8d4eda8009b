//! Public URLs for files in a gallery.
//!
//! Every page and image is published under one base URL. A file's URL is the
//! base joined with the file's path relative to the gallery root, each
//! segment percent-encoded so the result can go straight into an `href`.
//!
//! | Path (root `photos/`) | URL (base `/photos`) |
//! |---|---|
//! | `photos/` | `/photos/` |
//! | `photos/index.html` | `/photos/` |
//! | `photos/Trip/index.html` | `/photos/Trip/` |
//! | `photos/Trip/med/c_med.html` | `/photos/Trip/med/c_med.html` |
//! | `photos/My Trip/tn/a_tn.jpg` | `/photos/My%20Trip/tn/a_tn.jpg` |
//!
//! Index pages map to their directory so the web server's default-document
//! lookup serves them.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Characters left alone inside one path segment: RFC 3986 unreserved plus
/// the sub-delimiters that are harmless in a path.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// For the configured base URL: as [`SEGMENT_ENCODE_SET`], but `%` is kept
/// so an already-escaped base stays as written.
const BASE_ENCODE_SET: &AsciiSet = &SEGMENT_ENCODE_SET.remove(b'%');

const INDEX_SUFFIX: &str = "/index.html";

/// Maps filesystem paths under a gallery root to public URLs.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    root: PathBuf,
    base_url: String,
}

impl UrlResolver {
    /// A trailing slash on `base_url` is dropped and its path is
    /// percent-encoded; a `scheme://host` prefix is left as is.
    pub fn new(root: &Path, base_url: &str) -> Self {
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url);
        let (origin, path) = split_origin(base_url);
        let path = path
            .split('/')
            .map(|segment| utf8_percent_encode(segment, BASE_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            root: root.to_path_buf(),
            base_url: format!("{origin}{path}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL for `path`, which should lie under the root.
    pub fn url_for(&self, path: &Path) -> String {
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => {
                debug!(
                    "{} is outside {}, using it as-is",
                    path.display(),
                    self.root.display()
                );
                path
            }
        };

        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(encode_segment(&s.to_string_lossy())),
                _ => None,
            })
            .collect();

        if segments.is_empty() {
            return format!("{}/", self.base_url);
        }

        let url = format!("{}/{}", self.base_url, segments.join("/"));
        match url.strip_suffix(INDEX_SUFFIX) {
            Some(dir) => format!("{dir}/"),
            None => url,
        }
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string()
}

/// Resolve `.` and `..` segments in a `/`-separated path. Backslashes are
/// treated as separators and empty segments dropped; a leading `/` survives.
pub fn cleanpath(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let mut cleaned: Vec<&str> = Vec::new();
    for (i, part) in normalized.split('/').enumerate() {
        match part {
            "" if i > 0 => {}
            "." => {}
            ".." => {
                cleaned.pop();
            }
            _ => cleaned.push(part),
        }
    }
    let out = cleaned.join("/");
    if out.is_empty() && normalized.starts_with('/') {
        return "/".to_string();
    }
    out
}

/// The base URL for a scanned directory: `base_url/dir`, cleaned. A
/// `scheme://host` prefix is kept verbatim.
pub fn join_base_url(base_url: &str, dir: &Path) -> String {
    let (origin, path) = split_origin(base_url);
    let joined = cleanpath(&format!("{}/{}", path, dir.to_string_lossy()));
    format!("{origin}{joined}")
}

fn split_origin(url: &str) -> (&str, &str) {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return ("", url);
    };
    let end = url[scheme_end..]
        .find('/')
        .map_or(url.len(), |i| scheme_end + i);
    url.split_at(end)
}
