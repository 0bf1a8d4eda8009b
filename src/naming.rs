//! Naming rules: derived artifact paths and display titles.
//!
//! ## Derived Paths
//!
//! Every derivative lives in a sibling directory named after its token, with
//! the token appended to the file stem:
//!
//! - `Trip/c.jpg` + `tn` → `Trip/tn/c_tn.jpg`
//! - `Trip/c.jpg` + `med` → `Trip/med/c_med.jpg`
//! - `Trip/c.jpg` + `med` + `.html` → `Trip/med/c_med.html`
//!
//! The same law places resized images and their companion pages, and it is a
//! pure function of its inputs: rerunning a build finds the same paths.
//!
//! ## Display Titles
//!
//! A node's title is its file name. The current directory (`.`) has no file
//! name of its own, so its title comes from the canonical path instead.
//!
//! Gallery names may start with a date (`2004-05-01 Trip`, `2004-05-Trip`);
//! [`parse_dated_title`] splits it off so pages can style the two parts.

use std::path::{Path, PathBuf};

/// Compute the path of a derivative of `source`.
///
/// `replacement_ext` (with its dot) replaces the source extension; `None`
/// keeps it.
pub fn derived_path(source: &Path, token: &str, replacement_ext: Option<&str>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = match replacement_ext {
        Some(ext) => ext.to_string(),
        None => source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    };
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(token).join(format!("{stem}_{token}{ext}"))
}

/// Display title for a tree node.
pub fn node_title(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().to_string();
    }
    // `.`, `..` or `/`: fall back to the real path's last component.
    path.canonicalize()
        .ok()
        .and_then(|real| real.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}

/// A title split into an optional leading date and the remaining name.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedTitle {
    /// `YYYY-M[M]` or `YYYY-M[M]-D[D]` when present.
    pub date: Option<String>,
    /// The title without its date. The full input when there is no date.
    pub name: String,
}

/// Split a leading date from a title.
///
/// Handles these patterns:
/// - `"2004-05-01 Trip"` → date=Some("2004-05-01"), name="Trip"
/// - `"2004-5-Beach"` → date=Some("2004-5"), name="Beach"
/// - `"2004-05"` → date=None, name="2004-05" (a date needs a name after it)
/// - `"Trip"` → date=None, name="Trip"
pub fn parse_dated_title(title: &str) -> DatedTitle {
    let bytes = title.as_bytes();
    let digits_at = |start: usize, len: usize| {
        bytes.len() >= start + len && bytes[start..start + len].iter().all(u8::is_ascii_digit)
    };

    if digits_at(0, 4) && bytes.get(4) == Some(&b'-') {
        // Try the longest date first, the way a greedy pattern would.
        for month in [2, 1] {
            if !digits_at(5, month) {
                continue;
            }
            let month_end = 5 + month;
            let mut ends = Vec::with_capacity(3);
            if bytes.get(month_end) == Some(&b'-') {
                for day in [2, 1] {
                    if digits_at(month_end + 1, day) {
                        ends.push(month_end + 1 + day);
                    }
                }
            }
            ends.push(month_end);

            for end in ends {
                let separated = matches!(bytes.get(end), Some(b' ') | Some(b'-'));
                if separated && bytes.len() > end + 1 {
                    return DatedTitle {
                        date: Some(title[..end].to_string()),
                        name: title[end + 1..].to_string(),
                    };
                }
            }
        }
    }

    DatedTitle {
        date: None,
        name: title.to_string(),
    }
}
