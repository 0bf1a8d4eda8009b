//! CLI output formatting for scanning, building and pruning.
//!
//! # Information-First Display
//!
//! Galleries are shown by title and position with their recursive counts;
//! artifacts are shown by path relative to the gallery root, followed by
//! what happened to them.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Gallery photos (1 albums, 3 images)
//!     001 Trip (1 images)
//!         001 2004-05-01 Beach (4 images)
//! ```
//!
//! ## Build
//!
//! ```text
//! ==> Indices
//!     index.html
//!     Trip/index.html
//! ==> Index thumbnails
//!     tn/a_tn.jpg: built
//!     Trip/tn/c_tn.jpg: exists
//! ==> Mediums
//!     med/b_med.jpg: FAILED (`convert` failed (exit status: 1): ...)
//!     med/b_med.html: written
//!
//! Built 4 images (2 existing), wrote 2 indexes and 3 pages
//! ```
//!
//! ## Profile
//!
//! ```text
//! indices             1.20 ms
//! index thumbnails   10.54 ms
//! thumbnails         31.02 ms
//! mediums            80.77 ms
//! total             123.53 ms
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{BuildEvent, BuildReport};
use crate::prune::PruneReport;
use crate::render::details_line;
use crate::tree::GalleryTree;
use crate::types::GalleryId;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// A path relative to `root`, `/`-separated. Paths outside `root` are shown
/// whole.
fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

/// Milliseconds with two decimals.
fn format_millis(elapsed: Duration) -> String {
    format!("{:.2} ms", elapsed.as_secs_f64() * 1000.0)
}

/// "Trip (1 albums, 4 images)", or just the title for an empty gallery.
fn gallery_header(tree: &GalleryTree, id: GalleryId) -> String {
    let title = tree.gallery(id).title();
    let details = details_line(tree, id);
    if details.is_empty() {
        title.to_string()
    } else {
        format!("{title} ({details})")
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the scanned gallery structure, followed by any scan errors.
pub fn format_scan_output(tree: &GalleryTree) -> Vec<String> {
    let mut lines = vec![format!("Gallery {}", gallery_header(tree, tree.root()))];
    format_children(tree, tree.root(), 1, &mut lines);

    if !tree.errors().is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        for err in tree.errors() {
            lines.push(format!("    {err}"));
        }
    }
    lines
}

fn format_children(tree: &GalleryTree, id: GalleryId, depth: usize, lines: &mut Vec<String>) {
    for (i, &child) in tree.gallery(id).galleries().iter().enumerate() {
        lines.push(format!(
            "{}{} {}",
            indent(depth),
            format_index(i + 1),
            gallery_header(tree, child)
        ));
        format_children(tree, child, depth + 1, lines);
    }
}

/// Print scan output to stdout.
pub fn print_scan_output(tree: &GalleryTree) {
    for line in format_scan_output(tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format one progress event. Paths are shown relative to `root`.
pub fn format_build_event(event: &BuildEvent, root: &Path) -> Vec<String> {
    match event {
        BuildEvent::StylesheetInstalled { path } => {
            vec![format!("Installed default stylesheet: {}", relative(path, root))]
        }
        BuildEvent::PhaseStarted { phase } => vec![format!("==> {}", phase.title())],
        BuildEvent::IndexWritten { path } => vec![format!("    {}", relative(path, root))],
        BuildEvent::ImageBuilt { path, .. } => {
            vec![format!("    {}: built", relative(path, root))]
        }
        BuildEvent::ImageExists { path, .. } => {
            vec![format!("    {}: exists", relative(path, root))]
        }
        BuildEvent::ImageFailed { path, error, .. } => {
            vec![format!("    {}: FAILED ({})", relative(path, root), error)]
        }
        BuildEvent::HtmlWritten { path, .. } => {
            vec![format!("    {}: written", relative(path, root))]
        }
        // Timings are reported by the profile output.
        BuildEvent::PhaseFinished { .. } => Vec::new(),
    }
}

/// Format the end-of-build summary, listing any failed artifacts.
pub fn format_build_summary(report: &BuildReport, root: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Built {} images ({} existing), wrote {} indexes and {} pages",
        report.images_built, report.images_existing, report.indices_written, report.html_written
    )];

    if !report.failures.is_empty() {
        lines.push(format!("{} images failed:", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!(
                "    {} → {}",
                relative(&failure.source, root),
                relative(&failure.target, root)
            ));
            lines.push(format!("        {}", failure.message));
        }
    }
    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(report: &BuildReport, root: &Path) {
    for line in format_build_summary(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Profiling output
// ============================================================================

/// Format per-phase timings as an aligned table with a total row.
pub fn format_phase_timings(report: &BuildReport) -> Vec<String> {
    let rows: Vec<(&str, String)> = report
        .timings
        .iter()
        .map(|t| (t.phase.as_str(), format_millis(t.elapsed)))
        .chain(std::iter::once(("total", format_millis(report.total_elapsed()))))
        .collect();

    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(label, value)| format!("{label:<label_width$} {value:>value_width$}"))
        .collect()
}

/// Print per-phase timings to stdout.
pub fn print_phase_timings(report: &BuildReport) {
    for line in format_phase_timings(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Prune output
// ============================================================================

pub fn format_prune_report(report: &PruneReport, root: &Path) -> Vec<String> {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    let mut lines = vec![format!("{verb} {} orphaned files", report.removed.len())];
    for path in &report.removed {
        lines.push(format!("    {}", relative(path, root)));
    }
    lines
}

pub fn print_prune_report(report: &PruneReport, root: &Path) {
    for line in format_prune_report(report, root) {
        println!("{}", line);
    }
}
