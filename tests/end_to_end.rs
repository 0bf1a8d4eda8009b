//! End-to-end builds over real directories.
//!
//! The resize backend here writes the requested geometry into the target
//! instead of pixels, so every derivative can be checked without ImageMagick.

use gall::imaging::{BackendError, ResizeBackend, ResizeRequest};
use gall::pipeline::{self, BuildEvent, BuildOptions, Phase};
use gall::prune;
use gall::render::MaudRenderer;
use gall::tree::GalleryTree;
use gall::urls::UrlResolver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingBackend {
    targets: Mutex<Vec<PathBuf>>,
    failing: Vec<&'static str>,
}

impl RecordingBackend {
    fn resized(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}

impl ResizeBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn resize(&self, request: &ResizeRequest) -> Result<(), BackendError> {
        self.targets.lock().unwrap().push(request.target.clone());
        let name = request.source.file_name().unwrap().to_string_lossy();
        if self.failing.iter().any(|f| *f == name) {
            return Err(BackendError::ProcessingFailed {
                path: request.source.clone(),
                message: "unreadable image".to_string(),
            });
        }
        fs::write(&request.target, request.geometry.to_string())?;
        Ok(())
    }
}

fn touch(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
}

fn sample() -> TempDir {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), &["a.jpg", "b.jpg", "Trip/c.jpg"]);
    tmp
}

fn build(root: &Path, backend: &RecordingBackend) -> pipeline::BuildReport {
    let tree = GalleryTree::scan(root).unwrap();
    let renderer = MaudRenderer::new(UrlResolver::new(tree.root_path(), "/photos"), 5, "style.css");
    let options = BuildOptions {
        fail_fast: false,
        stylesheet: Some("style.css".to_string()),
    };
    pipeline::build(&tree, backend, &renderer, &options, None).unwrap()
}

fn read(root: &Path, file: &str) -> String {
    fs::read_to_string(root.join(file)).unwrap()
}

#[test]
fn first_build_produces_full_layout() {
    let tmp = sample();
    let root = tmp.path();
    let backend = RecordingBackend::default();

    let report = build(root, &backend);

    assert!(report.is_success());
    assert!(report.stylesheet_installed);
    assert_eq!(report.indices_written, 2);
    assert_eq!(report.images_built, 6);
    assert_eq!(report.html_written, 3);

    for file in [
        "index.html",
        "style.css",
        "tn/a_tn.jpg",
        "tn/b_tn.jpg",
        "med/a_med.jpg",
        "med/a_med.html",
        "med/b_med.jpg",
        "med/b_med.html",
        "Trip/index.html",
        "Trip/tn/c_tn.jpg",
        "Trip/med/c_med.jpg",
        "Trip/med/c_med.html",
    ] {
        assert!(root.join(file).is_file(), "missing {file}");
    }
    assert_eq!(read(root, "tn/a_tn.jpg"), "133x133");
    assert_eq!(read(root, "Trip/med/c_med.jpg"), "800x800");
    assert!(!root.join("Trip/tn/.partial-c_tn.jpg").exists());
}

#[test]
fn root_index_links_children_through_public_urls() {
    let tmp = sample();
    let root = tmp.path();
    build(root, &RecordingBackend::default());

    let index = read(root, "index.html");
    assert!(index.contains(r#"href="/photos/style.css""#));
    assert!(index.contains(r#"href="/photos/Trip/""#));
    assert!(index.contains(r#"src="/photos/Trip/tn/c_tn.jpg""#));
    assert!(index.contains(r#"href="/photos/med/a_med.html""#));
    assert!(index.contains("1 albums, 3 images"));

    let trip = read(root, "Trip/index.html");
    assert!(trip.contains(r#"<a href="/photos/">"#));
    assert!(trip.contains("1 images"));
}

#[test]
fn medium_pages_link_neighbours_in_order() {
    let tmp = sample();
    let root = tmp.path();
    build(root, &RecordingBackend::default());

    let a = read(root, "med/a_med.html");
    assert!(!a.contains("(prev)"));
    assert!(a.contains(r#"<a class="next" href="/photos/med/b_med.html">b.jpg (next)</a>"#));

    let b = read(root, "med/b_med.html");
    assert!(b.contains(r#"<a class="previous" href="/photos/med/a_med.html">(prev) a.jpg</a>"#));
    assert!(!b.contains("(next)"));

    // Siblings never cross gallery boundaries.
    let c = read(root, "Trip/med/c_med.html");
    assert!(!c.contains("(prev)"));
    assert!(!c.contains("(next)"));
    assert!(c.contains(r#"<a class="image" href="/photos/Trip/c.jpg"><img src="/photos/Trip/med/c_med.jpg""#));
}

#[test]
fn rebuild_only_resizes_new_images() {
    let tmp = sample();
    let root = tmp.path();
    build(root, &RecordingBackend::default());

    touch(root, &["Trip/d.jpg"]);
    let backend = RecordingBackend::default();
    let report = build(root, &backend);

    assert_eq!(report.images_built, 2);
    assert_eq!(report.images_existing, 8);
    assert_eq!(backend.resized(), 2);
    assert_eq!(report.indices_written, 2);
    assert_eq!(report.html_written, 4);
    assert!(!report.stylesheet_installed);

    let c = read(root, "Trip/med/c_med.html");
    assert!(c.contains("d.jpg (next)"));
}

#[test]
fn existing_stylesheet_is_left_alone() {
    let tmp = sample();
    let root = tmp.path();
    fs::write(root.join("style.css"), "body { color: red }").unwrap();

    let report = build(root, &RecordingBackend::default());

    assert!(!report.stylesheet_installed);
    assert_eq!(read(root, "style.css"), "body { color: red }");
}

#[test]
fn empty_gallery_borrows_nested_thumbnail() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    touch(root, &["2004/Spring/x.jpg", "2004/Summer/y.jpg"]);
    let backend = RecordingBackend::default();

    let report = build(root, &backend);

    // x_tn.jpg is the thumbnail of root, 2004 and Spring but is made once.
    let made_x = backend
        .targets
        .lock()
        .unwrap()
        .iter()
        .filter(|t| t.ends_with("2004/Spring/tn/.partial-x_tn.jpg"))
        .count();
    assert_eq!(made_x, 1);
    assert_eq!(report.images_built, 4);

    let index = read(root, "index.html");
    assert!(index.contains(r#"src="/photos/2004/Spring/tn/x_tn.jpg""#));
    assert!(index.contains("3 albums, 2 images"));
}

#[test]
fn failed_resize_is_reported_and_leaves_no_file() {
    let tmp = sample();
    let root = tmp.path();
    let backend = RecordingBackend {
        failing: vec!["b.jpg"],
        ..Default::default()
    };

    let report = build(root, &backend);

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 2);
    assert!(!root.join("tn/b_tn.jpg").exists());
    assert!(!root.join("tn/.partial-b_tn.jpg").exists());
    assert!(root.join("med/b_med.html").exists());
    assert!(root.join("Trip/med/c_med.jpg").exists());

    // The next run retries only what failed.
    let retry = RecordingBackend::default();
    let report = build(root, &retry);
    assert!(report.is_success());
    assert_eq!(retry.resized(), 2);
}

#[test]
fn fail_fast_stops_the_build() {
    let tmp = sample();
    let tree = GalleryTree::scan(tmp.path()).unwrap();
    let renderer = MaudRenderer::new(UrlResolver::new(tree.root_path(), "/photos"), 5, "style.css");
    let backend = RecordingBackend {
        failing: vec!["a.jpg"],
        ..Default::default()
    };
    let options = BuildOptions {
        fail_fast: true,
        stylesheet: None,
    };

    let result = pipeline::build(&tree, &backend, &renderer, &options, None);

    assert!(matches!(result, Err(pipeline::BuildError::Resize { .. })));
}

#[test]
fn events_follow_phase_order() {
    let tmp = sample();
    let tree = GalleryTree::scan(tmp.path()).unwrap();
    let renderer = MaudRenderer::new(UrlResolver::new(tree.root_path(), "/photos"), 5, "style.css");
    let (tx, rx) = std::sync::mpsc::channel();

    pipeline::build(
        &tree,
        &RecordingBackend::default(),
        &renderer,
        &BuildOptions::default(),
        Some(tx),
    )
    .unwrap();

    let started: Vec<Phase> = rx
        .iter()
        .filter_map(|event| match event {
            BuildEvent::PhaseStarted { phase } => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(started, Phase::ALL);
}

#[test]
fn prune_after_deleting_a_source() {
    let tmp = sample();
    let root = tmp.path();
    build(root, &RecordingBackend::default());
    fs::remove_file(root.join("a.jpg")).unwrap();

    let tree = GalleryTree::scan(root).unwrap();
    let report = prune::prune(&tree, false).unwrap();

    assert_eq!(report.removed.len(), 3);
    assert!(!root.join("med/a_med.html").exists());
    assert!(root.join("med/b_med.html").exists());

    // A rebuild after pruning has nothing left to prune.
    build(root, &RecordingBackend::default());
    let tree = GalleryTree::scan(root).unwrap();
    assert!(prune::find_orphans(&tree).unwrap().is_empty());
}
