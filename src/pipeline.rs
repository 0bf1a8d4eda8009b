//! The build pipeline: turns a scanned [`GalleryTree`] into pages and
//! resized images.
//!
//! ## Phases
//!
//! Four phases run in order, each over the whole tree in walk order:
//!
//! 1. **Indices**: rewrite every gallery's `index.html`.
//! 2. **Index thumbnails**: make sure every gallery's propagated thumbnail
//!    exists, so index pages never show a broken image while the rest of the
//!    build is still running.
//! 3. **Thumbnails**: every item's `tn` artifacts.
//! 4. **Mediums**: every item's `med` artifacts.
//!
//! ## Incremental Builds
//!
//! A resized image is only made when its path does not exist yet. Pages are
//! always rewritten, since navigation links change whenever a sibling is
//! added or removed. Resizes write to a `.partial-` sibling that is renamed
//! into place on success, so an existing artifact is always a complete one
//! and a failed one is retried on the next run.
//!
//! ## Failures
//!
//! A failed resize is logged, reported as an [`ArtifactFailure`] and the
//! build moves on; [`BuildOptions::fail_fast`] aborts on the first one
//! instead. I/O errors writing pages and rendering errors always abort.
//!
//! ## Parallel Processing
//!
//! Within a phase, galleries and items are processed in parallel using
//! [rayon](https://docs.rs/rayon). No two workers ever write the same file:
//!
//! - Resized images carry their source's extension, so each belongs to one
//!   item. Phase 2 deduplicates thumbnails shared by several galleries.
//! - Pages always end in `.html`, so `a.gif` and `a.jpg` share
//!   `med/a_med.html`. Only the last of them in walk order writes it.

use crate::derivation::Derivation;
use crate::imaging::{BackendError, ResizeBackend};
use crate::media::DerivationKind;
use crate::render::{RenderError, Renderer};
use crate::tree::GalleryTree;
use crate::types::ItemId;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

/// Stylesheet installed at the gallery root when none is present.
pub const DEFAULT_STYLESHEET: &str = include_str!("../static/style.css");

/// Prefix for in-progress resize output.
pub const PARTIAL_PREFIX: &str = ".partial-";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("cannot resize {path}: {source}")]
    Resize {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Indices,
    IndexThumbnails,
    Thumbnails,
    Mediums,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Indices,
        Phase::IndexThumbnails,
        Phase::Thumbnails,
        Phase::Mediums,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Indices => "indices",
            Phase::IndexThumbnails => "index thumbnails",
            Phase::Thumbnails => "thumbnails",
            Phase::Mediums => "mediums",
        }
    }

    /// Heading used in logs and progress output.
    pub fn title(self) -> &'static str {
        match self {
            Phase::Indices => "Indices",
            Phase::IndexThumbnails => "Index thumbnails",
            Phase::Thumbnails => "Thumbnails",
            Phase::Mediums => "Mediums",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notifications, sent as the build runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    StylesheetInstalled { path: PathBuf },
    PhaseStarted { phase: Phase },
    IndexWritten { path: PathBuf },
    ImageBuilt { phase: Phase, path: PathBuf },
    ImageExists { phase: Phase, path: PathBuf },
    ImageFailed { phase: Phase, path: PathBuf, error: String },
    HtmlWritten { phase: Phase, path: PathBuf },
    PhaseFinished { phase: Phase, elapsed: Duration },
}

/// A resized image that could not be made.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFailure {
    pub phase: Phase,
    pub source: PathBuf,
    pub target: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: Phase,
    pub elapsed: Duration,
}

/// What a build did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub stylesheet_installed: bool,
    pub indices_written: usize,
    pub images_built: usize,
    pub images_existing: usize,
    pub html_written: usize,
    pub failures: Vec<ArtifactFailure>,
    pub timings: Vec<PhaseTiming>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Abort on the first failed resize.
    pub fail_fast: bool,
    /// Install [`DEFAULT_STYLESHEET`] at this root-relative path if missing.
    pub stylesheet: Option<String>,
}

/// Result of ensuring one image artifact.
#[derive(Debug)]
enum ImageOutcome {
    Built,
    Exists,
    Failed(ArtifactFailure),
}

/// Per-item outcome of phases 3 and 4.
#[derive(Debug, Default)]
struct ItemOutcome {
    image: Option<ImageOutcome>,
    html_written: bool,
}

/// Items that write their `kind` page. Items sharing a page path leave it
/// to the last of them in walk order.
fn page_writers(tree: &GalleryTree, items: &[ItemId], kind: DerivationKind) -> HashSet<ItemId> {
    let mut writers = HashMap::new();
    for &id in items {
        let derivation = tree.item(id).derivation(kind);
        if derivation.has_html() {
            writers.insert(derivation.html(), id);
        }
    }
    writers.into_values().collect()
}

/// The `.partial-` sibling a resize writes to before it is renamed.
pub fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!("{PARTIAL_PREFIX}{name}"))
}

/// Run all four phases over `tree`.
pub fn build(
    tree: &GalleryTree,
    backend: &dyn ResizeBackend,
    renderer: &dyn Renderer,
    options: &BuildOptions,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let builder = Builder {
        tree,
        backend,
        renderer,
        options,
        events,
    };
    builder.run()
}

struct Builder<'a> {
    tree: &'a GalleryTree,
    backend: &'a dyn ResizeBackend,
    renderer: &'a dyn Renderer,
    options: &'a BuildOptions,
    events: Option<Sender<BuildEvent>>,
}

impl Builder<'_> {
    fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn run(&self) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport {
            stylesheet_installed: self.install_stylesheet()?,
            ..Default::default()
        };

        for phase in Phase::ALL {
            info!("{}", phase.title());
            self.emit(BuildEvent::PhaseStarted { phase });
            let started = Instant::now();

            match phase {
                Phase::Indices => self.indices(&mut report)?,
                Phase::IndexThumbnails => self.index_thumbnails(&mut report)?,
                Phase::Thumbnails => self.derivations(phase, DerivationKind::Thumbnail, &mut report)?,
                Phase::Mediums => self.derivations(phase, DerivationKind::Medium, &mut report)?,
            }

            let elapsed = started.elapsed();
            report.timings.push(PhaseTiming { phase, elapsed });
            self.emit(BuildEvent::PhaseFinished { phase, elapsed });
        }

        Ok(report)
    }

    fn install_stylesheet(&self) -> Result<bool, BuildError> {
        let Some(name) = &self.options.stylesheet else {
            return Ok(false);
        };
        let path = self.tree.root_path().join(name);
        if path.exists() {
            return Ok(false);
        }
        write_file(&path, DEFAULT_STYLESHEET)?;
        info!("Installed default stylesheet at {}", path.display());
        self.emit(BuildEvent::StylesheetInstalled { path });
        Ok(true)
    }

    fn indices(&self, report: &mut BuildReport) -> Result<(), BuildError> {
        let galleries = self.tree.walk_galleries();
        let written = galleries
            .par_iter()
            .map(|&id| {
                let gallery = self.tree.gallery(id);
                debug!("Gallery: {}", gallery.path().display());
                let html = self.renderer.render_gallery(self.tree, id)?;
                let path = gallery.index_path();
                write_file(&path, &html)?;
                self.emit(BuildEvent::IndexWritten { path });
                Ok(())
            })
            .collect::<Result<Vec<()>, BuildError>>()?;
        report.indices_written += written.len();
        Ok(())
    }

    fn index_thumbnails(&self, report: &mut BuildReport) -> Result<(), BuildError> {
        let mut seen = HashSet::new();
        let thumbnails: Vec<ItemId> = self
            .tree
            .walk_galleries()
            .into_iter()
            .filter_map(|g| self.tree.thumbnail_item(g))
            .filter(|&item| seen.insert(item))
            .collect();

        let outcomes = thumbnails
            .par_iter()
            .map(|&item| {
                let derivation = self.tree.item(item).derivation(DerivationKind::Thumbnail);
                self.ensure_image(Phase::IndexThumbnails, derivation)
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        for outcome in outcomes {
            tally_image(report, outcome);
        }
        Ok(())
    }

    fn derivations(
        &self,
        phase: Phase,
        kind: DerivationKind,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        let items = self.tree.walk_items();
        let writers = page_writers(self.tree, &items, kind);
        let outcomes = items
            .par_iter()
            .map(|&id| self.derive_item(phase, id, kind, writers.contains(&id)))
            .collect::<Result<Vec<_>, BuildError>>()?;

        for outcome in outcomes {
            if let Some(image) = outcome.image {
                tally_image(report, image);
            }
            if outcome.html_written {
                report.html_written += 1;
            }
        }
        Ok(())
    }

    fn derive_item(
        &self,
        phase: Phase,
        id: ItemId,
        kind: DerivationKind,
        writes_page: bool,
    ) -> Result<ItemOutcome, BuildError> {
        let item = self.tree.item(id);
        let derivation = item.derivation(kind);
        let mut outcome = ItemOutcome::default();

        if derivation.has_image() {
            outcome.image = Some(self.ensure_image(phase, derivation)?);
        }

        if derivation.has_html() && !writes_page {
            debug!("HTML({kind}) for {} is written by a later item", item.path().display());
        } else if derivation.has_html() {
            debug!("Making HTML({kind}) for: {}: {}", item.kind(), item.path().display());
            let html = self.renderer.render_item(self.tree, id, kind)?;
            let path = derivation.html().to_path_buf();
            write_file(&path, &html)?;
            self.emit(BuildEvent::HtmlWritten { phase, path });
            outcome.html_written = true;
        } else {
            debug!("Skipping HTML({kind}) for: {}: {}", item.kind(), item.path().display());
        }

        Ok(outcome)
    }

    /// Make `derivation`'s image unless it already exists.
    fn ensure_image(&self, phase: Phase, derivation: &Derivation) -> Result<ImageOutcome, BuildError> {
        let target = derivation.path();
        if target.exists() {
            self.emit(BuildEvent::ImageExists {
                phase,
                path: target.to_path_buf(),
            });
            return Ok(ImageOutcome::Exists);
        }

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).map_err(|source| BuildError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let partial = partial_path(target);
        let request = derivation.resize_request(&partial);
        let result = self
            .backend
            .resize(&request)
            .and_then(|()| fs::rename(&partial, target).map_err(BackendError::from));

        match result {
            Ok(()) => {
                debug!("{} {} -> {}", self.backend.name(), derivation.source().display(), target.display());
                self.emit(BuildEvent::ImageBuilt {
                    phase,
                    path: target.to_path_buf(),
                });
                Ok(ImageOutcome::Built)
            }
            Err(err) => {
                let _ = fs::remove_file(&partial);
                error!("{}: {err}", target.display());
                if self.options.fail_fast {
                    return Err(BuildError::Resize {
                        path: derivation.source().to_path_buf(),
                        source: err,
                    });
                }
                let failure = ArtifactFailure {
                    phase,
                    source: derivation.source().to_path_buf(),
                    target: target.to_path_buf(),
                    message: err.to_string(),
                };
                self.emit(BuildEvent::ImageFailed {
                    phase,
                    path: target.to_path_buf(),
                    error: failure.message.clone(),
                });
                Ok(ImageOutcome::Failed(failure))
            }
        }
    }
}

fn tally_image(report: &mut BuildReport, outcome: ImageOutcome) {
    match outcome {
        ImageOutcome::Built => report.images_built += 1,
        ImageOutcome::Exists => report.images_existing += 1,
        ImageOutcome::Failed(failure) => report.failures.push(failure),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    let io_err = |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}
