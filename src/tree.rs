//! The gallery tree: directories as galleries, media files as items.
//!
//! [`GalleryTree::scan`] walks a directory once and builds the whole tree.
//! After that the tree is read-only: there is no `&mut` API, which is what
//! makes every lazily computed property below safe to memoize.
//!
//! ## Construction
//!
//! For each directory, depth first:
//!
//! 1. Classify every child ([`media::classify`]).
//! 2. Drop `tn/` and `med/` subdirectories; they hold derivatives.
//! 3. Recurse into the remaining subdirectories, skipping any symlink that
//!    points back at a directory already being scanned.
//! 4. Keep images and movies, log anything else at debug level. A link
//!    whose target cannot be inspected (dangling or looping) is skipped.
//! 5. Sort galleries, images and movies by full path, case-insensitively.
//! 6. Link each image to its sorted neighbours, and each movie to its own.
//!
//! A subdirectory that cannot be read is left out of its parent and the
//! failure is kept in [`GalleryTree::errors`]. Only an unreadable root fails
//! the scan itself.
//!
//! ## Ownership
//!
//! The tree owns every node in two arenas. Parents list children by id;
//! children point back at their parent by id. No node owns another.
//!
//! ## Cached Properties
//!
//! | Property | Rule |
//! |---|---|
//! | `all_galleries` / `all_images` / `all_movies` | own collection, then each child's aggregate in child order |
//! | `sub_*_count` | own count plus every child's count |
//! | `thumbnail` | first own image, else first child (in order) with a thumbnail |
//! | `ancestors` | parent's ancestors plus the parent, root first |
//! | item derivations | built on first request per derivation kind |
//!
//! Each cache is a [`OnceLock`], computed at most once even when the build
//! pipeline reads the tree from several threads.

use crate::derivation::Derivation;
use crate::media::{self, DerivationKind, MediaKind, PathKind};
use crate::naming::node_title;
use crate::types::{GalleryId, ItemId, NodeId};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Recursive counts for one gallery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubCounts {
    pub galleries: usize,
    pub images: usize,
    pub movies: usize,
}

#[derive(Debug, Default)]
struct GalleryCache {
    all_galleries: OnceLock<Vec<GalleryId>>,
    all_images: OnceLock<Vec<ItemId>>,
    all_movies: OnceLock<Vec<ItemId>>,
    counts: OnceLock<SubCounts>,
    thumbnail: OnceLock<Option<ItemId>>,
    /// Ancestors followed by the gallery itself.
    generations: OnceLock<Vec<GalleryId>>,
}

/// A directory in the tree.
#[derive(Debug)]
pub struct Gallery {
    path: PathBuf,
    title: String,
    parent: Option<GalleryId>,
    galleries: Vec<GalleryId>,
    images: Vec<ItemId>,
    movies: Vec<ItemId>,
    cache: GalleryCache,
}

impl Gallery {
    fn new(path: PathBuf, parent: Option<GalleryId>) -> Self {
        Self {
            title: node_title(&path),
            path,
            parent,
            galleries: Vec::new(),
            images: Vec::new(),
            movies: Vec::new(),
            cache: GalleryCache::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent(&self) -> Option<GalleryId> {
        self.parent
    }

    pub fn galleries(&self) -> &[GalleryId] {
        &self.galleries
    }

    pub fn images(&self) -> &[ItemId] {
        &self.images
    }

    pub fn movies(&self) -> &[ItemId] {
        &self.movies
    }

    pub fn has_children(&self) -> bool {
        !(self.galleries.is_empty() && self.images.is_empty() && self.movies.is_empty())
    }

    /// Where this gallery's index page is written.
    pub fn index_path(&self) -> PathBuf {
        self.path.join("index.html")
    }
}

/// An image or movie in the tree.
#[derive(Debug)]
pub struct MediaItem {
    path: PathBuf,
    title: String,
    kind: MediaKind,
    parent: GalleryId,
    previous: Option<ItemId>,
    next: Option<ItemId>,
    derivations: [OnceLock<Derivation>; 2],
}

impl MediaItem {
    fn new(path: PathBuf, kind: MediaKind, parent: GalleryId) -> Self {
        Self {
            title: node_title(&path),
            path,
            kind,
            parent,
            previous: None,
            next: None,
            derivations: Default::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn parent(&self) -> GalleryId {
        self.parent
    }

    /// Preceding item of the same kind in the same gallery.
    pub fn previous(&self) -> Option<ItemId> {
        self.previous
    }

    /// Following item of the same kind in the same gallery.
    pub fn next(&self) -> Option<ItemId> {
        self.next
    }

    pub fn derivation(&self, kind: DerivationKind) -> &Derivation {
        self.derivations[kind.slot()]
            .get_or_init(|| Derivation::new(&self.path, kind, self.kind.spec(kind)))
    }
}

/// A scanned gallery.
#[derive(Debug)]
pub struct GalleryTree {
    galleries: Vec<Gallery>,
    items: Vec<MediaItem>,
    errors: Vec<ScanError>,
}

/// Children of one directory, classified and sorted.
struct Listing {
    subdirs: Vec<PathBuf>,
    media: Vec<(PathBuf, MediaKind)>,
}

/// Case-insensitive path order, ties broken by the exact path.
fn sort_key(path: &Path) -> (String, PathBuf) {
    (path.to_string_lossy().to_lowercase(), path.to_path_buf())
}

fn read_listing(dir: &Path) -> Result<Listing, ScanError> {
    let read_err = |source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    let mut media = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let kind = media::classify(&path).map_err(|source| ScanError::Inspect {
            path: path.clone(),
            source,
        })?;
        match kind {
            PathKind::Directory => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if media::is_derivative_dir(&name) {
                    continue;
                }
                subdirs.push(path);
            }
            PathKind::Media(kind) => media.push((path, kind)),
            PathKind::Unknown => debug!("Don't know how to handle {}", path.display()),
        }
    }

    subdirs.sort_by_cached_key(|p| sort_key(p));
    media.sort_by_cached_key(|(p, _)| sort_key(p));
    Ok(Listing { subdirs, media })
}

/// Resolve the real location of `dir`, given the real location of its parent.
fn real_dir(dir: &Path, parent_real: &Path) -> Result<PathBuf, ScanError> {
    let is_link = fs::symlink_metadata(dir)
        .map(|m| m.file_type().is_symlink())
        .map_err(|source| ScanError::Inspect {
            path: dir.to_path_buf(),
            source,
        })?;
    if is_link {
        dir.canonicalize().map_err(|source| ScanError::Inspect {
            path: dir.to_path_buf(),
            source,
        })
    } else {
        Ok(parent_real.join(dir.file_name().unwrap_or_default()))
    }
}

#[derive(Default)]
struct TreeBuilder {
    galleries: Vec<Gallery>,
    items: Vec<MediaItem>,
    errors: Vec<ScanError>,
}

impl TreeBuilder {
    /// Add `path` and its subtree. `visiting` holds the real paths of the
    /// directories currently being scanned, innermost last.
    fn add_gallery(
        &mut self,
        path: PathBuf,
        parent: Option<GalleryId>,
        listing: Listing,
        visiting: &mut Vec<PathBuf>,
    ) -> GalleryId {
        let id = GalleryId(self.galleries.len());
        debug!("Directory! {}", path.display());
        self.galleries.push(Gallery::new(path, parent));

        let mut child_galleries = Vec::with_capacity(listing.subdirs.len());
        for subdir in listing.subdirs {
            if let Some(child) = self.add_subdir(subdir, id, visiting) {
                child_galleries.push(child);
            }
        }

        let mut images = Vec::new();
        let mut movies = Vec::new();
        for (path, kind) in listing.media {
            debug!("{}! {}", kind, path.display());
            let item = ItemId(self.items.len());
            self.items.push(MediaItem::new(path, kind, id));
            match kind {
                MediaKind::Image => images.push(item),
                MediaKind::Movie => movies.push(item),
            }
        }
        self.link_siblings(&images);
        self.link_siblings(&movies);

        let gallery = &mut self.galleries[id.0];
        gallery.galleries = child_galleries;
        gallery.images = images;
        gallery.movies = movies;
        id
    }

    fn add_subdir(
        &mut self,
        subdir: PathBuf,
        parent: GalleryId,
        visiting: &mut Vec<PathBuf>,
    ) -> Option<GalleryId> {
        let parent_real = visiting.last().cloned().unwrap_or_default();
        let real = match real_dir(&subdir, &parent_real) {
            Ok(real) => real,
            Err(err) => {
                self.record(err);
                return None;
            }
        };
        if visiting.contains(&real) {
            warn!(
                "Skipping {}: it links back to {}",
                subdir.display(),
                real.display()
            );
            return None;
        }

        match read_listing(&subdir) {
            Ok(listing) => {
                visiting.push(real);
                let child = self.add_gallery(subdir, Some(parent), listing, visiting);
                visiting.pop();
                Some(child)
            }
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    fn record(&mut self, err: ScanError) {
        error!("{err}");
        self.errors.push(err);
    }

    fn link_siblings(&mut self, ids: &[ItemId]) {
        for (i, id) in ids.iter().enumerate() {
            let item = &mut self.items[id.0];
            item.previous = i.checked_sub(1).map(|p| ids[p]);
            item.next = ids.get(i + 1).copied();
        }
    }
}

impl GalleryTree {
    /// Scan `root` and everything below it.
    pub fn scan(root: &Path) -> Result<GalleryTree, ScanError> {
        let inspect = |source| ScanError::Inspect {
            path: root.to_path_buf(),
            source,
        };
        if media::classify(root).map_err(inspect)? != PathKind::Directory {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        let real_root = root.canonicalize().map_err(inspect)?;
        let listing = read_listing(root)?;

        let mut builder = TreeBuilder::default();
        let mut visiting = vec![real_root];
        builder.add_gallery(root.to_path_buf(), None, listing, &mut visiting);

        Ok(GalleryTree {
            galleries: builder.galleries,
            items: builder.items,
            errors: builder.errors,
        })
    }

    pub fn root(&self) -> GalleryId {
        GalleryId(0)
    }

    pub fn root_path(&self) -> &Path {
        self.gallery(self.root()).path()
    }

    /// Subtrees that could not be scanned.
    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn gallery(&self, id: GalleryId) -> &Gallery {
        &self.galleries[id.0]
    }

    pub fn item(&self, id: ItemId) -> &MediaItem {
        &self.items[id.0]
    }

    pub fn gallery_count(&self) -> usize {
        self.galleries.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn node_path(&self, node: NodeId) -> &Path {
        match node {
            NodeId::Gallery(id) => self.gallery(id).path(),
            NodeId::Item(id) => self.item(id).path(),
        }
    }

    pub fn node_title(&self, node: NodeId) -> &str {
        match node {
            NodeId::Gallery(id) => self.gallery(id).title(),
            NodeId::Item(id) => self.item(id).title(),
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Every node in pre-order: a gallery, then its child galleries'
    /// subtrees, then its images, then its movies.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.galleries.len() + self.items.len());
        self.walk_from(self.root(), &mut nodes);
        nodes
    }

    fn walk_from(&self, id: GalleryId, nodes: &mut Vec<NodeId>) {
        nodes.push(id.into());
        let gallery = self.gallery(id);
        for &child in &gallery.galleries {
            self.walk_from(child, nodes);
        }
        nodes.extend(gallery.images.iter().map(|&i| NodeId::Item(i)));
        nodes.extend(gallery.movies.iter().map(|&i| NodeId::Item(i)));
    }

    /// Galleries in walk order.
    pub fn walk_galleries(&self) -> Vec<GalleryId> {
        self.walk()
            .into_iter()
            .filter_map(|n| match n {
                NodeId::Gallery(id) => Some(id),
                NodeId::Item(_) => None,
            })
            .collect()
    }

    /// Items in walk order.
    pub fn walk_items(&self) -> Vec<ItemId> {
        self.walk()
            .into_iter()
            .filter_map(|n| match n {
                NodeId::Item(id) => Some(id),
                NodeId::Gallery(_) => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    pub fn all_galleries(&self, id: GalleryId) -> &[GalleryId] {
        let gallery = self.gallery(id);
        gallery.cache.all_galleries.get_or_init(|| {
            let mut all = gallery.galleries.clone();
            for &child in &gallery.galleries {
                all.extend_from_slice(self.all_galleries(child));
            }
            all
        })
    }

    pub fn all_images(&self, id: GalleryId) -> &[ItemId] {
        self.all_items(id, |g| &g.images, |c| &c.all_images)
    }

    pub fn all_movies(&self, id: GalleryId) -> &[ItemId] {
        self.all_items(id, |g| &g.movies, |c| &c.all_movies)
    }

    fn all_items(
        &self,
        id: GalleryId,
        direct: fn(&Gallery) -> &Vec<ItemId>,
        cache: fn(&GalleryCache) -> &OnceLock<Vec<ItemId>>,
    ) -> &[ItemId] {
        let gallery = self.gallery(id);
        cache(&gallery.cache).get_or_init(|| {
            let mut all = direct(gallery).clone();
            for &child in &gallery.galleries {
                all.extend_from_slice(self.all_items(child, direct, cache));
            }
            all
        })
    }

    pub fn sub_counts(&self, id: GalleryId) -> SubCounts {
        let gallery = self.gallery(id);
        *gallery.cache.counts.get_or_init(|| {
            let mut counts = SubCounts {
                galleries: gallery.galleries.len(),
                images: gallery.images.len(),
                movies: gallery.movies.len(),
            };
            for &child in &gallery.galleries {
                let sub = self.sub_counts(child);
                counts.galleries += sub.galleries;
                counts.images += sub.images;
                counts.movies += sub.movies;
            }
            counts
        })
    }

    pub fn sub_galleries_count(&self, id: GalleryId) -> usize {
        self.sub_counts(id).galleries
    }

    pub fn sub_images_count(&self, id: GalleryId) -> usize {
        self.sub_counts(id).images
    }

    pub fn sub_movies_count(&self, id: GalleryId) -> usize {
        self.sub_counts(id).movies
    }

    /// The image whose thumbnail represents this gallery.
    pub fn thumbnail_item(&self, id: GalleryId) -> Option<ItemId> {
        let gallery = self.gallery(id);
        *gallery.cache.thumbnail.get_or_init(|| {
            gallery.images.first().copied().or_else(|| {
                gallery
                    .galleries
                    .iter()
                    .find_map(|&child| self.thumbnail_item(child))
            })
        })
    }

    /// Propagated thumbnail: this gallery's first image, or the first one
    /// found depth first through its children in sort order.
    pub fn thumbnail(&self, id: GalleryId) -> Option<&Derivation> {
        self.thumbnail_item(id)
            .map(|item| self.item(item).derivation(DerivationKind::Thumbnail))
    }

    // ------------------------------------------------------------------
    // Ancestry
    // ------------------------------------------------------------------

    fn gallery_generations(&self, id: GalleryId) -> &[GalleryId] {
        let gallery = self.gallery(id);
        gallery.cache.generations.get_or_init(|| {
            let mut chain = match gallery.parent {
                Some(parent) => self.gallery_generations(parent).to_vec(),
                None => Vec::new(),
            };
            chain.push(id);
            chain
        })
    }

    /// Enclosing galleries, outermost first.
    pub fn ancestors(&self, node: NodeId) -> &[GalleryId] {
        match node {
            NodeId::Gallery(id) => {
                let chain = self.gallery_generations(id);
                &chain[..chain.len() - 1]
            }
            NodeId::Item(id) => self.gallery_generations(self.item(id).parent),
        }
    }

    /// Like [`ancestors`](Self::ancestors), but the chain starts at the
    /// gallery whose path is `stop`. A node at `stop` has no ancestors.
    pub fn ancestors_within(&self, node: NodeId, stop: Option<&Path>) -> &[GalleryId] {
        let all = self.ancestors(node);
        let Some(stop) = stop else {
            return all;
        };
        if self.node_path(node) == stop {
            return &[];
        }
        match all.iter().rposition(|&g| self.gallery(g).path == stop) {
            Some(start) => &all[start..],
            None => all,
        }
    }

    /// Ancestors followed by the node itself.
    pub fn generations(&self, node: NodeId) -> Vec<NodeId> {
        self.ancestors(node)
            .iter()
            .map(|&g| NodeId::Gallery(g))
            .chain(std::iter::once(node))
            .collect()
    }
}
