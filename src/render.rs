//! HTML rendering for gallery indexes and item pages.
//!
//! The build pipeline talks to rendering through the [`Renderer`] trait and
//! only writes what it returns. [`MaudRenderer`] is the implementation the
//! binary uses.
//!
//! ## Pages
//!
//! - **Gallery index** (`<dir>/index.html`): breadcrumb, title, a details line
//!   with recursive counts, then grids of sub-galleries (each shown by its
//!   propagated thumbnail), images (thumbnail linking to the medium page),
//!   and a list of movies.
//! - **Item page** (`<dir>/med/<stem>_med.html`): breadcrumb, previous/next
//!   links to the neighbouring items' pages, and the medium image linking to
//!   the original.
//!
//! ## Grids
//!
//! Repeated cells go through [`render_partial_collection`], which hands each
//! cell its zero-based position, the collection size and the row size, and
//! lays the cells out `row_size` to a table row.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating, so
//! every interpolated title is escaped.

use crate::media::DerivationKind;
use crate::naming::parse_dated_title;
use crate::tree::GalleryTree;
use crate::types::{GalleryId, ItemId, NodeId};
use crate::urls::UrlResolver;
use maud::{DOCTYPE, Markup, html};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{path} has no {kind} page")]
    NoPage { path: PathBuf, kind: DerivationKind },
}

/// Produces page markup for tree nodes.
///
/// Implementations must be `Sync`: the pipeline renders items in parallel.
pub trait Renderer: Sync {
    /// Markup for a gallery's index page.
    fn render_gallery(&self, tree: &GalleryTree, gallery: GalleryId) -> Result<String, RenderError>;

    /// Markup for an item's companion page of the given derivation.
    fn render_item(
        &self,
        tree: &GalleryTree,
        item: ItemId,
        kind: DerivationKind,
    ) -> Result<String, RenderError>;
}

/// Bindings handed to each cell of a repeated partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialContext {
    /// Zero-based position in the collection.
    pub counter: usize,
    pub list_size: usize,
    pub row_size: usize,
}

impl PartialContext {
    pub fn is_row_start(&self) -> bool {
        self.counter % self.row_size == 0
    }

    pub fn is_last(&self) -> bool {
        self.counter + 1 == self.list_size
    }
}

/// Render `partial` once per element, `row_size` cells to a table row.
/// An empty collection renders nothing.
pub fn render_partial_collection<T>(
    collection: &[T],
    row_size: usize,
    class: &str,
    partial: impl Fn(&T, PartialContext) -> Markup,
) -> Markup {
    let row_size = row_size.max(1);
    let list_size = collection.len();
    html! {
        @if !collection.is_empty() {
            table class=(class) {
                @for (row, cells) in collection.chunks(row_size).enumerate() {
                    tr {
                        @for (column, element) in cells.iter().enumerate() {
                            @let ctx = PartialContext {
                                counter: row * row_size + column,
                                list_size,
                                row_size,
                            };
                            td { (partial(element, ctx)) }
                        }
                    }
                }
            }
        }
    }
}

/// "2 albums, 5 images" style summary; zero counts are left out.
pub fn details_line(tree: &GalleryTree, gallery: GalleryId) -> String {
    let counts = tree.sub_counts(gallery);
    [
        (counts.galleries, "albums"),
        (counts.images, "images"),
        (counts.movies, "movies"),
    ]
    .iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{n} {label}"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// The renderer used by the binary.
#[derive(Debug, Clone)]
pub struct MaudRenderer {
    urls: UrlResolver,
    row_size: usize,
    stylesheet: String,
}

impl MaudRenderer {
    /// `stylesheet` is a path relative to the gallery root.
    pub fn new(urls: UrlResolver, row_size: usize, stylesheet: &str) -> Self {
        Self {
            urls,
            row_size,
            stylesheet: stylesheet.to_string(),
        }
    }

    fn url(&self, path: &Path) -> String {
        self.urls.url_for(path)
    }

    fn document(&self, title: &str, content: Markup) -> Markup {
        let css = self.url(&self.urls.root().join(&self.stylesheet));
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (title) }
                    link rel="stylesheet" type="text/css" href=(css);
                }
                body {
                    (content)
                }
            }
        }
    }

    /// Links to every ancestor inside the gallery root, then the node's own
    /// title, joined with " : ".
    fn breadcrumb(&self, tree: &GalleryTree, node: NodeId) -> Markup {
        let ancestors = tree.ancestors_within(node, Some(self.urls.root()));
        html! {
            div.breadcrumb {
                @for &ancestor in ancestors {
                    @let gallery = tree.gallery(ancestor);
                    a href=(self.url(&gallery.index_path())) { (gallery.title()) }
                    " : "
                }
                (tree.node_title(node))
            }
        }
    }

    /// A gallery title, split into date and name when it starts with a date.
    fn gallery_title(&self, tree: &GalleryTree, id: GalleryId) -> Markup {
        let gallery = tree.gallery(id);
        let href = self.url(&gallery.index_path());
        let dated = parse_dated_title(gallery.title());
        html! {
            @if let Some(date) = &dated.date {
                div.title.date { a href=(href) { (date) } }
            }
            div.title { a href=(href) { (dated.name) } }
        }
    }

    fn gallery_cell(&self, tree: &GalleryTree, id: GalleryId) -> Markup {
        let gallery = tree.gallery(id);
        html! {
            @if let Some(thumb) = tree.thumbnail(id) {
                a.image href=(self.url(&gallery.index_path())) {
                    img src=(self.url(thumb.path())) alt=(gallery.title());
                }
            }
            (self.gallery_title(tree, id))
            div.details { (details_line(tree, id)) }
        }
    }

    fn image_cell(&self, tree: &GalleryTree, id: ItemId) -> Markup {
        let item = tree.item(id);
        let thumb = item.derivation(DerivationKind::Thumbnail);
        let medium = item.derivation(DerivationKind::Medium);
        html! {
            a.image href=(self.url(medium.html())) {
                img src=(self.url(thumb.path())) alt=(item.title());
            }
        }
    }

    fn item_link(&self, tree: &GalleryTree, id: ItemId, label: &str, class: &str) -> Markup {
        let item = tree.item(id);
        let page = item.derivation(DerivationKind::Medium);
        html! {
            a class=(class) href=(self.url(page.html())) { (label) }
        }
    }
}

impl Renderer for MaudRenderer {
    fn render_gallery(&self, tree: &GalleryTree, id: GalleryId) -> Result<String, RenderError> {
        let gallery = tree.gallery(id);
        let content = html! {
            (self.breadcrumb(tree, id.into()))
            div.gallery-header {
                (self.gallery_title(tree, id))
                div.details { (details_line(tree, id)) }
            }
            (render_partial_collection(gallery.galleries(), self.row_size, "galleries", |&child, _| {
                self.gallery_cell(tree, child)
            }))
            (render_partial_collection(gallery.images(), self.row_size, "images", |&image, _| {
                self.image_cell(tree, image)
            }))
            @if !gallery.movies().is_empty() {
                ul.movies {
                    @for &movie in gallery.movies() {
                        @let item = tree.item(movie);
                        li { a href=(self.url(item.path())) { (item.title()) } }
                    }
                }
            }
        };
        Ok(self.document(gallery.title(), content).into_string())
    }

    fn render_item(
        &self,
        tree: &GalleryTree,
        id: ItemId,
        kind: DerivationKind,
    ) -> Result<String, RenderError> {
        let item = tree.item(id);
        let derivation = item.derivation(kind);
        if !derivation.has_html() {
            return Err(RenderError::NoPage {
                path: item.path().to_path_buf(),
                kind,
            });
        }

        let previous = item
            .previous()
            .map(|p| format!("(prev) {}", tree.item(p).title()));
        let next = item
            .next()
            .map(|n| format!("{} (next)", tree.item(n).title()));

        let content = html! {
            (self.breadcrumb(tree, id.into()))
            div.navigation {
                @if let (Some(p), Some(label)) = (item.previous(), &previous) {
                    (self.item_link(tree, p, label, "previous"))
                }
                @if let (Some(n), Some(label)) = (item.next(), &next) {
                    (self.item_link(tree, n, label, "next"))
                }
            }
            div.medium {
                a.image href=(self.url(item.path())) {
                    img src=(self.url(derivation.path())) alt=(item.title());
                }
            }
        };
        Ok(self.document(item.title(), content).into_string())
    }
}
