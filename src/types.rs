//! Node identifiers shared by the tree, the build pipeline and the renderer.
//!
//! The gallery tree is an arena: [`GalleryTree`](crate::tree::GalleryTree)
//! owns every node in two vectors and nodes refer to each other by index.
//! Parent and sibling links are plain indices, never owning edges, so there
//! is no reference cycle to break when the tree is dropped.

/// Index of a gallery (directory) node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalleryId(pub(crate) usize);

/// Index of an image or movie node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

/// Any node of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Gallery(GalleryId),
    Item(ItemId),
}

impl From<GalleryId> for NodeId {
    fn from(id: GalleryId) -> Self {
        NodeId::Gallery(id)
    }
}

impl From<ItemId> for NodeId {
    fn from(id: ItemId) -> Self {
        NodeId::Item(id)
    }
}
