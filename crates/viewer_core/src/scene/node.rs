//! Scene node capability contract
//!
//! The projector works over any hierarchy implementing [`SceneNode`]: the
//! viewer's own [`SceneObject`](super::SceneObject) tree, or a wrapper around
//! a rendering engine's node type.

use std::ops::ControlFlow;

/// Read-only view of a node in a hierarchical scene graph
///
/// Implementations must form a tree: a node reachable from itself would make
/// traversal recurse without bound.
pub trait SceneNode: Sized {
    /// Stable unique identifier
    fn uuid(&self) -> &str;

    /// Display name, if the node has one
    fn name(&self) -> Option<&str>;

    /// Type tag, such as `"Mesh"` or `"Group"`
    fn type_tag(&self) -> &str;

    /// Whether the node itself is marked visible
    fn is_visible(&self) -> bool;

    /// Whether the node is drawable geometry rather than structure
    fn is_mesh(&self) -> bool;

    /// Direct children in their stored order
    fn children(&self) -> impl Iterator<Item = &Self>;

    /// Name shown in outlines: the name, or the type tag when the name is missing or empty
    fn display_name(&self) -> &str {
        match self.name() {
            Some(name) if !name.is_empty() => name,
            _ => self.type_tag(),
        }
    }

    /// Visit this node and its descendants in pre-order, stopping at the first `Break`
    fn try_traverse<'a, B>(&'a self, visit: &mut impl FnMut(&'a Self) -> ControlFlow<B>) -> ControlFlow<B> {
        if let ControlFlow::Break(value) = visit(self) {
            return ControlFlow::Break(value);
        }
        for child in self.children() {
            if let ControlFlow::Break(value) = child.try_traverse(visit) {
                return ControlFlow::Break(value);
            }
        }
        ControlFlow::Continue(())
    }

    /// Visit this node and every descendant in pre-order
    fn traverse<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        let _ = self.try_traverse(&mut |node| {
            visit(node);
            ControlFlow::<()>::Continue(())
        });
    }
}
