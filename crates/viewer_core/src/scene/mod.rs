//! Scene graph projection
//!
//! [`SceneNode`] is the read-only contract the projector needs from a scene
//! graph. [`SceneObject`] is the crate's own implementation of it.

mod node;
mod object;
mod projector;

pub use node::SceneNode;
pub use object::{ObjectKind, SceneObject};
pub use projector::{build_tree, collect_meshes, find_by_uuid, ProjectedNode};
