//! Viewer-side scene graph
//!
//! [`SceneObject`] is a plain owned tree mirroring the object model of the
//! loaded model: groups, meshes, lights and cameras with names, visibility and
//! ordered children. Children are owned, so the tree cannot contain cycles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::SceneNode;

/// Kind of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Scene root
    Scene,
    /// Grouping node with no content of its own
    Group,
    /// Plain transform node
    Object3D,
    /// Triangle mesh
    Mesh,
    /// Mesh deformed by a skeleton
    SkinnedMesh,
    /// Mesh drawn many times with per-instance transforms
    InstancedMesh,
    /// Skeleton joint
    Bone,
    /// Light source
    Light,
    /// Camera
    Camera,
}

impl ObjectKind {
    /// Type tag reported for the kind
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Scene => "Scene",
            Self::Group => "Group",
            Self::Object3D => "Object3D",
            Self::Mesh => "Mesh",
            Self::SkinnedMesh => "SkinnedMesh",
            Self::InstancedMesh => "InstancedMesh",
            Self::Bone => "Bone",
            Self::Light => "Light",
            Self::Camera => "Camera",
        }
    }

    /// Whether objects of this kind draw geometry
    pub const fn is_mesh(self) -> bool {
        matches!(self, Self::Mesh | Self::SkinnedMesh | Self::InstancedMesh)
    }
}

/// A node of the viewer's scene graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique identifier, generated on construction
    pub uuid: String,
    /// Display name; may be empty
    #[serde(default)]
    pub name: String,
    /// Object kind
    pub kind: ObjectKind,
    /// Own visibility flag
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Child objects in draw order
    #[serde(default)]
    pub children: Vec<SceneObject>,
}

const fn default_visible() -> bool {
    true
}

impl SceneObject {
    /// Create a visible, unnamed object with a fresh identifier
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: String::new(),
            kind,
            visible: true,
            children: Vec::new(),
        }
    }

    /// Create a named object
    pub fn named(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(kind)
        }
    }

    /// Builder: append a child
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set visibility
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Number of objects in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |_| count += 1);
        count
    }
}

impl SceneNode for SceneObject {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn name(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|name| !name.is_empty())
    }

    fn type_tag(&self) -> &str {
        self.kind.type_tag()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_mesh(&self) -> bool {
        self.kind.is_mesh()
    }

    fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter()
    }
}
