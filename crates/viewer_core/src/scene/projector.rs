//! Scene graph projection
//!
//! Read-only snapshots of a live scene graph for outliners and inspectors:
//! a detached tree of plain records, the flat list of drawable nodes, and
//! lookup by identifier. Nothing here mutates or retains the source graph.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use super::node::SceneNode;

/// Detached snapshot of one scene node and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedNode {
    /// Identifier of the source node
    pub id: String,
    /// Display name, falling back to the type tag
    pub name: String,
    /// Type tag of the source node
    #[serde(rename = "type")]
    pub node_type: String,
    /// Own visibility flag of the source node
    pub visible: bool,
    /// Projected children in source order
    pub children: Vec<ProjectedNode>,
}

impl ProjectedNode {
    fn project<N: SceneNode>(node: &N) -> Self {
        Self {
            id: node.uuid().to_string(),
            name: node.display_name().to_string(),
            node_type: node.type_tag().to_string(),
            visible: node.is_visible(),
            children: node.children().map(Self::project).collect(),
        }
    }

    /// Number of nodes in this snapshot, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Snapshot the subtree under `root`
///
/// Depth first, children kept in source order. The source must be a tree.
pub fn build_tree<N: SceneNode>(root: Option<&N>) -> Option<ProjectedNode> {
    root.map(ProjectedNode::project)
}

/// Every mesh node under `root`, including `root` itself, in pre-order
pub fn collect_meshes<N: SceneNode>(root: Option<&N>) -> Vec<&N> {
    let mut meshes = Vec::new();
    if let Some(root) = root {
        root.traverse(&mut |node| {
            if node.is_mesh() {
                meshes.push(node);
            }
        });
    }
    meshes
}

/// First node in pre-order whose identifier is `uuid`
///
/// Returns `None` for an absent root or an empty `uuid`. Traversal stops at
/// the first match, so with duplicate identifiers the earliest node wins.
pub fn find_by_uuid<'a, N: SceneNode>(root: Option<&'a N>, uuid: &str) -> Option<&'a N> {
    if uuid.is_empty() {
        return None;
    }
    let found = root?.try_traverse(&mut |node| {
        if node.uuid() == uuid {
            ControlFlow::Break(node)
        } else {
            ControlFlow::Continue(())
        }
    });
    match found {
        ControlFlow::Break(node) => Some(node),
        ControlFlow::Continue(()) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::object::{ObjectKind, SceneObject};

    /// R -> [A -> [C], B]
    fn sample_tree() -> SceneObject {
        SceneObject::named(ObjectKind::Scene, "R")
            .with_child(SceneObject::named(ObjectKind::Group, "A").with_child(SceneObject::named(ObjectKind::Mesh, "C")))
            .with_child(SceneObject::named(ObjectKind::Mesh, "B"))
    }

    #[test]
    fn test_build_tree_mirrors_shape_and_order() {
        let root = sample_tree();
        let tree = build_tree(Some(&root)).unwrap();

        assert_eq!(tree.id, root.uuid);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].id, root.children[0].uuid);
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[0].children[0].id, root.children[0].children[0].uuid);
        assert!(tree.children[0].children[0].children.is_empty());
        assert_eq!(tree.children[1].id, root.children[1].uuid);
        assert!(tree.children[1].children.is_empty());
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_build_tree_copies_fields() {
        let root = SceneObject::new(ObjectKind::Group)
            .with_child(SceneObject::named(ObjectKind::Mesh, "Visor").with_visible(false));
        let tree = build_tree(Some(&root)).unwrap();

        assert_eq!(tree.name, "Group");
        assert_eq!(tree.node_type, "Group");
        assert!(tree.visible);
        assert_eq!(tree.children[0].name, "Visor");
        assert_eq!(tree.children[0].node_type, "Mesh");
        assert!(!tree.children[0].visible);
    }

    #[test]
    fn test_absent_root() {
        assert_eq!(build_tree::<SceneObject>(None), None);
        assert!(collect_meshes::<SceneObject>(None).is_empty());
        assert!(find_by_uuid::<SceneObject>(None, "anything").is_none());
    }

    #[test]
    fn test_collect_meshes_skips_structure() {
        let root = SceneObject::named(ObjectKind::Scene, "root")
            .with_child(
                SceneObject::named(ObjectKind::Group, "body")
                    .with_child(SceneObject::named(ObjectKind::Bone, "spine"))
                    .with_child(SceneObject::named(ObjectKind::SkinnedMesh, "M1")),
            )
            .with_child(SceneObject::named(ObjectKind::Light, "sun"))
            .with_child(SceneObject::named(ObjectKind::Mesh, "M2"));

        let names: Vec<_> = collect_meshes(Some(&root)).into_iter().map(|node| node.display_name()).collect();
        assert_eq!(names, ["M1", "M2"]);
    }

    #[test]
    fn test_collect_meshes_includes_mesh_root() {
        let root = SceneObject::named(ObjectKind::Mesh, "only");
        let meshes = collect_meshes(Some(&root));
        assert_eq!(meshes.len(), 1);
        assert!(std::ptr::eq(meshes[0], &root));
    }

    #[test]
    fn test_find_by_uuid() {
        let root = sample_tree();
        let a = &root.children[0];
        let c = &a.children[0];

        assert!(std::ptr::eq(find_by_uuid(Some(&root), &a.uuid).unwrap(), a));
        assert!(std::ptr::eq(find_by_uuid(Some(&root), &c.uuid).unwrap(), c));
        assert!(std::ptr::eq(find_by_uuid(Some(&root), &root.uuid).unwrap(), &root));
        assert!(find_by_uuid(Some(&root), "nonexistent").is_none());
        assert!(find_by_uuid(Some(&root), "").is_none());
    }

    #[test]
    fn test_find_by_uuid_duplicate_returns_first() {
        let mut first = SceneObject::named(ObjectKind::Mesh, "first");
        let mut second = SceneObject::named(ObjectKind::Mesh, "second");
        first.uuid = "dup".to_string();
        second.uuid = "dup".to_string();
        let root = SceneObject::new(ObjectKind::Scene).with_child(first).with_child(second);

        assert_eq!(find_by_uuid(Some(&root), "dup").unwrap().display_name(), "first");
    }

    #[test]
    fn test_serialized_field_names() {
        let root = SceneObject::named(ObjectKind::Mesh, "Helmet");
        let tree = build_tree(Some(&root)).unwrap();

        let text = toml::to_string(&tree).unwrap();
        assert!(text.contains("type = \"Mesh\""));
        assert!(text.contains("name = \"Helmet\""));
        assert!(!text.contains("node_type"));

        let parsed: ProjectedNode = toml::from_str(&text).unwrap();
        assert_eq!(parsed, tree);
    }
}
