//! # Viewer Core
//!
//! Support library for a 3D model viewer.
//!
//! ## Features
//!
//! - **Persistent Cache**: async key-value storage that survives restarts
//! - **Scene Projection**: plain snapshots of a scene graph for outliners
//! - **Configuration**: TOML and RON settings files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use viewer_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     viewer_core::foundation::logging::init();
//!
//!     let cache = PersistentCache::on_disk(CacheConfig::default());
//!     cache.set("models/helmet.glb", vec![0x67, 0x6c, 0x54, 0x46]).await?;
//!     let bytes = cache.get("models/helmet.glb").await?;
//!     assert!(bytes.is_some());
//!
//!     let scene = SceneObject::named(ObjectKind::Scene, "Helmet")
//!         .with_child(SceneObject::named(ObjectKind::Mesh, "Visor"));
//!     let outline = build_tree(Some(&scene));
//!     let meshes = collect_meshes(Some(&scene));
//!     println!("{outline:?} {}", meshes.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod cache;
pub mod config;
pub mod foundation;
pub mod scene;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        cache::{CacheConfig, PersistentCache, StorageBackend, StorageError},
        config::{Config, ConfigError},
        scene::{build_tree, collect_meshes, find_by_uuid, ObjectKind, ProjectedNode, SceneNode, SceneObject},
    };
}
