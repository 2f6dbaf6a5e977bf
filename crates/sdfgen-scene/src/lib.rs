//! Scene tree model for SDF authoring
//!
//! A scene is a tree of [`SceneNode`]s: interior operation nodes fold their
//! children with CSG combinators and may distort the sampling domain first,
//! leaf shape nodes evaluate primitives. The `sdfgen-shader` crate lowers a
//! tree into a flat GPU node buffer or generated shader source, and
//! `sdfgen-eval` walks the same tree on the CPU.
//!
//! ## Example
//!
//! ```rust
//! use glam::Vec3;
//! use sdfgen_scene::{OperationKind, SceneNode, ShapeKind, collect_operations};
//!
//! let scene = SceneNode::operation(OperationKind::Union)
//!     .with_child(SceneNode::shape(ShapeKind::Sphere))
//!     .with_child(
//!         SceneNode::shape(ShapeKind::Cube)
//!             .with_position(Vec3::new(2.0, 0.0, 0.0))
//!             .with_scale(Vec3::splat(2.0)),
//!     );
//!
//! let slots = collect_operations(&scene);
//! assert_eq!(slots.len(), 1);
//! ```

mod node;
mod transform;

pub use node::{
    Axis, DEFAULT_BIAS, Distortion, NodeKind, OperationKind, SceneNode, ShapeKind,
    collect_operations,
};
pub use transform::LocalTransform;
