//! Shader generation for scene-tree distance fields
//!
//! Turns a [`sdfgen_scene::SceneNode`] tree into a single distance function
//! in WGSL or HLSL, and into a flat node buffer for shaders that walk the
//! scene on the GPU instead.
//!
//! The generated function is specialized to the scene: transforms fold into
//! componentwise inverses or constant matrices, distortion parameters and
//! shape dimensions become literals, and set operations flatten into a
//! `min`/`max` chain over per-operation registers. Recompile after any
//! structural edit; the output has no runtime inputs besides the query
//! point.
//!
//! ```
//! use sdfgen_scene::{OperationKind, SceneNode, ShapeKind, collect_operations};
//! use sdfgen_shader::{CompileOptions, ShaderCompiler};
//!
//! let scene = SceneNode::operation(OperationKind::Union)
//!     .with_child(SceneNode::shape(ShapeKind::Sphere));
//! let ops = collect_operations(&scene);
//! let shader = ShaderCompiler::new(CompileOptions::default()).compile(&scene, &ops);
//! assert!(shader.is_clean());
//! assert!(shader.code.contains("fn sdf_generated"));
//! ```

mod buffer;
mod codegen;
mod dialect;
mod error;
mod shapes;

pub use buffer::{
    FlatNodeRecord, MAX_FLAT_NODES, NODE_TYPE_OPERATION, NODE_TYPE_SHAPE, flatten_tree,
    flatten_tree_bounded, records_as_bytes,
};
pub use codegen::{
    CompileOptions, CompiledShader, MATRIX_TABLE, SHADER_FN, ShaderCompiler, SlotStorage,
};
pub use dialect::ShaderDialect;
pub use error::CompileIssue;
