//! Flat GPU node buffer
//!
//! The runtime path uploads the whole scene as an array of fixed-size
//! records and lets a shader walk the tree per sample. Records carry the
//! inverse local transform plus the integer and vector fields the walker
//! needs; shape records reuse the distortion parameter slot for their own
//! parameter vector.

use bytemuck::{Pod, Zeroable};
use sdfgen_scene::{DEFAULT_BIAS, NodeKind, SceneNode};

/// Upper bound on records the GPU path will bind.
pub const MAX_FLAT_NODES: usize = 128;

/// `node_type` value for operation records.
pub const NODE_TYPE_OPERATION: i32 = 0;
/// `node_type` value for shape records.
pub const NODE_TYPE_SHAPE: i32 = 1;

/// One scene node as the GPU buffer carries it.
///
/// `#[repr(C)]`, 96 bytes with no implicit padding; the field order packs
/// into the 16-byte rows the shader side declares.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatNodeRecord {
    /// Inverse of the node's local TRS matrix, column-major.
    pub inverse_transform: [[f32; 4]; 4],
    /// [`NODE_TYPE_OPERATION`] or [`NODE_TYPE_SHAPE`].
    pub node_type: i32,
    /// Operation code for operations, shape code for shapes.
    pub type_parameter: i32,
    /// Tree depth, root = 0.
    pub depth: i32,
    pub distortion_type: i32,
    /// Distortion parameter for operations, shape parameters for shapes.
    pub distortion_param: [f32; 3],
    pub bias: f32,
}

impl FlatNodeRecord {
    /// Record for one node at the given depth.
    pub fn from_node(node: &SceneNode, depth: i32) -> Self {
        let inverse_transform = node.transform.inverse_matrix().to_cols_array_2d();
        match node.kind {
            NodeKind::Operation { kind, distortion } => Self {
                inverse_transform,
                node_type: NODE_TYPE_OPERATION,
                type_parameter: kind.gpu_code(),
                depth,
                distortion_type: distortion.gpu_code(),
                distortion_param: distortion.param().to_array(),
                bias: DEFAULT_BIAS,
            },
            NodeKind::Shape { kind, bias } => Self {
                inverse_transform,
                node_type: NODE_TYPE_SHAPE,
                type_parameter: kind.gpu_code(),
                depth,
                distortion_type: 0,
                distortion_param: node.shape_parameters().to_array(),
                bias,
            },
        }
    }
}

/// Every active node as flat records, pre-order, root at depth 0.
///
/// The walk itself is total; [`flatten_tree_bounded`] is the GPU-facing
/// variant that enforces [`MAX_FLAT_NODES`].
pub fn flatten_tree(root: &SceneNode) -> Vec<FlatNodeRecord> {
    let mut records = Vec::new();
    flatten_into(root, 0, &mut records);
    records
}

/// [`flatten_tree`] clamped to [`MAX_FLAT_NODES`] records.
///
/// Truncation is silent by contract; a debug event notes the dropped count.
pub fn flatten_tree_bounded(root: &SceneNode) -> Vec<FlatNodeRecord> {
    let mut records = flatten_tree(root);
    if records.len() > MAX_FLAT_NODES {
        tracing::debug!(
            dropped = records.len() - MAX_FLAT_NODES,
            "node buffer exceeds capacity, truncating"
        );
        records.truncate(MAX_FLAT_NODES);
    }
    records
}

/// Raw bytes of a record slice, ready for a buffer upload.
pub fn records_as_bytes(records: &[FlatNodeRecord]) -> &[u8] {
    bytemuck::cast_slice(records)
}

fn flatten_into(node: &SceneNode, depth: i32, records: &mut Vec<FlatNodeRecord>) {
    if !node.active {
        return;
    }
    records.push(FlatNodeRecord::from_node(node, depth));
    for child in &node.children {
        flatten_into(child, depth + 1, records);
    }
}
