//! Scene tree nodes
//!
//! A scene is a tree of [`SceneNode`]s. Interior nodes are CSG operations
//! that fold their children with a combinator and may distort the sampling
//! domain first; leaves are shape primitives. Every node has a local
//! transform, an `active` flag and a list of children. Inactive nodes are
//! invisible to every traversal, subtree included.

use glam::{Quat, Vec3};

use crate::LocalTransform;

/// Bias shapes carry by default; bias only changes output when it moves off 1.
pub const DEFAULT_BIAS: f32 = 1.0;

/// Coordinate axis selector for the axis-parameterized distortions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Unit vector along the axis.
    pub fn basis(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// Component index (x = 0, y = 1, z = 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// CSG combinator an operation node folds its children with.
///
/// Subtraction is a left fold with the accumulator on the negated side:
/// `max(-acc, child)`. Child order matters and is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Union,
    Subtraction,
    Intersection,
}

impl OperationKind {
    /// Stable integer written into the flat GPU records.
    pub fn gpu_code(self) -> i32 {
        match self {
            OperationKind::Union => 0,
            OperationKind::Subtraction => 1,
            OperationKind::Intersection => 2,
        }
    }
}

/// Shape primitive evaluated at a leaf.
///
/// `Mesh` exists only as buffer data for hosts that resolve it themselves;
/// it has no closed-form distance and the shader compiler skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Plane,
    Sphere,
    Cube,
    Cylinder,
    Mesh,
    FracturedPlane,
}

impl ShapeKind {
    /// Stable integer written into the flat GPU records. Code 0 is reserved.
    pub fn gpu_code(self) -> i32 {
        match self {
            ShapeKind::Plane => 1,
            ShapeKind::Sphere => 2,
            ShapeKind::Cube => 3,
            ShapeKind::Cylinder => 4,
            ShapeKind::Mesh => 5,
            ShapeKind::FracturedPlane => 6,
        }
    }
}

/// Domain distortion an operation node applies to its own position value,
/// after its transform and before any child is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distortion {
    None,
    /// Centered periodic wrap on every axis with a positive period component.
    Repeat { period: Vec3 },
    /// Centered periodic wrap along a single axis.
    RepeatAxis { axis: Axis, period: f32 },
    /// `count` angular copies around the axis.
    RepeatPolar { axis: Axis, count: u32 },
    /// Fold all three axes into the positive octant.
    Mirror,
    /// Fold x and z, leaving y untouched.
    MirrorXz,
    /// Fold a single axis.
    MirrorAxis { axis: Axis },
    /// Fixed rotation around the axis, folded to constants at generation time.
    Rotate { axis: Axis, angle: f32 },
    /// Negate a single axis.
    Flip { axis: Axis },
}

impl Distortion {
    pub fn is_none(&self) -> bool {
        matches!(self, Distortion::None)
    }

    /// Stable integer written into the flat GPU records.
    pub fn gpu_code(&self) -> i32 {
        match self {
            Distortion::None => 0,
            Distortion::Repeat { .. } => 1,
            Distortion::RepeatAxis { axis, .. } => 2 + axis.index() as i32,
            Distortion::RepeatPolar { axis, .. } => 5 + axis.index() as i32,
            Distortion::Mirror => 8,
            Distortion::MirrorXz => 9,
            Distortion::MirrorAxis { axis } => 10 + axis.index() as i32,
            Distortion::Rotate { axis, .. } => 13 + axis.index() as i32,
            Distortion::Flip { axis } => 16 + axis.index() as i32,
        }
    }

    /// Parameter vector as the flat GPU records carry it.
    ///
    /// Axis-parameterized variants pack their scalar into the axis component.
    pub fn param(&self) -> Vec3 {
        match self {
            Distortion::Repeat { period } => *period,
            Distortion::RepeatAxis { axis, period } => axis.basis() * *period,
            Distortion::RepeatPolar { axis, count } => axis.basis() * *count as f32,
            Distortion::Rotate { axis, angle } => axis.basis() * *angle,
            Distortion::None
            | Distortion::Mirror
            | Distortion::MirrorXz
            | Distortion::MirrorAxis { .. }
            | Distortion::Flip { .. } => Vec3::ZERO,
        }
    }
}

/// What a node contributes to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Operation {
        kind: OperationKind,
        distortion: Distortion,
    },
    Shape {
        kind: ShapeKind,
        bias: f32,
    },
}

/// One node of the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub transform: LocalTransform,
    pub active: bool,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Operation node with identity transform, no distortion, no children.
    pub fn operation(kind: OperationKind) -> Self {
        Self {
            transform: LocalTransform::IDENTITY,
            active: true,
            kind: NodeKind::Operation {
                kind,
                distortion: Distortion::None,
            },
            children: Vec::new(),
        }
    }

    /// Shape leaf with identity transform and default bias.
    pub fn shape(kind: ShapeKind) -> Self {
        Self {
            transform: LocalTransform::IDENTITY,
            active: true,
            kind: NodeKind::Shape {
                kind,
                bias: DEFAULT_BIAS,
            },
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: LocalTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SceneNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Set the distortion. No effect on shape leaves.
    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        if let NodeKind::Operation { distortion: d, .. } = &mut self.kind {
            *d = distortion;
        }
        self
    }

    /// Set the bias. No effect on operation nodes.
    pub fn with_bias(mut self, bias: f32) -> Self {
        if let NodeKind::Shape { bias: b, .. } = &mut self.kind {
            *b = bias;
        }
        self
    }

    pub fn is_operation(&self) -> bool {
        matches!(self.kind, NodeKind::Operation { .. })
    }

    pub fn is_shape(&self) -> bool {
        matches!(self.kind, NodeKind::Shape { .. })
    }

    /// Shape parameter vector, derived from the current transform on every
    /// call so transform edits are always reflected.
    ///
    /// Plane and fractured plane report their unit normal (local rotation
    /// applied to +Y). Cube reports half extents, cylinder radius and half
    /// height. Sphere geometry ignores its parameters entirely; the slot
    /// carries the shape code as filler, matching the GPU buffer contract.
    pub fn shape_parameters(&self) -> Vec3 {
        match self.kind {
            NodeKind::Shape { kind, .. } => match kind {
                ShapeKind::Plane | ShapeKind::FracturedPlane => self.transform.rotation * Vec3::Y,
                ShapeKind::Sphere => Vec3::splat(ShapeKind::Sphere.gpu_code() as f32),
                ShapeKind::Cube => self.transform.scale * 0.5,
                ShapeKind::Cylinder => Vec3::new(
                    self.transform.scale.x * 0.5,
                    self.transform.scale.y,
                    1.0,
                ),
                ShapeKind::Mesh => Vec3::ZERO,
            },
            NodeKind::Operation { .. } => Vec3::ZERO,
        }
    }
}

/// Flattened pre-order list of every active operation node.
///
/// This is the slot list the distance-function compiler consumes: slot `i`
/// is the i-th operation in this order. Inactive subtrees are skipped here
/// the same way both shader paths skip them.
pub fn collect_operations(root: &SceneNode) -> Vec<&SceneNode> {
    let mut ops = Vec::new();
    collect_into(root, &mut ops);
    ops
}

fn collect_into<'a>(node: &'a SceneNode, ops: &mut Vec<&'a SceneNode>) {
    if !node.active {
        return;
    }
    if node.is_operation() {
        ops.push(node);
    }
    for child in &node.children {
        collect_into(child, ops);
    }
}
