//! CPU evaluation of scene-tree distance fields
//!
//! Samples the same field the generated shader computes, statement for
//! statement: identical transform fast paths, distortion formulas, shape
//! expressions and combinators. That makes it usable both as a reference
//! for testing generated shaders and as a host-side query path (picking,
//! collision probes) that agrees with what the GPU renders.
//!
//! ```
//! use glam::Vec3;
//! use sdfgen_eval::{DistanceField, SceneSdf};
//! use sdfgen_scene::{OperationKind, SceneNode, ShapeKind};
//!
//! let scene = SceneNode::operation(OperationKind::Union)
//!     .with_child(SceneNode::shape(ShapeKind::Sphere));
//! let sdf = SceneSdf::new(&scene);
//! assert!(sdf.distance(Vec3::ZERO) < 0.0);
//! ```

use glam::{Vec2, Vec3};
use sdfgen_scene::{
    Axis, Distortion, LocalTransform, NodeKind, OperationKind, SceneNode, ShapeKind,
};

/// Signed distance field sampled on the CPU.
pub trait DistanceField {
    fn distance(&self, p: Vec3) -> f32;

    /// Surface normal by central differences over [`DistanceField::distance`].
    fn normal(&self, p: Vec3) -> Vec3 {
        const EPS: f32 = 1e-4;
        let gradient = Vec3::new(
            self.distance(p + Vec3::X * EPS) - self.distance(p - Vec3::X * EPS),
            self.distance(p + Vec3::Y * EPS) - self.distance(p - Vec3::Y * EPS),
            self.distance(p + Vec3::Z * EPS) - self.distance(p - Vec3::Z * EPS),
        );
        gradient.normalize_or_zero()
    }
}

/// A scene tree viewed as a distance field.
#[derive(Debug, Clone, Copy)]
pub struct SceneSdf<'a> {
    root: &'a SceneNode,
}

impl<'a> SceneSdf<'a> {
    pub fn new(root: &'a SceneNode) -> Self {
        Self { root }
    }
}

impl DistanceField for SceneSdf<'_> {
    fn distance(&self, p: Vec3) -> f32 {
        distance(self.root, p)
    }
}

/// Distance from `p` to the scene under `root`.
///
/// Follows the generated code's conventions exactly: scaled shapes return
/// scaled distance estimates with no metric correction, subtraction folds
/// left with the accumulator on the negated side, and nodes that cannot
/// contribute (inactive, mesh leaves) are skipped.
pub fn distance(root: &SceneNode, p: Vec3) -> f32 {
    if !root.active {
        return 0.0;
    }
    match root.kind {
        NodeKind::Operation { .. } => operation_distance(root, p),
        NodeKind::Shape { kind, bias } => shape_distance(root, kind, bias, p).unwrap_or(0.0),
    }
}

fn operation_distance(node: &SceneNode, p: Vec3) -> f32 {
    let NodeKind::Operation { kind, distortion } = node.kind else {
        return 0.0;
    };
    let local = apply_distortion(distortion, apply_inverse(&node.transform, p));
    let mut acc: Option<f32> = None;
    for child in &node.children {
        if !child.active {
            continue;
        }
        let value = match child.kind {
            NodeKind::Operation { .. } => Some(operation_distance(child, local)),
            NodeKind::Shape {
                kind: shape_kind,
                bias,
            } => shape_distance(child, shape_kind, bias, local),
        };
        let Some(value) = value else {
            continue;
        };
        acc = Some(match acc {
            None => value,
            Some(previous) => combine(kind, previous, value),
        });
    }
    acc.unwrap_or(0.0)
}

fn combine(kind: OperationKind, acc: f32, next: f32) -> f32 {
    match kind {
        OperationKind::Union => acc.min(next),
        OperationKind::Subtraction => (-acc).max(next),
        OperationKind::Intersection => acc.max(next),
    }
}

/// Map a parent-space point into the node's local space, with the same
/// case split the generated code uses: identity passes through, rotation
/// takes the full inverse matrix, anything else is componentwise.
fn apply_inverse(t: &LocalTransform, p: Vec3) -> Vec3 {
    if t.is_identity() {
        return p;
    }
    if t.has_rotation() {
        return t.inverse_matrix().transform_point3(p);
    }
    let mut local = p;
    let mut inv_scale = Vec3::ONE;
    if t.has_scale() {
        inv_scale = Vec3::ONE / t.scale;
        local *= inv_scale;
    }
    if t.has_translation() {
        local -= t.position * inv_scale;
    }
    local
}

fn apply_distortion(distortion: Distortion, p: Vec3) -> Vec3 {
    match distortion {
        Distortion::None => p,
        Distortion::Repeat { period } => Vec3::new(
            wrap(p.x, period.x),
            wrap(p.y, period.y),
            wrap(p.z, period.z),
        ),
        Distortion::RepeatAxis { axis, period } => {
            let mut out = p;
            out[axis.index()] = wrap(p[axis.index()], period);
            out
        }
        Distortion::RepeatPolar { axis, count } => polar_wrap(p, axis, count),
        Distortion::Mirror => p.abs(),
        Distortion::MirrorXz => Vec3::new(p.x.abs(), p.y, p.z.abs()),
        Distortion::MirrorAxis { axis } => {
            let mut out = p;
            out[axis.index()] = p[axis.index()].abs();
            out
        }
        Distortion::Rotate { axis, angle } => rotate_axis(p, axis, angle),
        Distortion::Flip { axis } => {
            let mut out = p;
            out[axis.index()] = -p[axis.index()];
            out
        }
    }
}

/// Centered wrap: `v - k * floor(v / k + 0.5)`. Non-positive periods leave
/// the component untouched.
fn wrap(v: f32, period: f32) -> f32 {
    if period > 0.0 {
        v - period * (v / period + 0.5).floor()
    } else {
        v
    }
}

fn polar_wrap(p: Vec3, axis: Axis, count: u32) -> Vec3 {
    if count == 0 {
        return p;
    }
    let (u, v) = match axis {
        Axis::X => (1, 2),
        Axis::Y => (0, 2),
        Axis::Z => (0, 1),
    };
    let sector = std::f32::consts::TAU / count as f32;
    let radius = Vec2::new(p[u], p[v]).length();
    let angle = p[v].atan2(p[u]);
    let wrapped = angle - sector * (angle / sector + 0.5).floor();
    let mut out = p;
    out[u] = radius * wrapped.cos();
    out[v] = radius * wrapped.sin();
    out
}

fn rotate_axis(p: Vec3, axis: Axis, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    match axis {
        Axis::X => Vec3::new(p.x, c * p.y + s * p.z, -s * p.y + c * p.z),
        Axis::Y => Vec3::new(c * p.x - s * p.z, p.y, s * p.x + c * p.z),
        Axis::Z => Vec3::new(c * p.x + s * p.y, -s * p.x + c * p.y, p.z),
    }
}

/// Distance of one shape leaf sampled at its parent operation's point.
/// Returns `None` for kinds with no closed form.
fn shape_distance(
    node: &SceneNode,
    kind: ShapeKind,
    bias: f32,
    parent_point: Vec3,
) -> Option<f32> {
    match kind {
        ShapeKind::Mesh => None,
        ShapeKind::Plane => Some(plane_distance(node, parent_point)),
        ShapeKind::FracturedPlane => {
            let relief = 0.25
                * ((parent_point.x - parent_point.x.floor() - 0.5).abs()
                    + (parent_point.z - parent_point.z.floor() - 0.5).abs());
            Some(plane_distance(node, parent_point) - relief)
        }
        ShapeKind::Sphere => {
            let local = apply_inverse(&node.transform, parent_point);
            Some((local.length() - 0.5) * bias)
        }
        ShapeKind::Cube => {
            let local = apply_inverse(&node.transform.without_scale(), parent_point);
            let q = local.abs() - node.shape_parameters();
            let outside = q.max(Vec3::ZERO).length();
            let inside = q.x.max(q.y.max(q.z)).min(0.0);
            Some((outside + inside) * bias)
        }
        ShapeKind::Cylinder => {
            let local = apply_inverse(&node.transform.without_scale(), parent_point);
            let params = node.shape_parameters();
            let d = Vec2::new(Vec2::new(local.x, local.z).length(), local.y).abs()
                - Vec2::new(params.x, params.y);
            let inside = d.x.max(d.y).min(0.0);
            let outside = d.max(Vec2::ZERO).length();
            Some((inside + outside) * bias)
        }
    }
}

/// Plane and fractured plane evaluate in the parent's space; the normal is
/// the node's rotated up axis and the offset its position along it.
fn plane_distance(node: &SceneNode, parent_point: Vec3) -> f32 {
    let normal = node.shape_parameters();
    parent_point.dot(normal) - node.transform.position.dot(normal)
}
