//! Scene tree to shader source
//!
//! Walks an authored scene tree and emits one distance function over an
//! externally supplied operation list. Slot indices come from pointer
//! identity against that list, so a host can re-collect once and keep
//! editing node fields in place between compiles.
//!
//! Positions thread through the walk as references. A node whose local
//! transform is identity emits nothing and samples its parent's register
//! directly; the root samples the query point `p`.

// String formatting into an owned buffer cannot fail, so write! results
// are unwrapped throughout.
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::fmt::Write as _;

use glam::{Mat4, Vec3, Vec4};
use sdfgen_scene::{
    Axis, Distortion, LocalTransform, NodeKind, OperationKind, SceneNode, ShapeKind,
};

use crate::dialect::{ShaderDialect, fmt_f32};
use crate::error::CompileIssue;
use crate::shapes::{ShapeExpr, shape_expression};

/// Entry point name in both dialects.
pub const SHADER_FN: &str = "sdf_generated";

/// Name of the hoisted matrix constant table.
pub const MATRIX_TABLE: &str = "sdf_mats";

/// How per-operation registers are spelled in the generated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotStorage {
    /// One `sPos`/`dist` array indexed by slot.
    #[default]
    ArrayBacked,
    /// A standalone variable per slot, for targets that reject local arrays.
    FlatBindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub dialect: ShaderDialect,
    pub storage: SlotStorage,
    /// Indent the body by tree depth and annotate every node with its path.
    pub verbose: bool,
    /// Hoist full inverse matrices into a module-scope constant table
    /// instead of spelling them inline.
    pub matrix_table: bool,
}

/// Generated source plus everything that went wrong while producing it.
///
/// Compilation never aborts: nodes that cannot be lowered are skipped and
/// reported here, and the remaining scene still renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledShader {
    pub code: String,
    pub issues: Vec<CompileIssue>,
}

impl CompiledShader {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Where a node reads its position from.
#[derive(Debug, Clone, Copy)]
enum PosRef {
    /// The raw query point `p`.
    Query,
    /// The position register of the operation in this slot.
    Slot(usize),
}

/// Running state of an operation's left fold over its children.
enum Accum {
    /// First child was an operation; its register stands in for ours until
    /// a second child forces the store.
    Carried(String),
    Stored,
}

#[derive(Debug)]
pub struct ShaderCompiler {
    options: CompileOptions,
    body: String,
    var_counter: usize,
    matrices: Vec<Mat4>,
    issues: Vec<CompileIssue>,
    spos_slots: Vec<usize>,
    wspos_used: bool,
}

impl ShaderCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            body: String::new(),
            var_counter: 0,
            matrices: Vec::new(),
            issues: Vec::new(),
            spos_slots: Vec::new(),
            wspos_used: false,
        }
    }

    /// Compile `root` against the slot assignment in `ops`.
    ///
    /// `ops` is the operation list the shader's bindings are built around,
    /// normally the result of [`sdfgen_scene::collect_operations`]. Each
    /// operation's registers are named after its index in that list.
    pub fn compile(&mut self, root: &SceneNode, ops: &[&SceneNode]) -> CompiledShader {
        self.reset();
        let result = self.emit_root(root, ops);
        let dialect = self.options.dialect;

        let mut code = String::new();
        if self.options.matrix_table && !self.matrices.is_empty() {
            writeln!(code, "{}", dialect.matrix_table_decl(MATRIX_TABLE, &self.matrices)).unwrap();
        }
        writeln!(code, "{}", dialect.fn_header(SHADER_FN)).unwrap();
        let pad = self.indent(0);
        match self.options.storage {
            SlotStorage::ArrayBacked => {
                if !self.spos_slots.is_empty() {
                    writeln!(code, "{}{}", pad, dialect.decl_vec4_array("sPos", ops.len()))
                        .unwrap();
                }
                if !ops.is_empty() {
                    writeln!(code, "{}{}", pad, dialect.decl_scalar_array("dist", ops.len()))
                        .unwrap();
                }
            }
            SlotStorage::FlatBindings => {
                for slot in &self.spos_slots {
                    writeln!(code, "{}{}", pad, dialect.decl_vec4(&format!("sPos{}", slot)))
                        .unwrap();
                }
                for slot in 0..ops.len() {
                    writeln!(code, "{}{}", pad, dialect.decl_scalar(&format!("dist{}", slot)))
                        .unwrap();
                }
            }
        }
        if self.wspos_used {
            writeln!(code, "{}{}", pad, dialect.decl_vec4("wsPos")).unwrap();
        }
        code.push_str(&self.body);
        writeln!(code, "{}return {};", pad, result).unwrap();
        writeln!(code, "}}").unwrap();

        tracing::debug!(
            operations = ops.len(),
            issues = self.issues.len(),
            "compiled scene distance function"
        );

        CompiledShader {
            code,
            issues: std::mem::take(&mut self.issues),
        }
    }

    fn reset(&mut self) {
        self.body.clear();
        self.var_counter = 0;
        self.matrices.clear();
        self.issues.clear();
        self.spos_slots.clear();
        self.wspos_used = false;
    }

    /// Emit the root node and return the expression the function returns.
    fn emit_root(&mut self, root: &SceneNode, ops: &[&SceneNode]) -> String {
        if !root.active {
            return "0.0".to_string();
        }
        match root.kind {
            NodeKind::Operation { .. } => match slot_of(ops, root) {
                Some(slot) => {
                    self.emit_operation(root, slot, ops, PosRef::Query, "root", 0);
                    self.dist_ref(slot)
                }
                None => {
                    if !ops.is_empty() {
                        self.issues.push(CompileIssue::MissingSlot {
                            path: "root".to_string(),
                        });
                    }
                    "0.0".to_string()
                }
            },
            // A bare shape root still renders; it samples the query point
            // through its own transform.
            NodeKind::Shape { kind, bias } => self
                .shape_contribution(root, kind, bias, PosRef::Query, "root", 0)
                .unwrap_or_else(|| "0.0".to_string()),
        }
    }

    fn emit_operation(
        &mut self,
        node: &SceneNode,
        slot: usize,
        ops: &[&SceneNode],
        parent: PosRef,
        path: &str,
        depth: usize,
    ) {
        let NodeKind::Operation { kind, distortion } = node.kind else {
            return;
        };
        if self.options.verbose {
            let line = format!("// {}: {:?}", path, kind);
            self.push_line(depth, &line);
        }
        let pos = self.emit_position(node, slot, distortion, parent, depth);

        let mut acc: Option<Accum> = None;
        for (index, child) in node.children.iter().enumerate() {
            if !child.active {
                continue;
            }
            let child_path = format!("{}/{}", path, index);
            let contribution = match child.kind {
                NodeKind::Operation { .. } => match slot_of(ops, child) {
                    Some(child_slot) => {
                        self.emit_operation(child, child_slot, ops, pos, &child_path, depth + 1);
                        Some(self.dist_ref(child_slot))
                    }
                    None => {
                        self.issues.push(CompileIssue::MissingSlot { path: child_path });
                        None
                    }
                },
                NodeKind::Shape {
                    kind: shape_kind,
                    bias,
                } => self.shape_contribution(child, shape_kind, bias, pos, &child_path, depth + 1),
            };
            let Some(value) = contribution else {
                continue;
            };
            acc = Some(match acc {
                None if child.is_operation() => Accum::Carried(value),
                None => {
                    let line = format!("{} = {};", self.dist_ref(slot), value);
                    self.push_line(depth, &line);
                    Accum::Stored
                }
                Some(prev) => {
                    let lhs = match prev {
                        Accum::Carried(carried) => carried,
                        Accum::Stored => self.dist_ref(slot),
                    };
                    let line =
                        format!("{} = {};", self.dist_ref(slot), combine(kind, &lhs, &value));
                    self.push_line(depth, &line);
                    Accum::Stored
                }
            });
        }
        match acc {
            // Locals are not zero-initialized in either dialect, so an
            // operation that contributed nothing still writes its slot.
            None => {
                let line = format!("{} = 0.0;", self.dist_ref(slot));
                self.push_line(depth, &line);
            }
            Some(Accum::Carried(carried)) => {
                let line = format!("{} = {};", self.dist_ref(slot), carried);
                self.push_line(depth, &line);
            }
            Some(Accum::Stored) => {}
        }
    }

    /// Establish the position register for an operation node.
    ///
    /// Identity transforms without a distortion alias the parent reference
    /// and emit nothing. Distortions mutate the register in place, so an
    /// identity transform under one still lands a copy.
    fn emit_position(
        &mut self,
        node: &SceneNode,
        slot: usize,
        distortion: Distortion,
        parent: PosRef,
        depth: usize,
    ) -> PosRef {
        if node.transform.is_identity() && distortion.is_none() {
            return parent;
        }
        let target = self.spos_name(slot);
        self.spos_slots.push(slot);
        let src = self.pos_vec4(parent);
        self.emit_transform_assign(&target, &src, &node.transform, depth);
        self.emit_distortion(&target, distortion, depth);
        PosRef::Slot(slot)
    }

    /// Assign `src` transformed into `t`'s local space to `target`.
    ///
    /// Without rotation the inverse is componentwise: a scale factor on the
    /// source and a pre-scaled translation, each omitted when trivial. Any
    /// rotation falls back to the full inverse matrix.
    fn emit_transform_assign(&mut self, target: &str, src: &str, t: &LocalTransform, depth: usize) {
        if t.has_rotation() {
            let inverse = t.inverse_matrix();
            let mat = if self.options.matrix_table {
                let index = self.matrices.len();
                self.matrices.push(inverse);
                format!("{}[{}]", MATRIX_TABLE, index)
            } else {
                self.options.dialect.mat_literal(&inverse)
            };
            let line = format!("{} = {};", target, self.options.dialect.mul(&mat, src));
            self.push_line(depth, &line);
            return;
        }
        let mut rhs = src.to_string();
        let mut inv_scale = Vec3::ONE;
        if t.has_scale() {
            inv_scale = Vec3::ONE / t.scale;
            rhs = format!("{} * {}", rhs, self.vec4_ctor(inv_scale.extend(1.0)));
        }
        if t.has_translation() {
            rhs = format!("{} - {}", rhs, self.vec4_ctor((t.position * inv_scale).extend(0.0)));
        }
        let line = format!("{} = {};", target, rhs);
        self.push_line(depth, &line);
    }

    fn emit_distortion(&mut self, target: &str, distortion: Distortion, depth: usize) {
        match distortion {
            Distortion::None => {}
            Distortion::Repeat { period } => {
                for (component, k) in [("x", period.x), ("y", period.y), ("z", period.z)] {
                    if k > 0.0 {
                        self.emit_wrap(target, component, k, depth);
                    }
                }
            }
            Distortion::RepeatAxis { axis, period } => {
                if period > 0.0 {
                    self.emit_wrap(target, component_name(axis), period, depth);
                }
            }
            Distortion::RepeatPolar { axis, count } => {
                if count > 0 {
                    self.emit_polar(target, axis, count, depth);
                }
            }
            Distortion::Mirror => {
                let line = format!(
                    "{t} = {v4}(abs({t}.x), abs({t}.y), abs({t}.z), 1.0);",
                    t = target,
                    v4 = self.options.dialect.vec4()
                );
                self.push_line(depth, &line);
            }
            Distortion::MirrorXz => {
                self.emit_abs(target, "x", depth);
                self.emit_abs(target, "z", depth);
            }
            Distortion::MirrorAxis { axis } => {
                self.emit_abs(target, component_name(axis), depth);
            }
            Distortion::Rotate { axis, angle } => {
                self.emit_rotate(target, axis, angle, depth);
            }
            Distortion::Flip { axis } => {
                let c = component_name(axis);
                let line = format!("{t}.{c} = -{t}.{c};", t = target, c = c);
                self.push_line(depth, &line);
            }
        }
    }

    /// Centered wrap of one component: `c - k * floor(c / k + 0.5)`.
    fn emit_wrap(&mut self, target: &str, component: &str, period: f32, depth: usize) {
        let line = format!(
            "{t}.{c} = {t}.{c} - {k} * floor({t}.{c} / {k} + 0.5);",
            t = target,
            c = component,
            k = fmt_f32(period)
        );
        self.push_line(depth, &line);
    }

    fn emit_abs(&mut self, target: &str, component: &str, depth: usize) {
        let line = format!("{t}.{c} = abs({t}.{c});", t = target, c = component);
        self.push_line(depth, &line);
    }

    /// Wrap the angle around `axis` into one sector of `count` copies.
    fn emit_polar(&mut self, target: &str, axis: Axis, count: u32, depth: usize) {
        let dialect = self.options.dialect;
        let (u, v) = match axis {
            Axis::X => ("y", "z"),
            Axis::Y => ("x", "z"),
            Axis::Z => ("x", "y"),
        };
        let radius = format!("pr{}", self.var_counter);
        let angle = format!("pa{}", self.var_counter);
        self.var_counter += 1;
        let sector = fmt_f32(std::f32::consts::TAU / count as f32);

        let line = dialect.let_scalar(
            &radius,
            &format!("length({t}.{u}{v})", t = target, u = u, v = v),
        );
        self.push_line(depth, &line);
        let line = dialect.var_scalar(
            &angle,
            &format!("atan2({t}.{v}, {t}.{u})", t = target, u = u, v = v),
        );
        self.push_line(depth, &line);
        let line = format!(
            "{a} = {a} - {k} * floor({a} / {k} + 0.5);",
            a = angle,
            k = sector
        );
        self.push_line(depth, &line);
        let line = format!("{t}.{u} = {r} * cos({a});", t = target, u = u, r = radius, a = angle);
        self.push_line(depth, &line);
        let line = format!("{t}.{v} = {r} * sin({a});", t = target, v = v, r = radius, a = angle);
        self.push_line(depth, &line);
    }

    /// Fixed rotation with sin/cos folded to literals. The register is
    /// rebuilt in one statement so both source components read pre-store
    /// values; coefficient signs fold into the literals.
    fn emit_rotate(&mut self, target: &str, axis: Axis, angle: f32, depth: usize) {
        let (s, c) = angle.sin_cos();
        let (cf, sf, nf) = (fmt_f32(c), fmt_f32(s), fmt_f32(-s));
        let t = target;
        let (x, y, z) = match axis {
            Axis::X => (
                format!("{t}.x"),
                format!("{cf} * {t}.y + {sf} * {t}.z"),
                format!("{nf} * {t}.y + {cf} * {t}.z"),
            ),
            Axis::Y => (
                format!("{cf} * {t}.x + {nf} * {t}.z"),
                format!("{t}.y"),
                format!("{sf} * {t}.x + {cf} * {t}.z"),
            ),
            Axis::Z => (
                format!("{cf} * {t}.x + {sf} * {t}.y"),
                format!("{nf} * {t}.x + {cf} * {t}.y"),
                format!("{t}.z"),
            ),
        };
        let line = format!(
            "{} = {}({}, {}, {}, 1.0);",
            target,
            self.options.dialect.vec4(),
            x,
            y,
            z
        );
        self.push_line(depth, &line);
    }

    /// Emit a shape child's scratch statements and return its distance
    /// expression, or report why it has none.
    fn shape_contribution(
        &mut self,
        node: &SceneNode,
        kind: ShapeKind,
        bias: f32,
        parent: PosRef,
        path: &str,
        depth: usize,
    ) -> Option<String> {
        if self.options.verbose {
            let line = format!("// {}: {:?}", path, kind);
            self.push_line(depth, &line);
        }
        let base = match kind {
            // The plane family folds its transform into constants and reads
            // the parent register as-is.
            ShapeKind::Plane | ShapeKind::FracturedPlane | ShapeKind::Mesh => self.pos_base(parent),
            ShapeKind::Sphere | ShapeKind::Cube | ShapeKind::Cylinder => {
                // Cube and cylinder fold scale into their parameters, so
                // only the unscaled part of the transform moves the sample.
                let effective = if matches!(kind, ShapeKind::Cube | ShapeKind::Cylinder) {
                    node.transform.without_scale()
                } else {
                    node.transform
                };
                if effective.is_identity() {
                    self.pos_base(parent)
                } else {
                    self.wspos_used = true;
                    let src = self.pos_vec4(parent);
                    self.emit_transform_assign("wsPos", &src, &effective, depth);
                    "wsPos".to_string()
                }
            }
        };
        let lowered =
            shape_expression(node, kind, bias, &base, self.options.dialect, &mut self.var_counter);
        let Some(ShapeExpr { setup, expr }) = lowered else {
            self.issues.push(CompileIssue::UnsupportedShape {
                path: path.to_string(),
                kind,
            });
            return None;
        };
        if let Some(setup) = setup {
            self.push_line(depth, &setup);
        }
        Some(expr)
    }

    fn push_line(&mut self, depth: usize, line: &str) {
        let pad = self.indent(depth);
        self.body.push_str(&pad);
        self.body.push_str(line);
        self.body.push('\n');
    }

    fn indent(&self, depth: usize) -> String {
        if self.options.verbose {
            " ".repeat(4 * (depth + 1))
        } else {
            String::new()
        }
    }

    fn spos_name(&self, slot: usize) -> String {
        match self.options.storage {
            SlotStorage::ArrayBacked => format!("sPos[{}]", slot),
            SlotStorage::FlatBindings => format!("sPos{}", slot),
        }
    }

    fn dist_ref(&self, slot: usize) -> String {
        match self.options.storage {
            SlotStorage::ArrayBacked => format!("dist[{}]", slot),
            SlotStorage::FlatBindings => format!("dist{}", slot),
        }
    }

    fn pos_base(&self, pos: PosRef) -> String {
        match pos {
            PosRef::Query => "p".to_string(),
            PosRef::Slot(slot) => self.spos_name(slot),
        }
    }

    /// The position as a vec4 expression, lifting the query point to w = 1.
    fn pos_vec4(&self, pos: PosRef) -> String {
        match pos {
            PosRef::Query => format!("{}(p, 1.0)", self.options.dialect.vec4()),
            PosRef::Slot(slot) => self.spos_name(slot),
        }
    }

    fn vec4_ctor(&self, v: Vec4) -> String {
        format!(
            "{}({}, {}, {}, {})",
            self.options.dialect.vec4(),
            fmt_f32(v.x),
            fmt_f32(v.y),
            fmt_f32(v.z),
            fmt_f32(v.w)
        )
    }
}

/// Slot index of `node` in the operation list, by reference identity.
///
/// A linear scan keeps slots stable while a host edits node fields in
/// place; operation lists are small enough that hashing would not pay for
/// itself.
fn slot_of(ops: &[&SceneNode], node: &SceneNode) -> Option<usize> {
    ops.iter().position(|op| std::ptr::eq(*op, node))
}

/// Fold one more child into the accumulated distance.
///
/// Subtraction always negates the accumulated side, so child order decides
/// what carves what.
fn combine(kind: OperationKind, acc: &str, next: &str) -> String {
    match kind {
        OperationKind::Union => format!("min({}, {})", acc, next),
        OperationKind::Subtraction => format!("max(-{}, {})", acc, next),
        OperationKind::Intersection => format!("max({}, {})", acc, next),
    }
}

fn component_name(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "x",
        Axis::Y => "y",
        Axis::Z => "z",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use sdfgen_scene::collect_operations;
    use std::f32::consts::FRAC_PI_2;

    fn compile(root: &SceneNode, options: CompileOptions) -> CompiledShader {
        let ops = collect_operations(root);
        ShaderCompiler::new(options).compile(root, &ops)
    }

    fn sphere_cube_union() -> SceneNode {
        SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere))
            .with_child(
                SceneNode::shape(ShapeKind::Cube)
                    .with_position(Vec3::new(2.0, 0.0, 0.0))
                    .with_scale(Vec3::splat(2.0)),
            )
    }

    #[test]
    fn union_of_sphere_and_cube_in_wgsl() {
        let root = sphere_cube_union();
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.is_clean());
        let expected = "\
fn sdf_generated(p: vec3<f32>) -> f32 {
var dist: array<f32, 1>;
var wsPos: vec4<f32>;
dist[0] = (length(p.xyz) - 0.5);
wsPos = vec4<f32>(p, 1.0) - vec4<f32>(2.0, 0.0, 0.0, 0.0);
let q0 = abs(wsPos.xyz) - vec3<f32>(1.0, 1.0, 1.0);
dist[0] = min(dist[0], (length(max(q0, vec3<f32>(0.0, 0.0, 0.0))) + min(max(q0.x, max(q0.y, q0.z)), 0.0)));
return dist[0];
}
";
        assert_eq!(shader.code, expected);
    }

    #[test]
    fn union_of_sphere_and_cube_in_hlsl() {
        let root = sphere_cube_union();
        let shader = compile(
            &root,
            CompileOptions {
                dialect: ShaderDialect::Hlsl,
                ..CompileOptions::default()
            },
        );
        assert!(shader.is_clean());
        let expected = "\
float sdf_generated(float3 p) {
float dist[1];
float4 wsPos;
dist[0] = (length(p.xyz) - 0.5);
wsPos = float4(p, 1.0) - float4(2.0, 0.0, 0.0, 0.0);
float3 q0 = abs(wsPos.xyz) - float3(1.0, 1.0, 1.0);
dist[0] = min(dist[0], (length(max(q0, float3(0.0, 0.0, 0.0))) + min(max(q0.x, max(q0.y, q0.z)), 0.0)));
return dist[0];
}
";
        assert_eq!(shader.code, expected);
    }

    #[test]
    fn single_shape_child_assigns_directly() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[0] = (length(p.xyz) - 0.5);"));
        assert!(!shader.code.contains("min("));
    }

    #[test]
    fn lone_operation_child_copies_without_combining() {
        let root = SceneNode::operation(OperationKind::Union).with_child(
            SceneNode::operation(OperationKind::Union)
                .with_position(Vec3::new(0.0, 3.0, 0.0))
                .with_child(SceneNode::shape(ShapeKind::Sphere)),
        );
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[0] = dist[1];"));
        assert!(!shader.code.contains("min("));
    }

    #[test]
    fn nested_identity_operations_share_the_query_point() {
        let root = SceneNode::operation(OperationKind::Union).with_child(
            SceneNode::operation(OperationKind::Union)
                .with_child(SceneNode::shape(ShapeKind::Sphere)),
        );
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[1] = (length(p.xyz) - 0.5);"));
        assert!(!shader.code.contains("sPos"));
    }

    #[test]
    fn translated_scaled_operation_uses_componentwise_inverse() {
        let root = SceneNode::operation(OperationKind::Union).with_child(
            SceneNode::operation(OperationKind::Union)
                .with_position(Vec3::new(2.0, 0.0, 0.0))
                .with_scale(Vec3::splat(2.0))
                .with_child(SceneNode::shape(ShapeKind::Sphere)),
        );
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains(
            "sPos[1] = vec4<f32>(p, 1.0) * vec4<f32>(0.5, 0.5, 0.5, 1.0) - vec4<f32>(1.0, 0.0, 0.0, 0.0);"
        ));
        assert!(shader.code.contains("dist[1] = (length(sPos[1].xyz) - 0.5);"));
    }

    #[test]
    fn rotation_falls_back_to_inverse_matrix() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_rotation(Quat::from_rotation_y(0.5))
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("sPos[0] = (mat4x4<f32>("));
        assert!(!shader.code.contains(MATRIX_TABLE));
    }

    #[test]
    fn matrix_table_hoists_constants_above_the_function() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_rotation(Quat::from_rotation_y(0.5))
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(
            &root,
            CompileOptions {
                matrix_table: true,
                ..CompileOptions::default()
            },
        );
        assert!(shader.code.contains("const sdf_mats = array<mat4x4<f32>, 1>("));
        assert!(shader.code.contains("sPos[0] = (sdf_mats[0] * vec4<f32>(p, 1.0));"));
        let table_at = shader.code.find("const sdf_mats").unwrap();
        let fn_at = shader.code.find("fn sdf_generated").unwrap();
        assert!(table_at < fn_at);
    }

    #[test]
    fn flat_bindings_name_slots_directly() {
        let root = SceneNode::operation(OperationKind::Union).with_child(
            SceneNode::operation(OperationKind::Union)
                .with_position(Vec3::new(1.0, 0.0, 0.0))
                .with_child(SceneNode::shape(ShapeKind::Sphere)),
        );
        let shader = compile(
            &root,
            CompileOptions {
                storage: SlotStorage::FlatBindings,
                ..CompileOptions::default()
            },
        );
        assert!(shader.code.contains("var sPos1: vec4<f32>;"));
        assert!(shader.code.contains("var dist0: f32;"));
        assert!(shader.code.contains("dist1 = (length(sPos1.xyz) - 0.5);"));
        assert!(!shader.code.contains("dist["));
    }

    #[test]
    fn subtraction_negates_the_accumulated_side() {
        let root = SceneNode::operation(OperationKind::Subtraction)
            .with_child(SceneNode::shape(ShapeKind::Cube).with_scale(Vec3::splat(4.0)))
            .with_child(
                SceneNode::shape(ShapeKind::Sphere).with_position(Vec3::new(1.0, 0.0, 0.0)),
            );
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[0] = max(-dist[0], "));
    }

    #[test]
    fn intersection_keeps_both_sides() {
        let root = SceneNode::operation(OperationKind::Intersection)
            .with_child(SceneNode::shape(ShapeKind::Sphere))
            .with_child(SceneNode::shape(ShapeKind::Cube));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[0] = max(dist[0], "));
    }

    #[test]
    fn inactive_children_emit_nothing() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere))
            .with_child(
                SceneNode::shape(ShapeKind::Cube)
                    .with_position(Vec3::new(2.0, 0.0, 0.0))
                    .with_active(false),
            );
        let shader = compile(&root, CompileOptions::default());
        assert!(!shader.code.contains("wsPos"));
        assert!(!shader.code.contains("q0"));
    }

    #[test]
    fn missing_child_slot_is_reported_and_siblings_continue() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(
                SceneNode::operation(OperationKind::Union)
                    .with_child(SceneNode::shape(ShapeKind::Sphere)),
            )
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        // stale list that never saw the child operation
        let ops = vec![&root];
        let shader = ShaderCompiler::new(CompileOptions::default()).compile(&root, &ops);
        assert_eq!(
            shader.issues,
            vec![CompileIssue::MissingSlot {
                path: "root/0".to_string()
            }]
        );
        // the abandoned subtree leaves no trace; the sibling still lands
        assert!(!shader.code.contains("dist[1]"));
        assert!(shader.code.contains("dist[0] = (length(p.xyz) - 0.5);"));
    }

    #[test]
    fn missing_root_slot_returns_zero() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let decoy = SceneNode::operation(OperationKind::Union);
        let ops = vec![&decoy];
        let shader = ShaderCompiler::new(CompileOptions::default()).compile(&root, &ops);
        assert_eq!(
            shader.issues,
            vec![CompileIssue::MissingSlot {
                path: "root".to_string()
            }]
        );
        assert!(shader.code.contains("return 0.0;"));
    }

    #[test]
    fn empty_operation_list_compiles_to_zero() {
        let root = SceneNode::operation(OperationKind::Union);
        let shader = ShaderCompiler::new(CompileOptions::default()).compile(&root, &[]);
        assert!(shader.is_clean());
        assert!(shader.code.contains("return 0.0;"));
        assert!(!shader.code.contains("dist"));
    }

    #[test]
    fn mesh_shapes_are_reported_and_skipped() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Mesh))
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert_eq!(
            shader.issues,
            vec![CompileIssue::UnsupportedShape {
                path: "root/0".to_string(),
                kind: ShapeKind::Mesh
            }]
        );
        // the sphere becomes the first contribution
        assert!(shader.code.contains("dist[0] = (length(p.xyz) - 0.5);"));
        assert!(!shader.code.contains("min("));
    }

    #[test]
    fn childless_operation_zeroes_its_slot() {
        let root = SceneNode::operation(OperationKind::Union);
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dist[0] = 0.0;"));
        assert!(shader.code.contains("return dist[0];"));
    }

    #[test]
    fn inactive_root_compiles_to_zero() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere))
            .with_active(false);
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.is_clean());
        assert!(shader.code.contains("return 0.0;"));
    }

    #[test]
    fn shape_root_returns_its_expression() {
        let root = SceneNode::shape(ShapeKind::Sphere);
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.is_clean());
        assert!(shader.code.contains("return (length(p.xyz) - 0.5);"));
    }

    #[test]
    fn verbose_annotates_paths_and_indents() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let verbose = compile(
            &root,
            CompileOptions {
                verbose: true,
                ..CompileOptions::default()
            },
        );
        assert!(verbose.code.contains("    // root: Union"));
        assert!(verbose.code.contains("        // root/0: Sphere"));
        assert!(verbose.code.contains("    return dist[0];"));

        let compact = compile(&root, CompileOptions::default());
        assert!(!compact.code.contains("//"));
        assert!(!compact.code.contains("    "));
    }

    #[test]
    fn repeat_distortion_wraps_only_positive_periods() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_distortion(Distortion::Repeat {
                period: Vec3::new(4.0, 0.0, 0.0),
            })
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("sPos[0] = vec4<f32>(p, 1.0);"));
        assert!(shader.code.contains(
            "sPos[0].x = sPos[0].x - 4.0 * floor(sPos[0].x / 4.0 + 0.5);"
        ));
        assert!(!shader.code.contains("sPos[0].y ="));
        assert!(!shader.code.contains("sPos[0].z ="));
    }

    #[test]
    fn polar_distortion_uses_folded_sector() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_distortion(Distortion::RepeatPolar {
                axis: Axis::Y,
                count: 4,
            })
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("let pr0 = length(sPos[0].xz);"));
        assert!(shader.code.contains("var pa0 = atan2(sPos[0].z, sPos[0].x);"));
        assert!(shader.code.contains("1.5707964"));
        assert!(shader.code.contains("sPos[0].x = pr0 * cos(pa0);"));
        assert!(shader.code.contains("sPos[0].z = pr0 * sin(pa0);"));
    }

    #[test]
    fn rotate_distortion_folds_trig_constants() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_distortion(Distortion::Rotate {
                axis: Axis::Y,
                angle: FRAC_PI_2,
            })
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("sPos[0] = vec4<f32>("));
        assert!(shader.code.contains("sPos[0].y, "));
        assert!(!shader.code.contains("sin("));
        assert!(!shader.code.contains("--"));
    }

    #[test]
    fn mirror_and_flip_rewrite_components() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_distortion(Distortion::MirrorXz)
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("sPos[0].x = abs(sPos[0].x);"));
        assert!(shader.code.contains("sPos[0].z = abs(sPos[0].z);"));
        assert!(!shader.code.contains("sPos[0].y = abs("));

        let root = SceneNode::operation(OperationKind::Union)
            .with_distortion(Distortion::Flip { axis: Axis::X })
            .with_child(SceneNode::shape(ShapeKind::Sphere));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("sPos[0].x = -sPos[0].x;"));
    }

    #[test]
    fn plane_child_reads_parent_register() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_position(Vec3::new(0.0, 2.0, 0.0))
            .with_child(SceneNode::shape(ShapeKind::Plane));
        let shader = compile(&root, CompileOptions::default());
        assert!(shader.code.contains("dot(sPos[0].xyz, vec3<f32>(0.0, 1.0, 0.0))"));
        assert!(!shader.code.contains("wsPos"));
    }

    #[test]
    fn recompiling_resets_all_counters() {
        let root = SceneNode::operation(OperationKind::Union)
            .with_rotation(Quat::from_rotation_y(0.5))
            .with_child(SceneNode::shape(ShapeKind::Cube).with_scale(Vec3::splat(2.0)))
            .with_child(SceneNode::shape(ShapeKind::Cylinder));
        let ops = collect_operations(&root);
        let options = CompileOptions {
            matrix_table: true,
            ..CompileOptions::default()
        };
        let mut compiler = ShaderCompiler::new(options);
        let first = compiler.compile(&root, &ops);
        let second = compiler.compile(&root, &ops);
        assert_eq!(first, second);

        let fresh = ShaderCompiler::new(options).compile(&root, &ops);
        assert_eq!(first, fresh);
    }
}
