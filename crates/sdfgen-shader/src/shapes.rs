//! Shape distance expressions
//!
//! Each shape lowers to one expression over a position register, with at
//! most one scratch declaration in front. `pos` is the register to sample:
//! the query parameter, a slot position or the `wsPos` working register;
//! swizzles pick the components a formula needs.
//!
//! Sphere, cube and cylinder expressions are wrapped in a multiplicative
//! bias when it is off 1. The plane family is evaluated in the parent
//! operation's space and never biased.

use glam::Vec3;
use sdfgen_scene::{DEFAULT_BIAS, SceneNode, ShapeKind};

use crate::dialect::{ShaderDialect, fmt_f32};

/// A lowered shape: an optional scratch statement and the expression itself.
pub(crate) struct ShapeExpr {
    pub setup: Option<String>,
    pub expr: String,
}

impl ShapeExpr {
    fn bare(expr: String) -> Self {
        Self { setup: None, expr }
    }
}

/// Lower one shape leaf. Returns `None` for kinds with no closed form.
pub(crate) fn shape_expression(
    node: &SceneNode,
    kind: ShapeKind,
    bias: f32,
    pos: &str,
    dialect: ShaderDialect,
    counter: &mut usize,
) -> Option<ShapeExpr> {
    match kind {
        ShapeKind::Mesh => None,
        ShapeKind::Plane => Some(ShapeExpr::bare(plane_expr(node, pos, dialect))),
        ShapeKind::FracturedPlane => {
            Some(ShapeExpr::bare(fractured_plane_expr(node, pos, dialect)))
        }
        ShapeKind::Sphere => {
            let expr = format!("(length({}.xyz) - 0.5)", pos);
            Some(ShapeExpr::bare(with_bias(expr, bias)))
        }
        ShapeKind::Cube => Some(cube_expr(node, bias, pos, dialect, counter)),
        ShapeKind::Cylinder => Some(cylinder_expr(node, bias, pos, dialect, counter)),
    }
}

fn with_bias(expr: String, bias: f32) -> String {
    // Only a bit-exact neutral bias skips the multiply.
    if bias.to_bits() == DEFAULT_BIAS.to_bits() {
        expr
    } else {
        format!("({} * {})", expr, fmt_f32(bias))
    }
}

fn vec2_ctor(dialect: ShaderDialect, x: f32, y: f32) -> String {
    format!("{}({}, {})", dialect.vec2(), fmt_f32(x), fmt_f32(y))
}

fn vec3_ctor(dialect: ShaderDialect, v: Vec3) -> String {
    format!(
        "{}({}, {}, {})",
        dialect.vec3(),
        fmt_f32(v.x),
        fmt_f32(v.y),
        fmt_f32(v.z)
    )
}

/// `dot(p, n) - dot(t, n)`, normal and offset folded to constants.
fn plane_expr(node: &SceneNode, pos: &str, dialect: ShaderDialect) -> String {
    let n = node.shape_parameters();
    let offset = node.transform.position.dot(n);
    format!(
        "(dot({}.xyz, {}) - {})",
        pos,
        vec3_ctor(dialect, n),
        fmt_f32(offset)
    )
}

fn fractured_plane_expr(node: &SceneNode, pos: &str, dialect: ShaderDialect) -> String {
    let n = node.shape_parameters();
    let offset = node.transform.position.dot(n);
    format!(
        "(dot({p}.xyz, {n}) - {c} - 0.25 * (abs({p}.x - floor({p}.x) - 0.5) + abs({p}.z - floor({p}.z) - 0.5)))",
        p = pos,
        n = vec3_ctor(dialect, n),
        c = fmt_f32(offset)
    )
}

fn cube_expr(
    node: &SceneNode,
    bias: f32,
    pos: &str,
    dialect: ShaderDialect,
    counter: &mut usize,
) -> ShapeExpr {
    let half_extents = node.shape_parameters();
    let q = format!("q{}", *counter);
    *counter += 1;
    let setup = dialect.let_vec3(
        &q,
        &format!("abs({}.xyz) - {}", pos, vec3_ctor(dialect, half_extents)),
    );
    let zero3 = vec3_ctor(dialect, Vec3::ZERO);
    let expr = format!(
        "(length(max({q}, {zero})) + min(max({q}.x, max({q}.y, {q}.z)), 0.0))",
        q = q,
        zero = zero3
    );
    ShapeExpr {
        setup: Some(setup),
        expr: with_bias(expr, bias),
    }
}

fn cylinder_expr(
    node: &SceneNode,
    bias: f32,
    pos: &str,
    dialect: ShaderDialect,
    counter: &mut usize,
) -> ShapeExpr {
    let params = node.shape_parameters();
    let d = format!("d{}", *counter);
    *counter += 1;
    let setup = dialect.let_vec2(
        &d,
        &format!(
            "abs({v2}(length({p}.xz), {p}.y)) - {radii}",
            v2 = dialect.vec2(),
            p = pos,
            radii = vec2_ctor(dialect, params.x, params.y)
        ),
    );
    let expr = format!(
        "(min(max({d}.x, {d}.y), 0.0) + length(max({d}, {zero})))",
        d = d,
        zero = vec2_ctor(dialect, 0.0, 0.0)
    );
    ShapeExpr {
        setup: Some(setup),
        expr: with_bias(expr, bias),
    }
}
