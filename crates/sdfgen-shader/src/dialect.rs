//! Shading-language surface syntax
//!
//! Generated code targets one of two surfaces. They differ only in type
//! spellings, declaration forms, the matrix-vector multiply call and matrix
//! literal component order; everything else the compiler writes is
//! restricted to builtins both languages spell identically (`min`, `max`,
//! `abs`, `floor`, `dot`, `length`, `sin`, `cos`, `atan2`).

use glam::Mat4;

/// Target surface syntax for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderDialect {
    /// `float3`/`float4x4` types, `mul(m, v)`, row-major matrix literals.
    Hlsl,
    /// `vec3<f32>`/`mat4x4<f32>` types, `(m * v)`, column-major literals.
    #[default]
    Wgsl,
}

impl ShaderDialect {
    pub fn scalar(self) -> &'static str {
        match self {
            ShaderDialect::Hlsl => "float",
            ShaderDialect::Wgsl => "f32",
        }
    }

    pub fn vec2(self) -> &'static str {
        match self {
            ShaderDialect::Hlsl => "float2",
            ShaderDialect::Wgsl => "vec2<f32>",
        }
    }

    pub fn vec3(self) -> &'static str {
        match self {
            ShaderDialect::Hlsl => "float3",
            ShaderDialect::Wgsl => "vec3<f32>",
        }
    }

    pub fn vec4(self) -> &'static str {
        match self {
            ShaderDialect::Hlsl => "float4",
            ShaderDialect::Wgsl => "vec4<f32>",
        }
    }

    pub fn mat4(self) -> &'static str {
        match self {
            ShaderDialect::Hlsl => "float4x4",
            ShaderDialect::Wgsl => "mat4x4<f32>",
        }
    }

    /// Matrix-vector product in this dialect's call form.
    pub fn mul(self, m: &str, v: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("mul({}, {})", m, v),
            ShaderDialect::Wgsl => format!("({} * {})", m, v),
        }
    }

    /// Header line of the generated function, up to and including `{`.
    pub fn fn_header(self, name: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float {}(float3 p) {{", name),
            ShaderDialect::Wgsl => format!("fn {}(p: vec3<f32>) -> f32 {{", name),
        }
    }

    pub fn decl_scalar(self, name: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float {};", name),
            ShaderDialect::Wgsl => format!("var {}: f32;", name),
        }
    }

    pub fn decl_vec4(self, name: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float4 {};", name),
            ShaderDialect::Wgsl => format!("var {}: vec4<f32>;", name),
        }
    }

    pub fn decl_scalar_array(self, name: &str, len: usize) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float {}[{}];", name, len),
            ShaderDialect::Wgsl => format!("var {}: array<f32, {}>;", name, len),
        }
    }

    pub fn decl_vec4_array(self, name: &str, len: usize) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float4 {}[{}];", name, len),
            ShaderDialect::Wgsl => format!("var {}: array<vec4<f32>, {}>;", name, len),
        }
    }

    /// Immutable scratch binding with an initializer.
    pub fn let_scalar(self, name: &str, expr: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float {} = {};", name, expr),
            ShaderDialect::Wgsl => format!("let {} = {};", name, expr),
        }
    }

    /// Mutable scratch binding with an initializer.
    pub fn var_scalar(self, name: &str, expr: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float {} = {};", name, expr),
            ShaderDialect::Wgsl => format!("var {} = {};", name, expr),
        }
    }

    pub fn let_vec2(self, name: &str, expr: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float2 {} = {};", name, expr),
            ShaderDialect::Wgsl => format!("let {} = {};", name, expr),
        }
    }

    pub fn let_vec3(self, name: &str, expr: &str) -> String {
        match self {
            ShaderDialect::Hlsl => format!("float3 {} = {};", name, expr),
            ShaderDialect::Wgsl => format!("let {} = {};", name, expr),
        }
    }

    /// Matrix literal with all sixteen components spelled out.
    ///
    /// glam stores column-major; HLSL constructors fill row by row, so the
    /// HLSL form transposes before emission. WGSL takes columns as stored.
    pub fn mat_literal(self, m: &Mat4) -> String {
        let vals = match self {
            ShaderDialect::Hlsl => m.transpose().to_cols_array(),
            ShaderDialect::Wgsl => m.to_cols_array(),
        };
        let body = vals
            .iter()
            .map(|v| fmt_f32(*v))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.mat4(), body)
    }

    /// Module-scope constant table holding hoisted matrices.
    pub fn matrix_table_decl(self, name: &str, mats: &[Mat4]) -> String {
        let entries = mats
            .iter()
            .map(|m| format!("    {}", self.mat_literal(m)))
            .collect::<Vec<_>>()
            .join(",\n");
        match self {
            ShaderDialect::Hlsl => format!(
                "static const {} {}[{}] = {{\n{}\n}};",
                self.mat4(),
                name,
                mats.len(),
                entries
            ),
            ShaderDialect::Wgsl => {
                format!("const {} = array<{}, {}>(\n{}\n);", name, self.mat4(), mats.len(), entries)
            }
        }
    }
}

/// Float literal formatting for all emitted text: shortest round-trip
/// decimal, `.0` forced on integral values, never scientific notation, so
/// the same input always produces the same bytes.
pub(crate) fn fmt_f32(v: f32) -> String {
    let s = v.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}
