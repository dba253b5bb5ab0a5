//! Ports, literals and the coercion rules that turn them into shader expressions.
//!
//! A [`Port`] is a named, typed value produced by exactly one node. When a node
//! reads an input it sees a [`Value`], which is either a resolved port or a
//! [`Literal`], and asks it for an expression of the arity it needs:
//!
//! ```ignore
//! let uv = cx.input("uv");
//! writeln!(out, "{} = texture({}, {});", color.reference(), sampler.reference(), uv.as_vec2())?;
//! ```
//!
//! | from \ to | float      | vec2          | vec3            | vec4                 |
//! |-----------|------------|---------------|-----------------|----------------------|
//! | float     | `x`        | `vec2(x)`     | `vec3(x)`       | `vec4(x)`            |
//! | vec2      | `x.x`      | `x`           | `vec3(x, 0.0)`  | `vec4(x, 0.0, w)`    |
//! | vec3      | `x.x`      | `x.xy`        | `x`             | `vec4(x, w)`         |
//! | vec4      | `x.x`      | `x.xy`        | `x.xyz`         | `x`                  |
//!
//! `w` comes from the value's [`Semantic`] unless the caller passes one.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::types::{GlslType, Scope, Semantic};

/// A typed output slot of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    /// Base name; the emitted identifier is `name` followed by `uid`.
    pub name: String,
    pub ty: GlslType,
    pub scope: Scope,
    pub semantic: Semantic,
    /// Assigned on every build, unique within one program.
    pub uid: u32,
    /// True when some other node reads this port.
    pub used: bool,
    /// Expression substituted for [`Scope::Inline`] ports.
    pub inline_code: Option<String>,
}

impl Port {
    /// Creates a global-scope port carrying a plain value.
    pub fn new(name: impl Into<String>, ty: GlslType) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: Scope::Global,
            semantic: Semantic::Value,
            uid: 0,
            used: false,
            inline_code: None,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn semantic(mut self, semantic: Semantic) -> Self {
        self.semantic = semantic;
        self
    }

    /// The identifier (or inline expression) other nodes use to read this port.
    pub fn reference(&self) -> String {
        match (&self.scope, &self.inline_code) {
            (Scope::Inline, Some(code)) => code.clone(),
            _ => format!("{}{}", self.name, self.uid),
        }
    }

    /// `"<type> <ref>"`, as written in declarations.
    pub fn typed_ref(&self) -> String {
        format!("{} {}", self.ty.name(), self.reference())
    }
}

/// A constant usable anywhere a port is.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Literal {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl Literal {
    pub const ZERO: Literal = Literal::Float(0.0);
    pub const ONE: Literal = Literal::Float(1.0);

    pub fn ty(&self) -> GlslType {
        match self {
            Literal::Float(_) => GlslType::Float,
            Literal::Int(_) => GlslType::Int,
            Literal::Bool(_) => GlslType::Bool,
            Literal::Vec2(_) => GlslType::Vec2,
            Literal::Vec3(_) => GlslType::Vec3,
            Literal::Vec4(_) => GlslType::Vec4,
        }
    }

    /// False when any component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Literal::Float(v) => v.is_finite(),
            Literal::Int(_) | Literal::Bool(_) => true,
            Literal::Vec2(v) => v.iter().all(|c| c.is_finite()),
            Literal::Vec3(v) => v.iter().all(|c| c.is_finite()),
            Literal::Vec4(v) => v.iter().all(|c| c.is_finite()),
        }
    }

    /// The literal as GLSL source text.
    pub fn code(&self) -> String {
        match self {
            Literal::Float(v) => format_float(*v),
            Literal::Int(v) => v.to_string(),
            Literal::Bool(v) => v.to_string(),
            Literal::Vec2(v) => vector_code(GlslType::Vec2, v),
            Literal::Vec3(v) => vector_code(GlslType::Vec3, v),
            Literal::Vec4(v) => vector_code(GlslType::Vec4, v),
        }
    }
}

fn vector_code(ty: GlslType, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| format_float(*c)).collect();
    format!("{}({})", ty.name(), parts.join(", "))
}

/// Formats a float so GLSL always parses it as a float (`1` becomes `1.0`).
///
/// GLSL has no NaN or infinity literals: NaN is written as `0.0` and
/// infinities saturate to the largest finite float.
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        "0.0".to_string()
    } else if value.is_infinite() {
        format!("{:e}", f32::MAX.copysign(value))
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Where a node input reads from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PortRef {
    /// Output `port` of another node in the same graph.
    Output { node: NodeId, port: usize },
    Literal(Literal),
}

impl PortRef {
    /// The producing node, if this is not a literal.
    pub fn source_node(&self) -> Option<NodeId> {
        match self {
            PortRef::Output { node, .. } => Some(*node),
            PortRef::Literal(_) => None,
        }
    }
}

impl From<Literal> for PortRef {
    fn from(literal: Literal) -> Self {
        PortRef::Literal(literal)
    }
}

/// An input as seen by the node reading it: an expression with a type.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    code: String,
    ty: GlslType,
    semantic: Semantic,
}

impl Value {
    pub fn from_port(port: &Port) -> Self {
        Self {
            code: port.reference(),
            ty: port.ty,
            semantic: port.semantic,
        }
    }

    pub fn from_literal(literal: Literal) -> Self {
        Self {
            code: literal.code(),
            ty: literal.ty(),
            semantic: Semantic::Value,
        }
    }

    /// The expression as-is, without any conversion.
    pub fn reference(&self) -> &str {
        &self.code
    }

    pub fn ty(&self) -> GlslType {
        self.ty
    }

    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    pub fn as_float(&self) -> String {
        self.as_type(GlslType::Float)
    }

    pub fn as_vec2(&self) -> String {
        self.as_type(GlslType::Vec2)
    }

    pub fn as_vec3(&self) -> String {
        self.as_type(GlslType::Vec3)
    }

    /// Widens with the `w` component implied by the value's semantic.
    pub fn as_vec4(&self) -> String {
        self.as_vec4_padded(self.semantic.w_pad())
    }

    /// Widens with an explicit `w` component.
    pub fn as_vec4_padded(&self, w: f32) -> String {
        coerce(&self.code, self.ty, GlslType::Vec4, w)
    }

    /// Converts to any scalar or vector type; matrices and samplers pass through.
    pub fn as_type(&self, ty: GlslType) -> String {
        coerce(&self.code, self.ty, ty, self.semantic.w_pad())
    }
}

fn coerce(code: &str, from: GlslType, to: GlslType, w: f32) -> String {
    if from == to {
        return code.to_string();
    }
    let (Some(n), Some(m)) = (from.arity(), to.arity()) else {
        return code.to_string();
    };

    if matches!(to, GlslType::Int | GlslType::Bool) {
        return if n > 1 {
            format!("{}({code}.x)", to.name())
        } else {
            format!("{}({code})", to.name())
        };
    }

    if n == 1 {
        // `from` is int or bool when both are scalars
        return if m == 1 {
            format!("float({code})")
        } else {
            format!("{}({code})", to.name())
        };
    }

    if m == 1 {
        return format!("{code}.x");
    }
    if n > m {
        return format!("{code}.{}", &"xyzw"[..m as usize]);
    }
    match (n, m) {
        (2, 3) => format!("vec3({code}, 0.0)"),
        (2, 4) => format!("vec4({code}, 0.0, {})", format_float(w)),
        (3, 4) => format!("vec4({code}, {})", format_float(w)),
        _ => code.to_string(),
    }
}
