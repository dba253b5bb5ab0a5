//! Shading-language value types and the qualifiers attached to ports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A GLSL value type that a port can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlslType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Bool,
    Int,
}

impl GlslType {
    /// The GLSL keyword for this type.
    pub fn name(self) -> &'static str {
        match self {
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
            GlslType::Sampler3D => "sampler3D",
            GlslType::SamplerCube => "samplerCube",
            GlslType::Bool => "bool",
            GlslType::Int => "int",
        }
    }

    /// Looks a type up by its GLSL keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "float" => GlslType::Float,
            "vec2" => GlslType::Vec2,
            "vec3" => GlslType::Vec3,
            "vec4" => GlslType::Vec4,
            "mat3" => GlslType::Mat3,
            "mat4" => GlslType::Mat4,
            "sampler2D" => GlslType::Sampler2D,
            "sampler3D" => GlslType::Sampler3D,
            "samplerCube" => GlslType::SamplerCube,
            "bool" => GlslType::Bool,
            "int" => GlslType::Int,
            _ => return None,
        })
    }

    /// Number of components for scalars and vectors, `None` for matrices and samplers.
    pub fn arity(self) -> Option<u8> {
        match self {
            GlslType::Float | GlslType::Bool | GlslType::Int => Some(1),
            GlslType::Vec2 => Some(2),
            GlslType::Vec3 => Some(3),
            GlslType::Vec4 => Some(4),
            _ => None,
        }
    }

    /// The float vector type with `arity` components.
    pub fn float_vector(arity: u8) -> Option<Self> {
        match arity {
            1 => Some(GlslType::Float),
            2 => Some(GlslType::Vec2),
            3 => Some(GlslType::Vec3),
            4 => Some(GlslType::Vec4),
            _ => None,
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            GlslType::Sampler2D | GlslType::Sampler3D | GlslType::SamplerCube
        )
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, GlslType::Mat3 | GlslType::Mat4)
    }

    /// Whether a value of type `self` can be fed into a slot of type `target`.
    ///
    /// Scalars and vectors convert freely between each other (broadcast,
    /// truncation or padding); matrices and samplers only match themselves.
    pub fn coercible_to(self, target: GlslType) -> bool {
        self == target || (self.arity().is_some() && target.arity().is_some())
    }
}

impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a port's value lives in the generated program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// Substituted literally at every use, never declared.
    Inline,
    /// Declared inside the stage entry function.
    Local,
    /// File-scope variable of one stage.
    Global,
    Uniform,
    /// Vertex-stage input read from the mesh.
    Attribute,
    VaryingIn,
    VaryingOut,
}

/// What a vector value means, used to pick the `w` component when it is widened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Semantic {
    #[default]
    Value,
    Point,
    Direction,
    Color,
}

impl Semantic {
    /// The `w` component used when a vec3 of this kind becomes a vec4.
    pub fn w_pad(self) -> f32 {
        match self {
            Semantic::Direction => 0.0,
            Semantic::Value | Semantic::Point | Semantic::Color => 1.0,
        }
    }
}

/// One of the two programmable pipeline stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}
