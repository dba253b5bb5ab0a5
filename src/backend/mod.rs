//! The bridge to whatever actually compiles and runs shaders.
//!
//! [`ShaderBackend`] mirrors the handful of driver entry points a program
//! needs: stage and program objects, compile/link with logs, active variable
//! introspection, and the per-draw uniform, texture and state calls. A real
//! renderer implements it over its GL context; [`HeadlessBackend`] implements
//! it without a GPU for tooling and tests.

mod headless;

pub use headless::HeadlessBackend;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::VertexAttribute;
use crate::port::Literal;
use crate::render_data::{MeshData, TextureId};
use crate::types::{GlslType, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// An attribute or uniform the linker kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveVariable {
    /// Name as reported by the driver; arrays report `name[0]`.
    pub name: String,
    pub ty: GlslType,
    /// Array length, 1 for non-arrays.
    pub size: u32,
    pub location: i32,
}

/// Failure to create driver objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("could not create {0} shader stage")]
    StageCreation(Stage),
    #[error("could not create program object")]
    ProgramCreation,
}

/// A value uploaded to a uniform location.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
    /// Three floats per element.
    Vec3Array(Vec<f32>),
    /// Four floats per element.
    Vec4Array(Vec<f32>),
    /// Column-major matrices, 16 floats each.
    Mat4Array(Vec<f32>),
}

impl UniformValue {
    pub fn vec3_array(vectors: &[Vec3]) -> Self {
        UniformValue::Vec3Array(bytemuck::cast_slice::<Vec3, f32>(vectors).to_vec())
    }

    pub fn vec4_array(vectors: &[Vec4]) -> Self {
        UniformValue::Vec4Array(bytemuck::cast_slice::<Vec4, f32>(vectors).to_vec())
    }

    /// Flattens matrices into one array upload.
    pub fn mat4_array(matrices: &[Mat4]) -> Self {
        UniformValue::Mat4Array(bytemuck::cast_slice::<Mat4, f32>(matrices).to_vec())
    }

    /// Number of array elements, 1 for plain values.
    pub fn len(&self) -> usize {
        match self {
            UniformValue::FloatArray(v) => v.len(),
            UniformValue::IntArray(v) => v.len(),
            UniformValue::Vec3Array(v) => v.len() / 3,
            UniformValue::Vec4Array(v) => v.len() / 4,
            UniformValue::Mat4Array(v) => v.len() / 16,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::Int(v as i32)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Literal> for UniformValue {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Float(v) => UniformValue::Float(v),
            Literal::Int(v) => UniformValue::Int(v),
            Literal::Bool(v) => UniformValue::Bool(v),
            Literal::Vec2(v) => UniformValue::Vec2(Vec2::from_array(v)),
            Literal::Vec3(v) => UniformValue::Vec3(Vec3::from_array(v)),
            Literal::Vec4(v) => UniformValue::Vec4(Vec4::from_array(v)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

/// Fixed-function state a program sets before drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderState {
    /// Standard `src_alpha, one_minus_src_alpha` blending.
    pub blending: bool,
    /// `None` disables face culling.
    pub cull_face: Option<CullFace>,
}

/// Driver operations used to compile, link and feed a shader program.
///
/// Object creation is the only fallible call; compile and link report
/// success as a `bool` and explain failures through the log getters.
pub trait ShaderBackend {
    fn create_shader_stage(&mut self, stage: Stage) -> Result<StageHandle, BackendError>;
    fn compile(&mut self, stage: StageHandle, source: &str) -> bool;
    fn shader_log(&self, stage: StageHandle) -> String;
    fn delete_shader_stage(&mut self, stage: StageHandle);

    fn create_program(&mut self) -> Result<ProgramHandle, BackendError>;
    fn attach(&mut self, program: ProgramHandle, stage: StageHandle);
    fn detach(&mut self, program: ProgramHandle, stage: StageHandle);
    fn link(&mut self, program: ProgramHandle) -> bool;
    fn program_log(&self, program: ProgramHandle) -> String;
    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable>;
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable>;
    fn delete_program(&mut self, program: ProgramHandle);

    fn use_program(&mut self, program: ProgramHandle);
    fn set_uniform(&mut self, program: ProgramHandle, location: i32, value: &UniformValue);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);
    fn enable_vertex_attribute(&mut self, location: i32, attribute: &VertexAttribute, stride: u32);
    fn set_render_state(&mut self, state: RenderState);
    fn draw_mesh(&mut self, mesh: &MeshData);
}
