//! Vertex layouts and object transforms fed to compiled programs.
//!
//! Generated shaders read mesh data through attributes with fixed names
//! (`POSITION`, `NORMAL`, `TANGENT`, `TEXCOORD_0`, `JOINTS_n`, `WEIGHTS_n`).
//! A [`VertexLayout`] tells the program where each of those lives in the
//! vertex buffer, so the active attributes of a program can be enabled per mesh.
//!
//! # Vertex3d Layout
//!
//! | Attribute    | Components | Offset |
//! |--------------|------------|--------|
//! | `POSITION`   | 3          | 0      |
//! | `NORMAL`     | 3          | 12     |
//! | `TEXCOORD_0` | 2          | 24     |

use glam::{Mat4, Quat, Vec3};

/// Attribute names the built-in nodes read.
pub mod attribute {
    pub const POSITION: &str = "POSITION";
    pub const NORMAL: &str = "NORMAL";
    pub const TANGENT: &str = "TANGENT";
    pub const TEXCOORD_0: &str = "TEXCOORD_0";

    pub fn joints(set: u32) -> String {
        format!("JOINTS_{set}")
    }

    pub fn weights(set: u32) -> String {
        format!("WEIGHTS_{set}")
    }
}

/// One named float attribute inside an interleaved vertex buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: String,
    /// Float components, 1 to 4.
    pub components: u8,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

/// The interleaved layout of a mesh's vertex buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes per vertex.
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Creates an empty layout; attributes are appended back to back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a float attribute after the previous one.
    pub fn attribute(mut self, name: impl Into<String>, components: u8) -> Self {
        let offset = self.stride;
        self.stride += u32::from(components) * 4;
        self.attributes.push(VertexAttribute {
            name: name.into(),
            components,
            offset,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A vertex with position, normal and texture coordinates.
///
/// `#[repr(C)]` and [`bytemuck::Pod`] so vertex slices can be uploaded with
/// `bytemuck::cast_slice`. Matches [`Vertex3d::layout`], 32 bytes per vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// The attribute layout of a `[Vertex3d]` buffer.
    pub fn layout() -> VertexLayout {
        VertexLayout::new()
            .attribute(attribute::POSITION, 3)
            .attribute(attribute::NORMAL, 3)
            .attribute(attribute::TEXCOORD_0, 2)
    }
}

/// Position, rotation and scale of an object in world space.
///
/// ```
/// use nodeshade::{Transform, Vec3};
///
/// let transform = Transform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .uniform_scale(2.0);
/// assert_eq!(transform.scale, Vec3::splat(2.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// The world matrix, applied scale first, then rotation, then translation.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
