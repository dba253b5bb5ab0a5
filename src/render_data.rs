//! Per-frame, per-object and per-mesh values pushed into compiled programs.
//!
//! Nodes never reach into a global "active camera"; the caller hands these
//! structs to [`ShaderProgram::prepare_scene`](crate::ShaderProgram::prepare_scene),
//! [`prepare_object`](crate::ShaderProgram::prepare_object) and
//! [`draw`](crate::ShaderProgram::draw).

use std::collections::BTreeMap;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::backend::UniformValue;
use crate::camera::Camera;
use crate::mesh::{Transform, VertexLayout};

/// Type-safe handle to a texture owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u32);

/// How a surface treats its alpha channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Fragments under the cutoff are discarded, the rest are opaque.
    Mask,
    Blend,
}

/// The shape of a light's falloff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Parallel rays with no falloff, like sunlight.
    Directional,
    Point,
    /// Full intensity inside `inner_cone_cos`, none outside `outer_cone_cos`.
    Spot {
        inner_cone_cos: f32,
        outer_cone_cos: f32,
    },
}

impl LightKind {
    /// Type tag read by the lighting code.
    pub fn code(self) -> i32 {
        match self {
            LightKind::Directional => 0,
            LightKind::Point => 1,
            LightKind::Spot { .. } => 2,
        }
    }
}

/// A punctual light affecting lit materials.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    /// Direction the light travels, for directional and spot lights.
    pub direction: Vec3,
    pub position: Vec3,
    /// Distance at which point and spot lights fade to nothing; 0 is unlimited.
    pub range: f32,
}

impl Light {
    fn with_kind(kind: LightKind) -> Self {
        Self {
            kind,
            color: Vec3::ONE,
            intensity: 1.0,
            direction: Vec3::NEG_Z,
            position: Vec3::ZERO,
            range: 0.0,
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            ..Self::with_kind(LightKind::Directional)
        }
    }

    pub fn point(position: Vec3) -> Self {
        Self {
            position,
            ..Self::with_kind(LightKind::Point)
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, inner_cone_cos: f32, outer_cone_cos: f32) -> Self {
        Self {
            position,
            direction: direction.normalize_or_zero(),
            ..Self::with_kind(LightKind::Spot {
                inner_cone_cos,
                outer_cone_cos,
            })
        }
    }

    pub fn color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    /// Colour scaled by intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// `(range, inner cone cos, outer cone cos, kind code)`.
    pub fn packed_params(&self) -> Vec4 {
        let (inner, outer) = match self.kind {
            LightKind::Spot {
                inner_cone_cos,
                outer_cone_cos,
            } => (inner_cone_cos, outer_cone_cos),
            _ => (1.0, -1.0),
        };
        Vec4::new(self.range, inner, outer, self.kind.code() as f32)
    }
}

/// Camera state shared by every object drawn in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneData {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub inverse_view_projection: Mat4,
    /// Last frame's view-projection, for velocity effects.
    pub previous_view_projection: Option<Mat4>,
    pub camera_position: Vec3,
    pub far: f32,
    pub exposure: f32,
    pub lights: Vec<Light>,
    /// Added to lit surfaces regardless of lights, scaled by occlusion.
    pub ambient_color: Vec3,
}

impl Default for SceneData {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
            previous_view_projection: None,
            camera_position: Vec3::ZERO,
            far: 100.0,
            exposure: 1.0,
            lights: Vec::new(),
            ambient_color: Vec3::splat(0.01),
        }
    }
}

impl SceneData {
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix(aspect);
        let view_projection = projection * view;
        Self {
            view,
            projection,
            view_projection,
            inverse_view_projection: view_projection.inverse(),
            previous_view_projection: None,
            camera_position: camera.position,
            far: camera.far,
            ..Self::default()
        }
    }

    pub fn previous(mut self, view_projection: Mat4) -> Self {
        self.previous_view_projection = Some(view_projection);
        self
    }

    pub fn exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    pub fn ambient(mut self, color: Vec3) -> Self {
        self.ambient_color = color;
        self
    }
}

/// Values that change per drawn object.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectData {
    pub world_matrix: Mat4,
    /// Skinning palette; empty for rigid objects.
    pub bone_matrices: Vec<Mat4>,
    /// Overrides for uniform nodes, keyed by the node's uniform name.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl Default for ObjectData {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl ObjectData {
    pub fn new(world_matrix: Mat4) -> Self {
        Self {
            world_matrix,
            bone_matrices: Vec::new(),
            uniforms: BTreeMap::new(),
        }
    }

    pub fn from_transform(transform: &Transform) -> Self {
        Self::new(transform.matrix())
    }

    pub fn bones(mut self, bone_matrices: Vec<Mat4>) -> Self {
        self.bone_matrices = bone_matrices;
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.into(), value.into());
        self
    }
}

/// A drawable mesh as far as a shader program cares.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub layout: VertexLayout,
    /// Textures by material slot (`baseColor`, `normal`, ...).
    pub textures: BTreeMap<String, TextureId>,
    /// Overrides the output node's alpha mode when set.
    pub alpha_mode: Option<AlphaMode>,
    pub index_count: u32,
}

impl MeshData {
    pub fn new(name: impl Into<String>, layout: VertexLayout) -> Self {
        Self {
            name: name.into(),
            layout,
            ..Default::default()
        }
    }

    pub fn texture(mut self, slot: impl Into<String>, texture: TextureId) -> Self {
        self.textures.insert(slot.into(), texture);
        self
    }

    pub fn alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = Some(mode);
        self
    }

    pub fn index_count(mut self, count: u32) -> Self {
        self.index_count = count;
        self
    }
}
