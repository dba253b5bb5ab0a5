//! ECS components for drawing entities through a compiled program.
//!
//! Entities with a [`Transform`] and a [`RenderMesh`] are drawn by
//! [`draw_world`]; an optional [`Skin`] feeds the bone palette of a skinned
//! [`VertexNode`](crate::nodes::VertexNode).
//!
//! # Example
//!
//! ```ignore
//! let mut world = hecs::World::new();
//! world.spawn((
//!     Transform::new().position(Vec3::new(0.0, 0.0, -5.0)),
//!     RenderMesh::new(MeshData::new("crate", Vertex3d::layout())),
//! ));
//!
//! let drawn = draw_world(&world, &program, &mut backend, &scene);
//! ```

use glam::Mat4;

use crate::backend::ShaderBackend;
use crate::mesh::Transform;
use crate::program::ShaderProgram;
use crate::render_data::{MeshData, ObjectData, SceneData};

/// Component for drawing a mesh on an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderMesh {
    pub mesh: MeshData,
}

impl RenderMesh {
    pub fn new(mesh: MeshData) -> Self {
        Self { mesh }
    }
}

/// Bone matrices of a skinned entity, in joint order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skin {
    pub bone_matrices: Vec<Mat4>,
}

impl Skin {
    pub fn new(bone_matrices: Vec<Mat4>) -> Self {
        Self { bone_matrices }
    }
}

/// Draws every renderable entity of `world` with `program`.
///
/// Scene values are pushed once, then object and mesh values per entity.
/// Returns the number of draw calls issued, 0 when the program never linked.
pub fn draw_world(
    world: &hecs::World,
    program: &ShaderProgram,
    backend: &mut dyn ShaderBackend,
    scene: &SceneData,
) -> usize {
    if !program.bind(backend) {
        return 0;
    }
    program.prepare_scene(backend, scene);

    let mut drawn = 0;
    for (_, (transform, render, skin)) in world
        .query::<(&Transform, &RenderMesh, Option<&Skin>)>()
        .iter()
    {
        let mut object = ObjectData::from_transform(transform);
        if let Some(skin) = skin {
            object.bone_matrices = skin.bone_matrices.clone();
        }
        program.prepare_object(backend, &object);
        if program.draw(backend, &render.mesh) {
            drawn += 1;
        }
    }
    log::trace!("drew {drawn} entities");
    drawn
}
