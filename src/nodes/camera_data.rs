use std::fmt::{self, Write};

use crate::node::{BindContext, EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, Port};
use crate::render_data::SceneData;
use crate::types::{GlslType, Scope, Semantic};

/// Camera matrices as uniforms, plus positions derived from them.
///
/// `vertexPosition` is the world-space position to project, usually
/// [`VertexNode::POSITION`](crate::nodes::VertexNode::POSITION).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraDataNode;

impl CameraDataNode {
    pub const CAMERA_POSITION: usize = 0;
    pub const VIEW_PROJECTION: usize = 1;
    pub const PREVIOUS_VIEW_PROJECTION: usize = 2;
    pub const VIEW_MATRIX: usize = 3;
    pub const PROJECTION_MATRIX: usize = 4;
    pub const INVERSE_VIEW_PROJECTION: usize = 5;
    /// Unit vector from the fragment towards the camera.
    pub const NORMALIZED_VIEW_VECTOR: usize = 6;
    /// Non-normalized clip-space depth.
    pub const VIEW_Z_DEPTH: usize = 7;
    /// `viewProjection * position`.
    pub const CLIP_SPACE_POSITION: usize = 8;
    /// `view * position`.
    pub const VIEW_SPACE_POSITION: usize = 9;

    const UNIFORMS: [usize; 6] = [
        Self::CAMERA_POSITION,
        Self::VIEW_PROJECTION,
        Self::PREVIOUS_VIEW_PROJECTION,
        Self::VIEW_MATRIX,
        Self::PROJECTION_MATRIX,
        Self::INVERSE_VIEW_PROJECTION,
    ];
}

impl ShaderNode for CameraDataNode {
    fn class_id(&self) -> &'static str {
        "cameraData"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("vertexPosition", GlslType::Vec3, Literal::ZERO)]
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("cameraPosition", GlslType::Vec3)
                .scope(Scope::Uniform)
                .semantic(Semantic::Point),
            Port::new("viewProjectionMatrix", GlslType::Mat4).scope(Scope::Uniform),
            Port::new("prevViewProjectionMatrix", GlslType::Mat4).scope(Scope::Uniform),
            Port::new("viewMatrix", GlslType::Mat4).scope(Scope::Uniform),
            Port::new("projectionMatrix", GlslType::Mat4).scope(Scope::Uniform),
            Port::new("inverseViewProjectionMatrix", GlslType::Mat4).scope(Scope::Uniform),
            Port::new("normalizedViewVector", GlslType::Vec3)
                .scope(Scope::Local)
                .semantic(Semantic::Direction),
            Port::new("viewZDepth", GlslType::Float).scope(Scope::VaryingOut),
            Port::new("clipSpacePosition", GlslType::Vec4)
                .scope(Scope::VaryingOut)
                .semantic(Semantic::Point),
            Port::new("viewSpacePosition", GlslType::Vec4)
                .scope(Scope::VaryingOut)
                .semantic(Semantic::Point),
        ]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        let clip = cx.is_used(Self::CLIP_SPACE_POSITION) || cx.is_used(Self::VIEW_Z_DEPTH);
        let view_space = cx.is_used(Self::VIEW_SPACE_POSITION);

        for index in Self::UNIFORMS {
            let needed = cx.is_used(index)
                || (index == Self::VIEW_PROJECTION && clip)
                || (index == Self::VIEW_MATRIX && view_space);
            if needed {
                writeln!(out, "uniform {};", cx.port(index).typed_ref())?;
            }
        }

        let varying_out = cx.keywords().varying_out;
        if cx.is_used(Self::CLIP_SPACE_POSITION) {
            writeln!(out, "{varying_out} {};", cx.port(Self::CLIP_SPACE_POSITION).typed_ref())?;
        }
        if cx.is_used(Self::VIEW_Z_DEPTH) {
            writeln!(out, "{varying_out} {};", cx.port(Self::VIEW_Z_DEPTH).typed_ref())?;
        }
        if view_space {
            writeln!(out, "{varying_out} {};", cx.port(Self::VIEW_SPACE_POSITION).typed_ref())?;
        }
        Ok(())
    }

    fn execution_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        let position = cx.input("vertexPosition").as_vec3();

        if cx.is_used(Self::CLIP_SPACE_POSITION) || cx.is_used(Self::VIEW_Z_DEPTH) {
            // depth alone keeps the clip position local to the vertex stage
            let (clip, assigned) = if cx.is_used(Self::CLIP_SPACE_POSITION) {
                let clip = cx.port(Self::CLIP_SPACE_POSITION).reference();
                (clip.clone(), clip)
            } else {
                let clip = format!("clip{}", cx.uid());
                (clip.clone(), format!("vec4 {clip}"))
            };
            writeln!(
                out,
                "{assigned} = {} * vec4({position}, 1.0);",
                cx.port(Self::VIEW_PROJECTION).reference()
            )?;
            if cx.is_used(Self::VIEW_Z_DEPTH) {
                writeln!(out, "{} = {clip}.z;", cx.port(Self::VIEW_Z_DEPTH).reference())?;
            }
        }
        if cx.is_used(Self::VIEW_SPACE_POSITION) {
            writeln!(
                out,
                "{} = {} * vec4({position}, 1.0);",
                cx.port(Self::VIEW_SPACE_POSITION).reference(),
                cx.port(Self::VIEW_MATRIX).reference()
            )?;
        }
        Ok(())
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        let view_vector = cx.is_used(Self::NORMALIZED_VIEW_VECTOR);
        for index in Self::UNIFORMS {
            if cx.is_used(index) || (index == Self::CAMERA_POSITION && view_vector) {
                writeln!(out, "uniform {};", cx.port(index).typed_ref())?;
            }
        }

        let varying_in = cx.keywords().varying_in;
        for index in [
            Self::CLIP_SPACE_POSITION,
            Self::VIEW_Z_DEPTH,
            Self::VIEW_SPACE_POSITION,
        ] {
            if cx.is_used(index) {
                writeln!(out, "{varying_in} {};", cx.port(index).typed_ref())?;
            }
        }
        Ok(())
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::NORMALIZED_VIEW_VECTOR) {
            writeln!(
                out,
                "{} = normalize({} - {});",
                cx.port(Self::NORMALIZED_VIEW_VECTOR).typed_ref(),
                cx.port(Self::CAMERA_POSITION).reference(),
                cx.input("vertexPosition").as_vec3()
            )?;
        }
        Ok(())
    }

    fn prepare_scene_data(&self, cx: &mut BindContext<'_>, scene: &SceneData) {
        cx.set_port(Self::CAMERA_POSITION, scene.camera_position);
        cx.set_port(Self::VIEW_PROJECTION, scene.view_projection);
        cx.set_port(
            Self::PREVIOUS_VIEW_PROJECTION,
            scene.previous_view_projection.unwrap_or(scene.view_projection),
        );
        cx.set_port(Self::VIEW_MATRIX, scene.view);
        cx.set_port(Self::PROJECTION_MATRIX, scene.projection);
        cx.set_port(Self::INVERSE_VIEW_PROJECTION, scene.inverse_view_projection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShaderGraph;
    use crate::nodes::VertexNode;
    use crate::nodes::test_support::{build, consume};

    fn camera_graph(output: usize) -> ShaderGraph {
        let mut graph = ShaderGraph::new();
        let vertex = graph.add_node(VertexNode::default());
        let camera = graph.add_node(CameraDataNode);
        graph
            .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
            .unwrap();
        consume(&mut graph, camera.output(output));
        graph
    }

    #[test]
    fn clip_position_needs_only_view_projection() {
        let graph = camera_graph(CameraDataNode::CLIP_SPACE_POSITION);
        let (vertex, _) = build(&graph);
        // vertex node ports take uids 0..=2, camera ports start at 3
        assert!(vertex.contains("uniform mat4 viewProjectionMatrix4;"));
        assert!(vertex.contains("out vec4 clipSpacePosition11;"));
        assert!(vertex.contains("clipSpacePosition11 = viewProjectionMatrix4 * vec4(position0, 1.0);"));
        assert!(!vertex.contains("viewMatrix6"));
        assert!(!vertex.contains("cameraPosition3"));
    }

    #[test]
    fn depth_alone_keeps_clip_position_local() {
        let graph = camera_graph(CameraDataNode::VIEW_Z_DEPTH);
        let (vertex, fragment) = build(&graph);
        assert!(vertex.contains("vec4 clip1 = viewProjectionMatrix4 * vec4(position0, 1.0);"));
        assert!(vertex.contains("out float viewZDepth10;"));
        assert!(vertex.contains("viewZDepth10 = clip1.z;"));
        assert!(!vertex.contains("clipSpacePosition11"));
        assert!(fragment.contains("in float viewZDepth10;"));
    }

    #[test]
    fn view_vector_is_computed_per_fragment() {
        let graph = camera_graph(CameraDataNode::NORMALIZED_VIEW_VECTOR);
        let (vertex, fragment) = build(&graph);
        assert!(fragment.contains("uniform vec3 cameraPosition3;"));
        assert!(fragment.contains("vec3 normalizedViewVector9 = normalize(cameraPosition3 - position0);"));
        assert!(!vertex.contains("cameraPosition3"));
    }
}
