//! A graph bound to a target, compiled through a [`ShaderBackend`].
//!
//! [`ShaderProgram::build`] regenerates both stages, compiles and links them,
//! and on success swaps the new program in and lets every node push its
//! initial uniforms. When the driver rejects the text, the errors are logged
//! next to line-numbered sources and the previously linked program, if any,
//! stays in place.
//!
//! # Example
//!
//! ```ignore
//! let mut program = ShaderProgram::new(ShaderTarget::gl_core(330));
//! let vertex = program.add_node(VertexNode::default());
//! let camera = program.add_node(CameraDataNode);
//! let output = program.add_node(OutputNode::default());
//! program.set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))?;
//! program.set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))?;
//!
//! if program.build(&mut backend)? {
//!     program.prepare_scene(&mut backend, &scene);
//!     program.prepare_object(&mut backend, &object);
//!     program.draw(&mut backend, &mesh);
//! }
//! ```

use std::collections::HashMap;
use std::fmt::Write;

use crate::assembler::{BuildLayout, assemble, numerate_lines};
use crate::backend::{ActiveVariable, ProgramHandle, ShaderBackend, StageHandle};
use crate::error::{AuthoringError, BuildError};
use crate::graph::ShaderGraph;
use crate::node::{BindContext, NodeId, ShaderNode};
use crate::port::PortRef;
use crate::render_data::{MeshData, ObjectData, SceneData};
use crate::target::ShaderTarget;
use crate::types::Stage;

/// Driver objects and build results of the last successful link.
#[derive(Debug)]
struct CompiledProgram {
    handle: ProgramHandle,
    layout: BuildLayout,
    attributes: Vec<ActiveVariable>,
    uniforms: HashMap<String, i32>,
}

/// A shader graph plus the program compiled from it.
#[derive(Debug)]
pub struct ShaderProgram {
    graph: ShaderGraph,
    target: ShaderTarget,
    vertex_source: String,
    fragment_source: String,
    compiled: Option<CompiledProgram>,
    is_compiled: bool,
    log: String,
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self::new(ShaderTarget::default())
    }
}

impl ShaderProgram {
    pub fn new(target: ShaderTarget) -> Self {
        Self::from_graph(ShaderGraph::new(), target)
    }

    pub fn from_graph(graph: ShaderGraph, target: ShaderTarget) -> Self {
        Self {
            graph,
            target,
            vertex_source: String::new(),
            fragment_source: String::new(),
            compiled: None,
            is_compiled: false,
            log: String::new(),
        }
    }

    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }

    /// Edits take effect on the next [`build`](Self::build).
    pub fn graph_mut(&mut self) -> &mut ShaderGraph {
        &mut self.graph
    }

    pub fn add_node<N: ShaderNode>(&mut self, node: N) -> NodeId {
        self.graph.add_node(node)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<Box<dyn ShaderNode>, AuthoringError> {
        self.graph.remove_node(id)
    }

    pub fn set_input(
        &mut self,
        node: NodeId,
        name: &str,
        source: impl Into<PortRef>,
    ) -> Result<(), AuthoringError> {
        self.graph.set_input(node, name, source)
    }

    pub fn clear_input(&mut self, node: NodeId, name: &str) -> Result<Option<PortRef>, AuthoringError> {
        self.graph.clear_input(node, name)
    }

    pub fn node<N: ShaderNode>(&self, id: NodeId) -> Option<&N> {
        self.graph.node(id)
    }

    pub fn node_mut<N: ShaderNode>(&mut self, id: NodeId) -> Option<&mut N> {
        self.graph.node_mut(id)
    }

    pub fn target(&self) -> &ShaderTarget {
        &self.target
    }

    /// Takes effect on the next [`build`](Self::build).
    pub fn set_target(&mut self, target: ShaderTarget) {
        self.target = target;
    }

    /// Generates, compiles and links both stages.
    ///
    /// Returns `Ok(false)` when the driver rejects the generated text; the
    /// reason is in [`log`](Self::log) and the previous program is kept.
    /// Errors are reserved for broken graphs and backends that cannot create
    /// objects.
    pub fn build(&mut self, backend: &mut dyn ShaderBackend) -> Result<bool, BuildError> {
        let generated = assemble(&self.graph, &self.target)?;
        self.vertex_source = generated.vertex;
        self.fragment_source = generated.fragment;

        let vertex = backend.create_shader_stage(Stage::Vertex)?;
        let fragment = match backend.create_shader_stage(Stage::Fragment) {
            Ok(fragment) => fragment,
            Err(err) => {
                backend.delete_shader_stage(vertex);
                return Err(err.into());
            }
        };
        let stages = [
            (Stage::Vertex, vertex, &self.vertex_source),
            (Stage::Fragment, fragment, &self.fragment_source),
        ];

        let mut log = String::new();
        for (stage, handle, source) in stages {
            if !backend.compile(handle, source) {
                writeln!(log, "{stage} stage:\n{}", backend.shader_log(handle))?;
            }
        }
        if !log.is_empty() {
            delete_stages(backend, &[vertex, fragment]);
            self.fail(log);
            return Ok(false);
        }

        let handle = match backend.create_program() {
            Ok(handle) => handle,
            Err(err) => {
                delete_stages(backend, &[vertex, fragment]);
                return Err(err.into());
            }
        };
        backend.attach(handle, vertex);
        backend.attach(handle, fragment);
        let linked = backend.link(handle);
        backend.detach(handle, vertex);
        backend.detach(handle, fragment);
        delete_stages(backend, &[vertex, fragment]);

        if !linked {
            let log = format!("link:\n{}", backend.program_log(handle));
            backend.delete_program(handle);
            self.fail(log);
            return Ok(false);
        }

        let attributes = backend.active_attributes(handle);
        let uniforms = backend
            .active_uniforms(handle)
            .into_iter()
            .map(|u| (u.name, u.location))
            .collect::<HashMap<_, _>>();
        log::debug!(
            "linked program {:?}: {} active attributes, {} active uniforms",
            handle,
            attributes.len(),
            uniforms.len()
        );

        if let Some(previous) = self.compiled.take() {
            backend.delete_program(previous.handle);
        }
        self.compiled = Some(CompiledProgram {
            handle,
            layout: generated.layout,
            attributes,
            uniforms,
        });
        self.is_compiled = true;
        self.log.clear();

        backend.use_program(handle);
        self.for_each_node(backend, |node, cx| node.shader_compiled(cx));
        Ok(true)
    }

    fn fail(&mut self, log: String) {
        log::error!(
            "==== Errors in shader ====\n{log}\n{}",
            self.source_code()
        );
        self.is_compiled = false;
        self.log = log;
    }

    /// Runs `f` on every node of the last successful build, in emission order.
    fn for_each_node(
        &self,
        backend: &mut dyn ShaderBackend,
        mut f: impl FnMut(&dyn ShaderNode, &mut BindContext<'_>),
    ) -> bool {
        let Some(compiled) = &self.compiled else {
            return false;
        };
        for id in &compiled.layout.order {
            let (Some(node), Some(layout)) = (self.graph.dyn_node(*id), compiled.layout.node(*id))
            else {
                continue;
            };
            let mut cx = BindContext {
                backend: &mut *backend,
                program: compiled.handle,
                uniforms: &compiled.uniforms,
                uid: layout.uid,
                ports: &layout.ports,
                texture_units: &layout.texture_units,
            };
            f(node, &mut cx);
        }
        true
    }

    /// Makes the linked program current. Returns false if nothing was ever linked.
    pub fn bind(&self, backend: &mut dyn ShaderBackend) -> bool {
        match &self.compiled {
            Some(compiled) => {
                backend.use_program(compiled.handle);
                true
            }
            None => false,
        }
    }

    /// Pushes per-frame camera values.
    pub fn prepare_scene(&self, backend: &mut dyn ShaderBackend, scene: &SceneData) -> bool {
        self.for_each_node(backend, |node, cx| node.prepare_scene_data(cx, scene))
    }

    /// Pushes per-object values such as the world matrix.
    pub fn prepare_object(&self, backend: &mut dyn ShaderBackend, object: &ObjectData) -> bool {
        self.for_each_node(backend, |node, cx| node.prepare_object_data(cx, object))
    }

    /// Enables the mesh attributes the program reads, then lets nodes bind
    /// textures and render state.
    pub fn prepare_mesh(&self, backend: &mut dyn ShaderBackend, mesh: &MeshData) -> bool {
        let Some(compiled) = &self.compiled else {
            return false;
        };
        for active in &compiled.attributes {
            match mesh.layout.get(&active.name) {
                Some(attribute) => {
                    backend.enable_vertex_attribute(active.location, attribute, mesh.layout.stride)
                }
                None => log::warn!(
                    "mesh `{}` has no `{}` attribute required by the program",
                    mesh.name,
                    active.name
                ),
            }
        }
        self.for_each_node(backend, |node, cx| node.prepare_to_draw_mesh(cx, mesh))
    }

    /// Prepares `mesh` and issues its draw call.
    pub fn draw(&self, backend: &mut dyn ShaderBackend, mesh: &MeshData) -> bool {
        if !self.prepare_mesh(backend, mesh) {
            return false;
        }
        backend.draw_mesh(mesh);
        true
    }

    /// Releases the linked program.
    pub fn destroy(&mut self, backend: &mut dyn ShaderBackend) {
        if let Some(compiled) = self.compiled.take() {
            backend.delete_program(compiled.handle);
        }
        self.is_compiled = false;
    }

    /// Whether the most recent build linked.
    pub fn is_compiled(&self) -> bool {
        self.is_compiled
    }

    /// Compiler or linker output of the most recent failed build.
    pub fn log(&self) -> &str {
        &self.log
    }

    /// The program currently in use, possibly from an earlier build.
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.compiled.as_ref().map(|c| c.handle)
    }

    /// Uids, usage and texture units of the linked program.
    pub fn layout(&self) -> Option<&BuildLayout> {
        self.compiled.as_ref().map(|c| &c.layout)
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Both stages of the last build with line numbers.
    pub fn source_code(&self) -> String {
        let mut out = numerate_lines("=== VERTEX ===\n", &self.vertex_source);
        out.push_str(&numerate_lines("=== FRAGMENT ===\n", &self.fragment_source));
        out
    }
}

fn delete_stages(backend: &mut dyn ShaderBackend, stages: &[StageHandle]) {
    for stage in stages {
        backend.delete_shader_stage(*stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CullFace, HeadlessBackend, UniformValue};
    use crate::mesh::Vertex3d;
    use crate::nodes::{
        CameraDataNode, OperationNode, OutputNode, TextureNode, UniformNode, VertexAttributeNode,
        VertexNode,
    };
    use crate::port::Literal;
    use crate::render_data::TextureId;
    use crate::types::GlslType;
    use glam::{Mat4, Vec3, Vec4};
    use std::collections::BTreeSet;

    /// vertex -> camera -> output position, uv -> texture -> output colour.
    fn textured(target: ShaderTarget) -> (ShaderProgram, NodeId, NodeId) {
        let mut program = ShaderProgram::new(target);
        let vertex = program.add_node(VertexNode::default());
        let camera = program.add_node(CameraDataNode);
        let uv = program.add_node(VertexAttributeNode::default());
        let texture = program.add_node(TextureNode::default());
        let output = program.add_node(OutputNode::default());
        program
            .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
            .unwrap();
        program
            .set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))
            .unwrap();
        program.set_input(texture, "uv", uv.output(VertexAttributeNode::VALUE)).unwrap();
        program
            .set_input(output, "fragColor", texture.output(TextureNode::COLOR))
            .unwrap();
        (program, texture, output)
    }

    /// `"<type> <name>"` of every file-scope declaration starting with `keyword`.
    fn interface(source: &str, keyword: &str) -> BTreeSet<String> {
        source
            .lines()
            .filter_map(|l| l.strip_prefix(keyword))
            .map(|l| l.trim_end_matches(';').to_string())
            .collect()
    }

    /// Tangent frame, depth, a forwarded vertex operation and the far fade,
    /// all feeding one fragment colour.
    fn many_varyings(target: ShaderTarget) -> ShaderProgram {
        let mut program = ShaderProgram::new(target);
        let vertex = program.add_node(VertexNode::default());
        let camera = program.add_node(CameraDataNode);
        let bent = program.add_node(OperationNode::new("arg1 * vec3(0.0, 0.0, 1.0)", GlslType::Vec3, 1));
        let shade = program.add_node(
            OperationNode::new("arg1 * arg2", GlslType::Vec3, 2)
                .stage(Stage::Vertex)
                .varying(true),
        );
        let mix = program.add_node(OperationNode::new(
            "vec4(arg1 + arg2, 1.0 - arg3 * 0.01)",
            GlslType::Vec4,
            3,
        ));
        let output = program.add_node(OutputNode::default().fade_start(0.8));

        program
            .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
            .unwrap();
        program.set_input(bent, "arg1", vertex.output(VertexNode::TBN)).unwrap();
        program.set_input(shade, "arg1", vertex.output(VertexNode::NORMAL)).unwrap();
        program.set_input(shade, "arg2", Literal::Float(0.5)).unwrap();
        program.set_input(mix, "arg1", bent.output(OperationNode::RESULT)).unwrap();
        program.set_input(mix, "arg2", shade.output(OperationNode::RESULT)).unwrap();
        program
            .set_input(mix, "arg3", camera.output(CameraDataNode::VIEW_Z_DEPTH))
            .unwrap();
        program
            .set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))
            .unwrap();
        program.set_input(output, "fragColor", mix.output(OperationNode::RESULT)).unwrap();
        program
    }

    #[test_log::test]
    fn transform_camera_output_builds() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let vertex = program.add_node(VertexNode::default());
        let camera = program.add_node(CameraDataNode);
        let output = program.add_node(OutputNode::default());
        program
            .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
            .unwrap();
        program
            .set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))
            .unwrap();

        assert!(program.build(&mut backend).unwrap(), "{}", program.log());
        assert!(program.is_compiled());
        assert_eq!(program.fragment_source().matches("fragColor =").count(), 1);
        assert!(program.vertex_source().contains("gl_Position = clipSpacePosition11;"));
        assert_eq!(backend.current_program(), program.handle());
    }

    #[test]
    fn position_as_colour_writes_one_fragment_colour() {
        for target in [ShaderTarget::gles(100), ShaderTarget::default()] {
            let mut backend = HeadlessBackend::new();
            let mut program = ShaderProgram::new(target.clone());
            let vertex = program.add_node(VertexNode::default());
            let camera = program.add_node(CameraDataNode);
            let output = program.add_node(OutputNode::default());
            program
                .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
                .unwrap();
            program
                .set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))
                .unwrap();
            program
                .set_input(output, "fragColor", vertex.output(VertexNode::POSITION))
                .unwrap();

            assert!(program.build(&mut backend).unwrap(), "{}", program.log());
            let keywords = target.keywords();
            let fragment = program.fragment_source();
            let write = format!("{} =", keywords.frag_color);
            assert_eq!(fragment.matches(&write).count(), 1, "{fragment}");
            assert!(fragment.contains(&format!("{} = vec4(position0, 1.0);", keywords.frag_color)));
            assert!(fragment.contains(&format!("{} vec3 position0;", keywords.varying_in)));
        }
    }

    #[test]
    fn unbound_uv_samples_with_zero() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let texture = program.add_node(TextureNode::default());
        let output = program.add_node(OutputNode::default());
        program
            .set_input(output, "fragColor", texture.output(TextureNode::COLOR))
            .unwrap();

        assert!(program.build(&mut backend).unwrap());
        assert!(program.fragment_source().contains("texColor1 = texture(tex0, vec2(0.0));"));
    }

    #[test]
    fn two_textures_get_two_samplers_and_units() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let albedo = program.add_node(TextureNode::new("baseColor"));
        let detail = program.add_node(TextureNode::new("detail"));
        let mix = program.add_node(OperationNode::new("arg1 * arg2", GlslType::Vec4, 2));
        let output = program.add_node(OutputNode::default());
        program.set_input(mix, "arg1", albedo.output(TextureNode::COLOR)).unwrap();
        program.set_input(mix, "arg2", detail.output(TextureNode::COLOR)).unwrap();
        program.set_input(output, "fragColor", mix.output(OperationNode::RESULT)).unwrap();

        assert!(program.build(&mut backend).unwrap(), "{}", program.log());
        let fragment = program.fragment_source();
        assert!(fragment.contains("uniform sampler2D tex0;"));
        assert!(fragment.contains("uniform sampler2D tex3;"));

        let layout = program.layout().unwrap();
        assert_eq!(layout.node(albedo).unwrap().texture_units, vec![0]);
        assert_eq!(layout.node(detail).unwrap().texture_units, vec![1]);

        let handle = program.handle().unwrap();
        assert_eq!(backend.uniform(handle, "tex0"), Some(&UniformValue::Int(0)));
        assert_eq!(backend.uniform(handle, "tex3"), Some(&UniformValue::Int(1)));

        let mesh = MeshData::new("quad", Vertex3d::layout())
            .texture("baseColor", TextureId(4))
            .texture("detail", TextureId(9));
        assert!(program.draw(&mut backend, &mesh));
        assert_eq!(backend.bound_texture(0), Some(TextureId(4)));
        assert_eq!(backend.bound_texture(1), Some(TextureId(9)));
    }

    #[test]
    fn removing_the_only_consumer_drops_the_producer() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let texture = program.add_node(TextureNode::default());
        let output = program.add_node(OutputNode::default());
        program
            .set_input(output, "fragColor", texture.output(TextureNode::COLOR))
            .unwrap();
        assert!(program.build(&mut backend).unwrap());
        assert!(program.fragment_source().contains("tex0"));

        program.remove_node(output).unwrap();
        assert!(program.build(&mut backend).unwrap());
        assert!(!program.fragment_source().contains("tex0"));
        assert!(!program.fragment_source().contains("texColor1"));
    }

    #[test]
    fn consecutive_builds_are_identical() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap());
        let first = program.source_code();
        assert!(program.build(&mut backend).unwrap());
        assert_eq!(program.source_code(), first);
        // the first program was released when the second replaced it
        assert_eq!(backend.live_programs(), 1);
        assert_eq!(backend.live_stages(), 0);
    }

    #[test]
    fn every_fragment_input_is_a_vertex_output() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap(), "{}", program.log());

        let outputs = interface(program.vertex_source(), "out ");
        let inputs = interface(program.fragment_source(), "in ");
        assert!(!inputs.is_empty());
        for input in &inputs {
            assert!(outputs.contains(input), "`{input}` has no vertex output");
        }
    }

    #[test]
    fn varyings_pair_in_both_directions() {
        for (target, out_keyword, in_keyword) in [
            (ShaderTarget::default(), "out ", "in "),
            (ShaderTarget::gl(110), "varying ", "varying "),
        ] {
            let mut backend = HeadlessBackend::new();
            let mut program = many_varyings(target);
            assert!(program.build(&mut backend).unwrap(), "{}", program.log());

            let outputs = interface(program.vertex_source(), out_keyword);
            let inputs = interface(program.fragment_source(), in_keyword);
            for expected in [
                "mat3 tbn2",
                "float viewZDepth10",
                "vec3 op14",
                "float depthForFade5",
            ] {
                assert!(outputs.contains(expected), "`{expected}` missing from {outputs:?}");
            }
            assert_eq!(outputs, inputs);
        }
    }

    #[test]
    fn legacy_target_uses_attribute_and_varying() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::gl(110));
        assert!(program.build(&mut backend).unwrap(), "{}", program.log());

        let vertex = program.vertex_source();
        let fragment = program.fragment_source();
        assert!(vertex.starts_with("#version 110\n"));
        assert!(vertex.contains("attribute vec3 POSITION;"));
        assert!(vertex.contains("varying vec2 attr13;"));
        assert!(fragment.contains("texture2D(tex14, attr13)"));
        assert!(fragment.contains("gl_FragColor = texColor15;"));
        assert!(!fragment.contains("out vec4"));
    }

    #[test]
    fn es_target_declares_precision() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::gles(300));
        assert!(program.build(&mut backend).unwrap(), "{}", program.log());
        assert!(program.fragment_source().starts_with("#version 300 es\nprecision highp float;\n"));
    }

    #[test_log::test]
    fn failed_rebuild_keeps_previous_program() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap());
        let handle = program.handle().unwrap();

        backend.fail_compilation(Stage::Fragment, "0:12: 'texColor' : undeclared identifier");
        assert!(!program.build(&mut backend).unwrap());
        assert!(!program.is_compiled());
        assert!(program.log().contains("fragment stage"));
        assert!(program.log().contains("undeclared identifier"));
        assert_eq!(program.handle(), Some(handle));
        assert!(backend.is_program_alive(handle));
        assert_eq!(backend.live_stages(), 0);

        backend.clear_failures();
        assert!(program.build(&mut backend).unwrap());
        assert!(program.log().is_empty());
        assert!(!backend.is_program_alive(handle));
    }

    #[test]
    fn backend_without_objects_is_a_hard_error() {
        let mut backend = HeadlessBackend::new();
        backend.refuse_objects(true);
        let (mut program, _, _) = textured(ShaderTarget::default());
        let err = program.build(&mut backend).unwrap_err();
        assert!(matches!(err, BuildError::Backend(_)));
    }

    #[test]
    fn cycles_fail_the_build() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let a = program.add_node(OperationNode::default());
        let b = program.add_node(OperationNode::default());
        program.set_input(a, "arg1", b.output(OperationNode::RESULT)).unwrap();
        program.set_input(b, "arg1", a.output(OperationNode::RESULT)).unwrap();

        let err = program.build(&mut backend).unwrap_err();
        assert!(matches!(err, BuildError::Authoring(AuthoringError::Cycle { .. })));
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn render_time_values_reach_active_uniforms() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap());
        let handle = program.handle().unwrap();

        let scene = SceneData {
            view_projection: Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)),
            ..SceneData::default()
        };
        assert!(program.prepare_scene(&mut backend, &scene));
        assert_eq!(
            backend.uniform(handle, "viewProjectionMatrix4"),
            Some(&UniformValue::Mat4(scene.view_projection))
        );
        // declared nowhere, so silently skipped
        assert_eq!(backend.uniform(handle, "viewMatrix6"), None);

        let object = ObjectData::new(Mat4::from_scale(Vec3::splat(2.0)));
        assert!(program.prepare_object(&mut backend, &object));
        assert_eq!(
            backend.uniform(handle, "uWorldMatrix0"),
            Some(&UniformValue::Mat4(object.world_matrix))
        );
    }

    #[test]
    fn drawing_enables_attributes_and_state() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap());

        let mesh = MeshData::new("crate", Vertex3d::layout()).texture("baseColor", TextureId(7));
        assert!(program.draw(&mut backend, &mesh));

        let enabled: Vec<&str> = backend
            .enabled_attributes()
            .iter()
            .map(|(_, name)| name.as_str())
            .collect();
        assert!(enabled.contains(&"POSITION"));
        assert!(enabled.contains(&"TEXCOORD_0"));
        assert!(!enabled.contains(&"NORMAL"));
        assert_eq!(backend.bound_texture(0), Some(TextureId(7)));
        assert_eq!(backend.render_state().cull_face, Some(CullFace::Back));
        assert!(!backend.render_state().blending);
        assert_eq!(backend.draws(), ["crate".to_string()]);
    }

    #[test]
    fn uniform_nodes_take_object_overrides() {
        let mut backend = HeadlessBackend::new();
        let mut program = ShaderProgram::default();
        let tint = program.add_node(UniformNode::new("uTint", Literal::Vec4([1.0, 0.0, 0.0, 1.0])));
        let output = program.add_node(OutputNode::default());
        program.set_input(output, "fragColor", tint.output(UniformNode::VALUE)).unwrap();
        assert!(program.build(&mut backend).unwrap());
        let handle = program.handle().unwrap();

        assert_eq!(
            backend.uniform(handle, "uTint0"),
            Some(&UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        let object = ObjectData::default().uniform("uTint", Vec4::ONE);
        program.prepare_object(&mut backend, &object);
        assert_eq!(backend.uniform(handle, "uTint0"), Some(&UniformValue::Vec4(Vec4::ONE)));
    }

    #[test]
    fn destroy_releases_the_program() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        assert!(program.build(&mut backend).unwrap());
        program.destroy(&mut backend);
        assert_eq!(backend.live_programs(), 0);
        assert!(program.handle().is_none());
        assert!(!program.bind(&mut backend));
    }

    #[test]
    fn source_code_numbers_both_stages() {
        let mut backend = HeadlessBackend::new();
        let (mut program, _, _) = textured(ShaderTarget::default());
        program.build(&mut backend).unwrap();
        let dump = program.source_code();
        assert!(dump.starts_with("=== VERTEX ===\n1    #version 330 core\n"));
        assert!(dump.contains("=== FRAGMENT ===\n1    #version 330 core\n"));
    }
}
