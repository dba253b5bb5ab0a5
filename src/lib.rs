//! # nodeshade
//!
//! **Build GLSL programs out of typed shading nodes.**
//!
//! Nodes declare named inputs and typed output ports. Wire them into a
//! [`ShaderGraph`], pick a [`ShaderTarget`], and [`ShaderProgram::build`]
//! emits matching vertex and fragment sources, hands them to a
//! [`ShaderBackend`] and keeps track of which uniforms to feed at draw time.
//!
//! ## Quick Start
//!
//! ```
//! use nodeshade::*;
//!
//! let mut program = ShaderProgram::new(ShaderTarget::gl_core(330));
//! let vertex = program.add_node(VertexNode::default());
//! let camera = program.add_node(CameraDataNode);
//! let texture = program.add_node(TextureNode::default());
//! let output = program.add_node(OutputNode::default());
//!
//! program.set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION)).unwrap();
//! program.set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION)).unwrap();
//! program.set_input(output, "fragColor", texture.output(TextureNode::COLOR)).unwrap();
//!
//! let mut backend = HeadlessBackend::new();
//! assert!(program.build(&mut backend).unwrap());
//! assert!(program.fragment_source().contains("texture(tex13, vec2(0.0))"));
//! ```
//!
//! ## Pipeline
//!
//! - **Ports** carry a type, a scope and a semantic; [`Value`] coerces them
//!   to whatever arity a consumer asks for.
//! - **Scheduling** orders nodes so producers are emitted before consumers.
//! - **Dead code** never reaches the output: ports nobody reads emit nothing.
//! - **Binding** pushes scene, object and mesh data into the active uniforms
//!   of the last successfully linked program.

mod assembler;
mod backend;
mod camera;
mod description;
mod ecs;
mod error;
mod graph;
mod mesh;
mod node;
pub mod nodes;
mod port;
mod program;
mod render_data;
mod scheduler;
mod target;
mod types;

pub use assembler::{BuildLayout, GeneratedSource, NodeLayout, assemble, numerate_lines};
pub use backend::{
    ActiveVariable, BackendError, CullFace, HeadlessBackend, ProgramHandle, RenderState,
    ShaderBackend, StageHandle, UniformValue,
};
pub use camera::Camera;
pub use description::{
    DescriptionError, GraphDescription, InputDescription, NodeDescription, NodeRegistry,
};
pub use error::{AuthoringError, BuildError};
pub use graph::ShaderGraph;
pub use mesh::{Transform, Vertex3d, VertexAttribute, VertexLayout, attribute};
pub use node::{AsAny, BindContext, EmitContext, InputSlot, NodeId, PrepareContext, ShaderNode};
pub use nodes::{
    CameraDataNode, NormalMapNode, OperationNode, OutputNode, PbrNode, TextureNode, ToneMapMode,
    ToneMapNode, UniformNode, VertexAttributeNode, VertexNode,
};
pub use port::{Literal, Port, PortRef, Value, format_float};
pub use program::ShaderProgram;
pub use render_data::{AlphaMode, Light, LightKind, MeshData, ObjectData, SceneData, TextureId};
pub use scheduler::{node_depths, schedule};
pub use target::{Keywords, Precision, ShaderTarget};
pub use types::{GlslType, Scope, Semantic, Stage};

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

// ECS support
pub use ecs::{RenderMesh, Skin, draw_world};
pub use hecs::{Entity, World};
