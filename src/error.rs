use thiserror::Error;

use crate::backend::BackendError;
use crate::node::NodeId;
use crate::types::GlslType;

/// A mistake in how a graph was put together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthoringError {
    #[error("node {0} does not exist in this graph")]
    UnknownNode(NodeId),

    #[error("node `{class_id}` has no input named `{input}`")]
    UnknownInput { class_id: String, input: String },

    #[error("node `{class_id}` has no output at index {index}")]
    UnknownOutput { class_id: String, index: usize },

    #[error("node `{class_id}` cannot read its own output")]
    SelfBinding { class_id: String },

    #[error("input `{input}` of `{class_id}` expects {expected}, got {found}")]
    IncompatibleType {
        class_id: String,
        input: String,
        expected: GlslType,
        found: GlslType,
    },

    #[error("input `{input}` of `{class_id}` is bound to a NaN or infinite literal")]
    NonFiniteLiteral { class_id: String, input: String },

    #[error("dependency cycle through node {node} (`{class_id}`)")]
    Cycle { node: NodeId, class_id: String },

    #[error("unknown node class `{0}`")]
    UnknownClass(String),
}

/// A build that could not produce or hand over shader text at all.
///
/// Compiler and linker rejections are not errors here; they leave the program
/// uncompiled with a log (see [`ShaderProgram::build`](crate::ShaderProgram::build)).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),

    #[error("shader backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to write shader source")]
    Codegen(#[from] std::fmt::Error),
}
