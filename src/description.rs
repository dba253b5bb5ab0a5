//! JSON graph descriptions and the registry that turns class ids into nodes.
//!
//! A description lists nodes in order; inputs refer to other nodes by their
//! position in that list. Parameters are whatever the node's
//! [`save_params`](crate::ShaderNode::save_params) produces.
//!
//! ```json
//! {
//!   "target": { "version": 330, "profile": "core" },
//!   "nodes": [
//!     { "classId": "vertex" },
//!     { "classId": "cameraData", "inputs": { "vertexPosition": { "node": 0, "port": 0 } } },
//!     { "classId": "output",
//!       "inputs": { "vertPosition": { "node": 1, "port": 8 }, "fragColor": { "vec4": [1, 0, 0, 1] } } }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AuthoringError;
use crate::graph::ShaderGraph;
use crate::node::{NodeId, ShaderNode};
use crate::nodes::{
    CameraDataNode, NormalMapNode, OperationNode, OutputNode, PbrNode, TextureNode, ToneMapNode,
    UniformNode, VertexAttributeNode, VertexNode,
};
use crate::port::{Literal, PortRef};
use crate::program::ShaderProgram;
use crate::target::ShaderTarget;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("invalid graph description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid parameters for node {index} (`{class_id}`): {source}")]
    Params {
        index: usize,
        class_id: String,
        source: serde_json::Error,
    },

    #[error("node {index} reads from node {node}, which is not in the description")]
    UnknownNodeIndex { index: usize, node: usize },

    #[error(transparent)]
    Authoring(#[from] AuthoringError),
}

/// A whole graph plus the target it is meant for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDescription {
    #[serde(default)]
    pub target: ShaderTarget,
    pub nodes: Vec<NodeDescription>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    pub class_id: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputDescription>,
}

/// What an input is bound to: another node's output or a constant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputDescription {
    Port { node: usize, port: usize },
    Literal(Literal),
}

type NodeFactory = fn() -> Box<dyn ShaderNode>;

/// Node constructors keyed by class id.
#[derive(Clone, Debug)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("vertex", || Box::new(VertexNode::default()));
        registry.register("cameraData", || Box::new(CameraDataNode));
        registry.register("vertexAttribute", || Box::new(VertexAttributeNode::default()));
        registry.register("texture", || Box::new(TextureNode::default()));
        registry.register("uniform", || Box::new(UniformNode::default()));
        registry.register("operation", || Box::new(OperationNode::default()));
        registry.register("normalMap", || Box::new(NormalMapNode));
        registry.register("pbr", || Box::new(PbrNode::default()));
        registry.register("toneMap", || Box::new(ToneMapNode::default()));
        registry.register("output", || Box::new(OutputNode::default()));
        registry
    }
}

impl NodeRegistry {
    /// A registry with every built-in node.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds or replaces the constructor for `class_id`.
    pub fn register(&mut self, class_id: impl Into<String>, factory: NodeFactory) {
        self.factories.insert(class_id.into(), factory);
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.factories.contains_key(class_id)
    }

    /// A node of `class_id` with default parameters.
    pub fn create(&self, class_id: &str) -> Result<Box<dyn ShaderNode>, AuthoringError> {
        self.factories
            .get(class_id)
            .map(|factory| factory())
            .ok_or_else(|| AuthoringError::UnknownClass(class_id.to_string()))
    }
}

impl GraphDescription {
    pub fn from_json(json: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DescriptionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Instantiates and wires every node.
    pub fn to_graph(&self, registry: &NodeRegistry) -> Result<ShaderGraph, DescriptionError> {
        let mut graph = ShaderGraph::new();
        let mut ids = Vec::with_capacity(self.nodes.len());

        for (index, description) in self.nodes.iter().enumerate() {
            let mut node = registry.create(&description.class_id)?;
            if !description.params.is_null() {
                node.load_params(description.params.clone())
                    .map_err(|source| DescriptionError::Params {
                        index,
                        class_id: description.class_id.clone(),
                        source,
                    })?;
            }
            ids.push(graph.add_boxed(node));
        }

        for (index, description) in self.nodes.iter().enumerate() {
            for (name, input) in &description.inputs {
                let source = match *input {
                    InputDescription::Port { node, port } => ids
                        .get(node)
                        .ok_or(DescriptionError::UnknownNodeIndex { index, node })?
                        .output(port),
                    InputDescription::Literal(literal) => PortRef::Literal(literal),
                };
                graph.set_input(ids[index], name, source)?;
            }
        }

        log::debug!("loaded graph description with {} nodes", ids.len());
        Ok(graph)
    }

    pub fn into_program(self, registry: &NodeRegistry) -> Result<ShaderProgram, DescriptionError> {
        let graph = self.to_graph(registry)?;
        Ok(ShaderProgram::from_graph(graph, self.target))
    }

    /// Describes `graph`; removed nodes are skipped and the rest renumbered.
    pub fn from_graph(graph: &ShaderGraph, target: &ShaderTarget) -> Result<Self, DescriptionError> {
        let indices: HashMap<NodeId, usize> = graph
            .node_ids()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let mut nodes = Vec::with_capacity(indices.len());
        for (index, (_, node, bound)) in graph.iter().enumerate() {
            let params = node.save_params().map_err(|source| DescriptionError::Params {
                index,
                class_id: node.class_id().to_string(),
                source,
            })?;

            let mut inputs = BTreeMap::new();
            for (name, source) in bound {
                let input = match *source {
                    PortRef::Output { node, port } => match indices.get(&node) {
                        Some(&node) => InputDescription::Port { node, port },
                        None => continue,
                    },
                    PortRef::Literal(literal) => InputDescription::Literal(literal),
                };
                inputs.insert(name.clone(), input);
            }

            nodes.push(NodeDescription {
                class_id: node.class_id().to_string(),
                params,
                inputs,
            });
        }

        Ok(Self {
            target: target.clone(),
            nodes,
        })
    }

    pub fn from_program(program: &ShaderProgram) -> Result<Self, DescriptionError> {
        Self::from_graph(program.graph(), program.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::nodes::ToneMapMode;

    const TEXTURED: &str = include_str!("../demos/textured.json");
    const LIT: &str = include_str!("../demos/lit.json");

    #[test]
    fn demo_graph_builds() {
        let description = GraphDescription::from_json(TEXTURED).unwrap();
        let mut program = description.into_program(&NodeRegistry::new()).unwrap();
        let mut backend = HeadlessBackend::new();
        assert!(program.build(&mut backend).unwrap(), "{}", program.log());
        assert!(program.fragment_source().contains("toneMap"));
    }

    #[test]
    fn lit_demo_builds_with_lighting() {
        let description = GraphDescription::from_json(LIT).unwrap();
        let mut program = description.into_program(&NodeRegistry::new()).unwrap();
        let mut backend = HeadlessBackend::new();
        assert!(program.build(&mut backend).unwrap(), "{}", program.log());

        let fragment = program.fragment_source();
        assert!(fragment.contains("uniform vec3 uLightRadiance6[4];"));
        assert!(fragment.contains("normalize(tbn2 * tangentNormal5)"));
        assert!(fragment.contains("toneMap7("));

        let saved = GraphDescription::from_program(&program).unwrap();
        assert_eq!(saved.nodes[5].params, serde_json::Value::Null);
        assert_eq!(saved.nodes[6].params, serde_json::json!({ "maxLights": 4 }));
    }

    #[test]
    fn descriptions_round_trip_through_programs() {
        let description = GraphDescription::from_json(TEXTURED).unwrap();
        let program = description.clone().into_program(&NodeRegistry::new()).unwrap();
        let saved = GraphDescription::from_program(&program).unwrap();

        let reloaded = saved.clone().into_program(&NodeRegistry::new()).unwrap();
        assert_eq!(GraphDescription::from_program(&reloaded).unwrap(), saved);
        assert_eq!(saved.nodes.len(), description.nodes.len());
        assert_eq!(saved.target, description.target);
    }

    #[test]
    fn params_are_applied() {
        let json = r#"{ "nodes": [ { "classId": "toneMap", "params": { "mode": "Uncharted" } } ] }"#;
        let program = GraphDescription::from_json(json)
            .unwrap()
            .into_program(&NodeRegistry::new())
            .unwrap();
        let id = program.graph().node_ids().next().unwrap();
        assert_eq!(
            program.node::<ToneMapNode>(id).unwrap().mode,
            ToneMapMode::Uncharted
        );
        assert_eq!(*program.target(), ShaderTarget::default());
    }

    #[test]
    fn literal_and_port_inputs_are_told_apart() {
        let json = r#"{ "node": 2, "port": 1 }"#;
        let input: InputDescription = serde_json::from_str(json).unwrap();
        assert_eq!(input, InputDescription::Port { node: 2, port: 1 });

        let input: InputDescription = serde_json::from_str(r#"{ "float": 0.5 }"#).unwrap();
        assert_eq!(input, InputDescription::Literal(Literal::Float(0.5)));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let json = r#"{ "nodes": [ { "classId": "bloom" } ] }"#;
        let err = GraphDescription::from_json(json)
            .unwrap()
            .to_graph(&NodeRegistry::new())
            .unwrap_err();
        assert!(matches!(
            err,
            DescriptionError::Authoring(AuthoringError::UnknownClass(ref class)) if class == "bloom"
        ));
    }

    #[test]
    fn dangling_node_index_is_rejected() {
        let json = r#"{ "nodes": [ { "classId": "output", "inputs": { "fragColor": { "node": 5, "port": 0 } } } ] }"#;
        let err = GraphDescription::from_json(json)
            .unwrap()
            .to_graph(&NodeRegistry::new())
            .unwrap_err();
        assert!(matches!(err, DescriptionError::UnknownNodeIndex { index: 0, node: 5 }));
    }

    #[test]
    fn bad_params_name_the_node() {
        let json = r#"{ "nodes": [ { "classId": "vertex" }, { "classId": "toneMap", "params": { "mode": "Filmic" } } ] }"#;
        let err = GraphDescription::from_json(json)
            .unwrap()
            .to_graph(&NodeRegistry::new())
            .unwrap_err();
        assert!(matches!(err, DescriptionError::Params { index: 1, .. }));
    }

    #[test]
    fn removed_nodes_are_renumbered() {
        let mut graph = ShaderGraph::new();
        let scratch = graph.add_node(OperationNode::default());
        let texture = graph.add_node(TextureNode::default());
        let output = graph.add_node(OutputNode::default());
        graph.set_input(output, "fragColor", texture.output(TextureNode::COLOR)).unwrap();
        graph.remove_node(scratch).unwrap();

        let description = GraphDescription::from_graph(&graph, &ShaderTarget::default()).unwrap();
        assert_eq!(description.nodes.len(), 2);
        assert_eq!(
            description.nodes[1].inputs["fragColor"],
            InputDescription::Port { node: 0, port: TextureNode::COLOR }
        );
    }

    #[test]
    fn lighting_nodes_are_registered() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.create("pbr").unwrap().class_id(), "pbr");
        assert_eq!(registry.create("normalMap").unwrap().class_id(), "normalMap");
    }

    #[test]
    fn custom_classes_can_be_registered() {
        let mut registry = NodeRegistry::empty();
        assert!(registry.create("vertex").is_err());
        registry.register("vertex", || Box::new(VertexNode::skinned(8, 1)));
        assert!(registry.contains("vertex"));
        assert_eq!(registry.create("vertex").unwrap().class_id(), "vertex");
    }
}
