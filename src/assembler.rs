//! Turns a graph into vertex and fragment source text.
//!
//! Assembly runs in a fixed sequence:
//!
//! 1. Every output port gets a fresh `uid` in node order, and `used` is
//!    recomputed from all bound inputs.
//! 2. `prepare_to_build` runs on each node in node order (inline code,
//!    texture units).
//! 3. Inputs are resolved to [`Value`]s, falling back to slot defaults.
//! 4. The scheduler orders nodes by dependency depth.
//! 5. Declarations and executions are collected per stage in that order and
//!    wrapped with the target's preamble.
//!
//! Everything computed along the way is returned as a [`BuildLayout`], which
//! the program keeps only if the result compiles.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::BuildError;
use crate::graph::ShaderGraph;
use crate::node::{EmitContext, NodeId, PrepareContext};
use crate::port::{Port, PortRef, Value};
use crate::scheduler::schedule;
use crate::target::ShaderTarget;
use crate::types::Stage;

/// Per-node results of one build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeLayout {
    /// Ordinal of the node among live nodes.
    pub uid: u32,
    pub ports: Vec<Port>,
    pub texture_units: Vec<u32>,
    pub(crate) inputs: BTreeMap<String, Value>,
}

/// Uids, usage flags and texture units of one build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildLayout {
    /// Emission order.
    pub order: Vec<NodeId>,
    pub nodes: BTreeMap<NodeId, NodeLayout>,
}

impl BuildLayout {
    pub fn node(&self, id: NodeId) -> Option<&NodeLayout> {
        self.nodes.get(&id)
    }

    pub fn port(&self, id: NodeId, index: usize) -> Option<&Port> {
        self.nodes.get(&id)?.ports.get(index)
    }
}

/// Complete sources for both stages plus the layout they were generated with.
#[derive(Clone, Debug)]
pub struct GeneratedSource {
    pub vertex: String,
    pub fragment: String,
    pub layout: BuildLayout,
}

pub fn assemble(graph: &ShaderGraph, target: &ShaderTarget) -> Result<GeneratedSource, BuildError> {
    let mut nodes: BTreeMap<NodeId, NodeLayout> = BTreeMap::new();

    let mut next_uid = 0u32;
    for (ordinal, (id, node, _)) in graph.iter().enumerate() {
        let mut ports = node.outputs();
        for port in &mut ports {
            port.uid = next_uid;
            port.used = false;
            next_uid += 1;
        }
        nodes.insert(
            id,
            NodeLayout {
                uid: ordinal as u32,
                ports,
                ..Default::default()
            },
        );
    }

    for (_, _, inputs) in graph.iter() {
        for source in inputs.values() {
            if let PortRef::Output { node, port } = source {
                if let Some(port) = nodes.get_mut(node).and_then(|l| l.ports.get_mut(*port)) {
                    port.used = true;
                }
            }
        }
    }

    let mut next_texture_unit = 0u32;
    for (id, node, _) in graph.iter() {
        let Some(layout) = nodes.get_mut(&id) else {
            continue;
        };
        let mut cx = PrepareContext {
            target,
            ports: &mut layout.ports,
            texture_units: &mut layout.texture_units,
            next_texture_unit: &mut next_texture_unit,
        };
        node.prepare_to_build(&mut cx);
    }

    for (id, node, inputs) in graph.iter() {
        let mut resolved = BTreeMap::new();
        for slot in node.input_form() {
            let value = match inputs.get(&slot.name) {
                Some(PortRef::Output { node, port }) => nodes
                    .get(node)
                    .and_then(|l| l.ports.get(*port))
                    .map(Value::from_port),
                Some(PortRef::Literal(literal)) => Some(Value::from_literal(*literal)),
                None => None,
            };
            resolved.insert(
                slot.name,
                value.unwrap_or_else(|| Value::from_literal(slot.default)),
            );
        }
        if let Some(layout) = nodes.get_mut(&id) {
            layout.inputs = resolved;
        }
    }

    let order = schedule(graph)?;
    let keywords = target.keywords();

    let mut vertex_decls = String::new();
    let mut vertex_execs = String::new();
    let mut fragment_decls = String::new();
    let mut fragment_execs = String::new();
    let mut vertex_attributes = BTreeSet::new();
    let mut fragment_attributes = BTreeSet::new();

    for id in &order {
        let (Some(node), Some(layout)) = (graph.dyn_node(*id), nodes.get(id)) else {
            continue;
        };

        let mut cx = EmitContext {
            target,
            keywords,
            uid: layout.uid,
            ports: &layout.ports,
            inputs: &layout.inputs,
            attributes: &mut vertex_attributes,
        };
        node.declaration_vert(&mut cx, &mut vertex_decls)?;
        node.execution_vert(&mut cx, &mut vertex_execs)?;

        let mut cx = EmitContext {
            target,
            keywords,
            uid: layout.uid,
            ports: &layout.ports,
            inputs: &layout.inputs,
            attributes: &mut fragment_attributes,
        };
        node.declaration_frag(&mut cx, &mut fragment_decls)?;
        node.execution_frag(&mut cx, &mut fragment_execs)?;
    }

    log::debug!(
        "assembled {} nodes in order {:?} using {} texture units",
        order.len(),
        order,
        next_texture_unit
    );

    Ok(GeneratedSource {
        vertex: wrap(target.preamble(Stage::Vertex), &vertex_decls, &vertex_execs),
        fragment: wrap(target.preamble(Stage::Fragment), &fragment_decls, &fragment_execs),
        layout: BuildLayout { order, nodes },
    })
}

fn wrap(preamble: String, declarations: &str, executions: &str) -> String {
    format!("{preamble}{declarations}\nvoid main() {{\n{executions}\n}}\n")
}

/// Prefixes every line with its 1-based number, padded to five columns.
pub fn numerate_lines(title: &str, source: &str) -> String {
    let mut out = String::from(title);
    for (i, line) in source.lines().enumerate() {
        out.push_str(&format!("{:<5}{}\n", i + 1, line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{CameraDataNode, OutputNode, TextureNode, VertexNode};
    use crate::port::Literal;

    fn textured_graph() -> (ShaderGraph, NodeId, NodeId, NodeId) {
        let mut graph = ShaderGraph::new();
        let vertex = graph.add_node(VertexNode::default());
        let camera = graph.add_node(CameraDataNode);
        let texture = graph.add_node(TextureNode::default());
        let output = graph.add_node(OutputNode::default());
        graph
            .set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))
            .unwrap();
        graph
            .set_input(output, "vertPosition", camera.output(CameraDataNode::CLIP_SPACE_POSITION))
            .unwrap();
        graph
            .set_input(output, "fragColor", texture.output(TextureNode::COLOR))
            .unwrap();
        (graph, vertex, texture, output)
    }

    #[test]
    fn stages_are_wrapped_with_preamble_and_main() {
        let graph = ShaderGraph::new();
        let generated = assemble(&graph, &ShaderTarget::gl(110)).unwrap();
        assert_eq!(generated.vertex, "#version 110\n\nvoid main() {\n\n}\n");
        assert_eq!(generated.fragment, "#version 110\n\nvoid main() {\n\n}\n");
    }

    #[test]
    fn uids_are_unique_and_follow_node_order() {
        let (graph, vertex, texture, _) = textured_graph();
        let layout = assemble(&graph, &ShaderTarget::default()).unwrap().layout;
        let mut uids: Vec<u32> = layout
            .nodes
            .values()
            .flat_map(|n| n.ports.iter().map(|p| p.uid))
            .collect();
        let count = uids.len();
        uids.dedup();
        assert_eq!(uids.len(), count);
        assert!(uids.windows(2).all(|w| w[0] < w[1]));
        assert!(layout.port(vertex, 0).unwrap().uid < layout.port(texture, 0).unwrap().uid);
    }

    #[test]
    fn usage_comes_from_bindings() {
        let (graph, vertex, texture, _) = textured_graph();
        let layout = assemble(&graph, &ShaderTarget::default()).unwrap().layout;
        assert!(layout.port(vertex, VertexNode::POSITION).unwrap().used);
        assert!(!layout.port(vertex, VertexNode::NORMAL).unwrap().used);
        assert!(layout.port(texture, TextureNode::COLOR).unwrap().used);
        assert!(!layout.port(texture, TextureNode::ALPHA).unwrap().used);
    }

    #[test]
    fn texture_units_are_claimed_only_when_sampled() {
        let (mut graph, _, texture, output) = textured_graph();
        let unused = graph.add_node(TextureNode::default());
        let layout = assemble(&graph, &ShaderTarget::default()).unwrap().layout;
        assert_eq!(layout.node(texture).unwrap().texture_units, vec![0]);
        assert!(layout.node(unused).unwrap().texture_units.is_empty());

        graph.set_input(output, "fragColor", Literal::ONE).unwrap();
        let layout = assemble(&graph, &ShaderTarget::default()).unwrap().layout;
        assert!(layout.node(texture).unwrap().texture_units.is_empty());
    }

    #[test]
    fn unbound_inputs_resolve_to_defaults() {
        let mut graph = ShaderGraph::new();
        let output = graph.add_node(OutputNode::default());
        let layout = assemble(&graph, &ShaderTarget::default()).unwrap().layout;
        let inputs = &layout.node(output).unwrap().inputs;
        assert_eq!(inputs["fragColor"], Value::from_literal(Literal::ONE));
    }

    #[test]
    fn numbered_lines_are_padded() {
        let numbered = numerate_lines("=== VERTEX ===\n", "a\nb");
        assert_eq!(numbered, "=== VERTEX ===\n1    a\n2    b\n");
    }
}
