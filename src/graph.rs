//! The node arena and its wiring.
//!
//! Nodes live in slots addressed by [`NodeId`]. Removing a node leaves an
//! empty slot behind so the ids of the remaining nodes stay valid, and unbinds
//! every input that was reading from it. Edges exist only as the bound inputs
//! of the consuming node.
//!
//! # Example
//!
//! ```ignore
//! let mut graph = ShaderGraph::new();
//! let vertex = graph.add_node(VertexNode::default());
//! let camera = graph.add_node(CameraDataNode);
//! graph.set_input(camera, "vertexPosition", vertex.output(VertexNode::POSITION))?;
//! ```

use std::collections::BTreeMap;

use crate::error::AuthoringError;
use crate::node::{InputSlot, NodeId, ShaderNode};
use crate::port::PortRef;

#[derive(Debug)]
pub(crate) struct NodeSlot {
    pub(crate) node: Box<dyn ShaderNode>,
    pub(crate) inputs: BTreeMap<String, PortRef>,
}

/// An arena of shading nodes and their input bindings.
#[derive(Debug, Default)]
pub struct ShaderGraph {
    slots: Vec<Option<NodeSlot>>,
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; ids are handed out in insertion order.
    pub fn add_node<N: ShaderNode>(&mut self, node: N) -> NodeId {
        self.add_boxed(Box::new(node))
    }

    pub fn add_boxed(&mut self, node: Box<dyn ShaderNode>) -> NodeId {
        self.slots.push(Some(NodeSlot {
            node,
            inputs: BTreeMap::new(),
        }));
        NodeId(self.slots.len() - 1)
    }

    /// Removes a node and unbinds every input that read from it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Box<dyn ShaderNode>, AuthoringError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(AuthoringError::UnknownNode(id))?;

        for (consumer, name) in self.consumers(id) {
            log::warn!(
                "removing node {id} (`{}`) unbinds input `{name}` of node {consumer}",
                slot.node.class_id()
            );
            if let Some(Some(other)) = self.slots.get_mut(consumer.0) {
                other.inputs.remove(&name);
            }
        }
        Ok(slot.node)
    }

    /// Binds input `name` of `node` to another node's output or a literal.
    ///
    /// The source must be a live node of this graph other than `node` itself,
    /// and its type must be convertible to the slot's type.
    pub fn set_input(
        &mut self,
        node: NodeId,
        name: &str,
        source: impl Into<PortRef>,
    ) -> Result<(), AuthoringError> {
        let source = source.into();
        let slot = self.input_slot(node, name)?;
        let class_id = self.slot(node)?.node.class_id();

        let found = match source {
            PortRef::Output { node: producer, port } => {
                if producer == node {
                    return Err(AuthoringError::SelfBinding {
                        class_id: class_id.to_string(),
                    });
                }
                let producer_node = &self.slot(producer)?.node;
                let outputs = producer_node.outputs();
                let port = outputs.get(port).ok_or_else(|| AuthoringError::UnknownOutput {
                    class_id: producer_node.class_id().to_string(),
                    index: port,
                })?;
                port.ty
            }
            PortRef::Literal(literal) => {
                if !literal.is_finite() {
                    return Err(AuthoringError::NonFiniteLiteral {
                        class_id: class_id.to_string(),
                        input: name.to_string(),
                    });
                }
                literal.ty()
            }
        };

        if !slot.accepts(found) {
            return Err(AuthoringError::IncompatibleType {
                class_id: class_id.to_string(),
                input: name.to_string(),
                // accepts() only fails for typed slots
                expected: slot.ty.unwrap_or(found),
                found,
            });
        }

        self.slot_mut(node)?.inputs.insert(name.to_string(), source);
        Ok(())
    }

    /// Unbinds input `name`, returning what it was bound to.
    pub fn clear_input(&mut self, node: NodeId, name: &str) -> Result<Option<PortRef>, AuthoringError> {
        self.input_slot(node, name)?;
        Ok(self.slot_mut(node)?.inputs.remove(name))
    }

    pub fn input(&self, node: NodeId, name: &str) -> Option<&PortRef> {
        self.slots.get(node.0)?.as_ref()?.inputs.get(name)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeId(index))
    }

    pub fn dyn_node(&self, id: NodeId) -> Option<&dyn ShaderNode> {
        self.slots.get(id.0)?.as_ref().map(|slot| slot.node.as_ref())
    }

    /// The node as its concrete type.
    pub fn node<N: ShaderNode>(&self, id: NodeId) -> Option<&N> {
        let slot = self.slots.get(id.0)?.as_ref()?;
        (*slot.node).as_any().downcast_ref::<N>()
    }

    /// The node as its concrete type, for editing parameters between builds.
    pub fn node_mut<N: ShaderNode>(&mut self, id: NodeId) -> Option<&mut N> {
        let slot = self.slots.get_mut(id.0)?.as_mut()?;
        (*slot.node).as_any_mut().downcast_mut::<N>()
    }

    /// All `(consumer, input name)` pairs reading from `producer`.
    pub fn consumers(&self, producer: NodeId) -> Vec<(NodeId, String)> {
        self.iter()
            .flat_map(|(id, _, inputs)| {
                inputs
                    .iter()
                    .filter(move |(_, source)| source.source_node() == Some(producer))
                    .map(move |(name, _)| (id, name.clone()))
            })
            .collect()
    }

    pub(crate) fn iter(
        &self,
    ) -> impl Iterator<Item = (NodeId, &dyn ShaderNode, &BTreeMap<String, PortRef>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|slot| (NodeId(index), slot.node.as_ref(), &slot.inputs))
        })
    }

    pub(crate) fn inputs_of(&self, id: NodeId) -> Option<&BTreeMap<String, PortRef>> {
        self.slots.get(id.0)?.as_ref().map(|slot| &slot.inputs)
    }

    fn slot(&self, id: NodeId) -> Result<&NodeSlot, AuthoringError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(AuthoringError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot, AuthoringError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(AuthoringError::UnknownNode(id))
    }

    fn input_slot(&self, id: NodeId, name: &str) -> Result<InputSlot, AuthoringError> {
        let node = &self.slot(id)?.node;
        node.input_form()
            .into_iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| AuthoringError::UnknownInput {
                class_id: node.class_id().to_string(),
                input: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{CameraDataNode, OutputNode, TextureNode, VertexNode};
    use crate::port::Literal;

    #[test]
    fn ids_follow_insertion_order() {
        let mut graph = ShaderGraph::new();
        let a = graph.add_node(VertexNode::default());
        let b = graph.add_node(CameraDataNode);
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn unknown_input_is_rejected() {
        let mut graph = ShaderGraph::new();
        let output = graph.add_node(OutputNode::default());
        let err = graph.set_input(output, "colour", Literal::ONE).unwrap_err();
        assert!(matches!(err, AuthoringError::UnknownInput { .. }));
    }

    #[test]
    fn self_binding_is_rejected() {
        let mut graph = ShaderGraph::new();
        let camera = graph.add_node(CameraDataNode);
        let err = graph
            .set_input(camera, "vertexPosition", camera.output(CameraDataNode::VIEW_SPACE_POSITION))
            .unwrap_err();
        assert!(matches!(err, AuthoringError::SelfBinding { .. }));
    }

    #[test]
    fn stale_and_out_of_range_ports_are_rejected() {
        let mut graph = ShaderGraph::new();
        let vertex = graph.add_node(VertexNode::default());
        let output = graph.add_node(OutputNode::default());
        assert!(matches!(
            graph.set_input(output, "vertPosition", vertex.output(42)),
            Err(AuthoringError::UnknownOutput { index: 42, .. })
        ));

        graph.remove_node(vertex).unwrap();
        assert_eq!(
            graph.set_input(output, "vertPosition", vertex.output(VertexNode::POSITION)),
            Err(AuthoringError::UnknownNode(vertex))
        );
    }

    #[test]
    fn non_finite_literals_are_rejected() {
        let mut graph = ShaderGraph::new();
        let output = graph.add_node(OutputNode::default());
        let err = graph
            .set_input(output, "fragColor", Literal::Vec4([1.0, f32::NAN, 0.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, AuthoringError::NonFiniteLiteral { .. }));
        assert!(graph.input(output, "fragColor").is_none());
        assert!(graph.set_input(output, "fragColor", Literal::Float(f32::INFINITY)).is_err());
    }

    #[test]
    fn matrices_do_not_feed_vectors() {
        let mut graph = ShaderGraph::new();
        let camera = graph.add_node(CameraDataNode);
        let output = graph.add_node(OutputNode::default());
        let err = graph
            .set_input(output, "fragColor", camera.output(CameraDataNode::VIEW_MATRIX))
            .unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::IncompatibleType {
                expected: crate::types::GlslType::Vec4,
                found: crate::types::GlslType::Mat4,
                ..
            }
        ));
    }

    #[test]
    fn removing_a_node_unbinds_consumers() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default());
        let output = graph.add_node(OutputNode::default());
        graph
            .set_input(output, "fragColor", texture.output(TextureNode::COLOR))
            .unwrap();
        assert_eq!(graph.consumers(texture), vec![(output, "fragColor".to_string())]);

        let removed = graph.remove_node(texture).unwrap();
        assert_eq!(removed.class_id(), "texture");
        assert!(graph.input(output, "fragColor").is_none());
        assert!(!graph.contains(texture));
        assert!(graph.contains(output));
    }

    #[test]
    fn downcasts_to_concrete_nodes() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default());
        assert!(graph.node::<OutputNode>(texture).is_none());
        graph.node_mut::<TextureNode>(texture).unwrap().srgb = false;
        assert!(!graph.node::<TextureNode>(texture).unwrap().srgb);
    }

    #[test]
    fn clearing_returns_previous_binding() {
        let mut graph = ShaderGraph::new();
        let output = graph.add_node(OutputNode::default());
        graph.set_input(output, "fragColor", Literal::Vec3([1.0, 0.0, 0.0])).unwrap();
        let previous = graph.clear_input(output, "fragColor").unwrap();
        assert_eq!(previous, Some(PortRef::Literal(Literal::Vec3([1.0, 0.0, 0.0]))));
        assert_eq!(graph.clear_input(output, "fragColor").unwrap(), None);
    }
}
