//! Dependency ordering of nodes.
//!
//! A node's depth is 0 when none of its inputs come from another node, and
//! otherwise one more than the deepest producer it reads. Emitting nodes in
//! ascending depth (ties keep insertion order) guarantees every producer's
//! text precedes its consumers' text in both stages.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::AuthoringError;
use crate::graph::ShaderGraph;
use crate::node::NodeId;

/// Depth of every live node, or the first cycle found.
pub fn node_depths(graph: &ShaderGraph) -> Result<BTreeMap<NodeId, usize>, AuthoringError> {
    let mut depths = BTreeMap::new();
    let mut visiting = BTreeSet::new();
    for id in graph.node_ids() {
        depth_of(graph, id, &mut depths, &mut visiting)?;
    }
    Ok(depths)
}

/// Live nodes sorted by depth, stable with respect to insertion order.
pub fn schedule(graph: &ShaderGraph) -> Result<Vec<NodeId>, AuthoringError> {
    let depths = node_depths(graph)?;
    let mut order: Vec<NodeId> = graph.node_ids().collect();
    order.sort_by_key(|id| depths.get(id).copied().unwrap_or(0));
    Ok(order)
}

fn depth_of(
    graph: &ShaderGraph,
    id: NodeId,
    depths: &mut BTreeMap<NodeId, usize>,
    visiting: &mut BTreeSet<NodeId>,
) -> Result<usize, AuthoringError> {
    if let Some(depth) = depths.get(&id) {
        return Ok(*depth);
    }
    if !visiting.insert(id) {
        let class_id = graph.dyn_node(id).map(|n| n.class_id()).unwrap_or("?");
        return Err(AuthoringError::Cycle {
            node: id,
            class_id: class_id.to_string(),
        });
    }

    let mut depth = 0;
    if let Some(inputs) = graph.inputs_of(id) {
        for producer in inputs.values().filter_map(|source| source.source_node()) {
            if !graph.contains(producer) {
                continue;
            }
            depth = depth.max(depth_of(graph, producer, depths, visiting)? + 1);
        }
    }

    visiting.remove(&id);
    depths.insert(id, depth);
    Ok(depth)
}
