use std::fmt::{self, Write};

use crate::node::{EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, Port};
use crate::types::{GlslType, Scope, Semantic};

/// Perturbs the surface normal with a tangent-space normal map.
///
/// `tbn` is usually [`VertexNode::TBN`](crate::nodes::VertexNode::TBN) and
/// `normalColor` the colour of a linear (non-sRGB) texture. An unbound `tbn`
/// is the identity frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalMapNode;

impl NormalMapNode {
    pub const NORMAL: usize = 0;
}

impl ShaderNode for NormalMapNode {
    fn class_id(&self) -> &'static str {
        "normalMap"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        vec![
            InputSlot::new("tbn", GlslType::Mat3, Literal::ONE),
            InputSlot::new("normalColor", GlslType::Vec3, Literal::Vec3([0.5, 0.5, 1.0])),
            InputSlot::new("normalScale", GlslType::Float, Literal::ONE),
        ]
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("mappedNormal", GlslType::Vec3)
                .scope(Scope::Local)
                .semantic(Semantic::Direction),
        ]
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !cx.is_used(Self::NORMAL) {
            return Ok(());
        }
        let u = cx.uid();
        let tbn = cx.input("tbn");
        let frame = if tbn.ty() == GlslType::Mat3 {
            tbn.reference().to_string()
        } else {
            format!("mat3({})", tbn.as_float())
        };

        writeln!(
            out,
            "vec3 tangentNormal{u} = {} * 2.0 - 1.0;",
            cx.input("normalColor").as_vec3()
        )?;
        writeln!(out, "tangentNormal{u}.xy *= {};", cx.input("normalScale").as_float())?;
        writeln!(
            out,
            "{} = normalize({frame} * tangentNormal{u});",
            cx.port(Self::NORMAL).typed_ref()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShaderGraph;
    use crate::nodes::test_support::{build, consume};
    use crate::nodes::{PbrNode, TextureNode, VertexAttributeNode, VertexNode};

    #[test]
    fn unused_node_emits_nothing() {
        let mut graph = ShaderGraph::new();
        graph.add_node(NormalMapNode);
        let (_, fragment) = build(&graph);
        assert!(!fragment.contains("tangentNormal"));
    }

    #[test]
    fn unbound_frame_is_identity() {
        let mut graph = ShaderGraph::new();
        let node = graph.add_node(NormalMapNode);
        consume(&mut graph, node.output(NormalMapNode::NORMAL));
        let (_, fragment) = build(&graph);

        assert!(fragment.contains("vec3 tangentNormal0 = vec3(0.5, 0.5, 1.0) * 2.0 - 1.0;"));
        assert!(fragment.contains("tangentNormal0.xy *= 1.0;"));
        assert!(fragment.contains("vec3 mappedNormal0 = normalize(mat3(1.0) * tangentNormal0);"));
    }

    #[test]
    fn texture_normal_feeds_lighting() {
        let mut graph = ShaderGraph::new();
        let vertex = graph.add_node(VertexNode::default());
        let uv = graph.add_node(VertexAttributeNode::default());
        let texture = graph.add_node(TextureNode::new("normal").srgb(false));
        let mapped = graph.add_node(NormalMapNode);
        let lit = graph.add_node(PbrNode::default());
        graph.set_input(texture, "uv", uv.output(VertexAttributeNode::VALUE)).unwrap();
        graph.set_input(mapped, "tbn", vertex.output(VertexNode::TBN)).unwrap();
        graph
            .set_input(mapped, "normalColor", texture.output(TextureNode::COLOR))
            .unwrap();
        graph.set_input(mapped, "normalScale", Literal::Float(0.5)).unwrap();
        graph.set_input(lit, "normal", mapped.output(NormalMapNode::NORMAL)).unwrap();
        consume(&mut graph, lit.output(PbrNode::RESULT));
        let (_, fragment) = build(&graph);

        // vertex 0..=2, attr 3, texture 4..=6, mapped normal 7, pbr result 8
        assert!(fragment.contains("in mat3 tbn2;"));
        assert!(fragment.contains("vec3 tangentNormal3 = texColor5.xyz * 2.0 - 1.0;"));
        assert!(fragment.contains("tangentNormal3.xy *= 0.5;"));
        assert!(fragment.contains("vec3 mappedNormal7 = normalize(tbn2 * tangentNormal3);"));
        assert!(fragment.contains("mappedNormal7, 1.0, 1.0, 0.0, vec3(0.0));"));
        assert!(!fragment.contains("pow(texColor5"));
    }
}
