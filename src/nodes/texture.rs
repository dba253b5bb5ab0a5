use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::node::{BindContext, EmitContext, InputSlot, PrepareContext, ShaderNode};
use crate::port::{Literal, Port};
use crate::render_data::{MeshData, TextureId};
use crate::types::{GlslType, Scope, Semantic};

/// Samples one texture per fragment.
///
/// The texture comes from the drawn mesh's `slot` binding when present,
/// otherwise from `texture`. A texture unit is claimed only when some output
/// is read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextureNode {
    /// Key looked up in [`MeshData::textures`].
    pub slot: String,
    pub texture: Option<TextureId>,
    /// Decode sRGB-encoded texels to linear.
    pub srgb: bool,
    pub sampler: GlslType,
}

impl Default for TextureNode {
    fn default() -> Self {
        Self {
            slot: "baseColor".to_string(),
            texture: None,
            srgb: true,
            sampler: GlslType::Sampler2D,
        }
    }
}

impl TextureNode {
    pub const SAMPLER: usize = 0;
    pub const COLOR: usize = 1;
    /// Alpha channel of [`COLOR`](Self::COLOR), inlined at each use.
    pub const ALPHA: usize = 2;

    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            ..Self::default()
        }
    }

    pub fn texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }

    pub fn sampler(mut self, sampler: GlslType) -> Self {
        self.sampler = sampler;
        self
    }

    fn coordinate_type(&self) -> GlslType {
        match self.sampler {
            GlslType::Sampler3D | GlslType::SamplerCube => GlslType::Vec3,
            _ => GlslType::Vec2,
        }
    }

    fn is_sampled(ports: impl Fn(usize) -> bool) -> bool {
        ports(Self::SAMPLER) || ports(Self::COLOR) || ports(Self::ALPHA)
    }
}

impl ShaderNode for TextureNode {
    fn class_id(&self) -> &'static str {
        "texture"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("uv", self.coordinate_type(), Literal::ZERO)]
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("tex", self.sampler).scope(Scope::Uniform),
            Port::new("texColor", GlslType::Vec4).semantic(Semantic::Color),
            Port::new("texAlpha", GlslType::Float).scope(Scope::Inline),
        ]
    }

    fn prepare_to_build(&self, cx: &mut PrepareContext<'_>) {
        let color = cx.port(Self::COLOR).reference();
        cx.set_inline_code(Self::ALPHA, format!("{color}.a"));
        if Self::is_sampled(|i| cx.is_used(i)) {
            cx.claim_texture_unit();
        }
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if Self::is_sampled(|i| cx.is_used(i)) {
            writeln!(out, "uniform {};", cx.port(Self::SAMPLER).typed_ref())?;
            writeln!(out, "{};", cx.port(Self::COLOR).typed_ref())?;
        }
        Ok(())
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !Self::is_sampled(|i| cx.is_used(i)) {
            return Ok(());
        }
        let color = cx.port(Self::COLOR).reference();
        let uv = cx.input("uv").as_type(self.coordinate_type());
        writeln!(
            out,
            "{color} = {}({}, {uv});",
            cx.target().texture_fn(self.sampler),
            cx.port(Self::SAMPLER).reference()
        )?;
        if self.srgb {
            writeln!(out, "{color}.rgb = pow({color}.rgb, vec3(2.2));")?;
        }
        Ok(())
    }

    fn shader_compiled(&self, cx: &mut BindContext<'_>) {
        if let Some(unit) = cx.texture_unit(0) {
            cx.set_port(Self::SAMPLER, unit as i32);
        }
    }

    fn prepare_to_draw_mesh(&self, cx: &mut BindContext<'_>, mesh: &MeshData) {
        let Some(unit) = cx.texture_unit(0) else {
            return;
        };
        match mesh.textures.get(&self.slot).copied().or(self.texture) {
            Some(texture) => cx.bind_texture(unit, texture),
            None => log::trace!("no texture bound to slot `{}` for mesh `{}`", self.slot, mesh.name),
        }
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::graph::ShaderGraph;
    use crate::nodes::test_support::{build, build_for, consume};
    use crate::nodes::{OutputNode, VertexAttributeNode};
    use crate::target::ShaderTarget;

    #[test]
    fn unbound_uv_samples_origin() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default());
        consume(&mut graph, texture.output(TextureNode::COLOR));
        let (vertex, fragment) = build(&graph);

        assert!(fragment.contains("uniform sampler2D tex0;"));
        assert!(fragment.contains("vec4 texColor1;"));
        assert!(fragment.contains("texColor1 = texture(tex0, vec2(0.0));"));
        assert!(fragment.contains("texColor1.rgb = pow(texColor1.rgb, vec3(2.2));"));
        assert!(!vertex.contains("tex0"));
    }

    #[test]
    fn legacy_targets_use_texture2d() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default().srgb(false));
        let uv = graph.add_node(VertexAttributeNode::default());
        graph.set_input(texture, "uv", uv.output(VertexAttributeNode::VALUE)).unwrap();
        consume(&mut graph, texture.output(TextureNode::COLOR));
        let (_, fragment) = build_for(&graph, &ShaderTarget::gl(110));

        assert!(fragment.contains("varying vec2 attr3;"));
        assert!(fragment.contains("texColor1 = texture2D(tex0, attr3);"));
        assert!(!fragment.contains("pow("));
    }

    #[test]
    fn cube_sampler_reads_a_direction() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::new("environment").sampler(GlslType::SamplerCube));
        consume(&mut graph, texture.output(TextureNode::COLOR));
        let (_, fragment) = build_for(&graph, &ShaderTarget::gl(120));

        assert!(fragment.contains("uniform samplerCube tex0;"));
        assert!(fragment.contains("textureCube(tex0, vec3(0.0))"));
    }

    #[test]
    fn alpha_is_inlined_from_color() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default());
        let output = graph.add_node(OutputNode::default());
        graph
            .set_input(output, "fragColor", texture.output(TextureNode::ALPHA))
            .unwrap();

        let generated = assemble(&graph, &ShaderTarget::default()).unwrap();
        let alpha = generated.layout.port(texture, TextureNode::ALPHA).unwrap();
        assert_eq!(alpha.reference(), "texColor1.a");
        assert!(generated.fragment.contains("fragColor = vec4(texColor1.a);"));
        assert!(!generated.fragment.contains("texAlpha"));
        assert_eq!(generated.layout.node(texture).unwrap().texture_units, vec![0]);
    }
}
