use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::mesh::attribute;
use crate::node::{EmitContext, ShaderNode};
use crate::port::Port;
use crate::types::{GlslType, Scope};

/// Passes a raw mesh attribute through to the fragment stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VertexAttributeNode {
    /// Attribute name as it appears in the mesh layout.
    pub attribute: String,
    pub ty: GlslType,
}

impl Default for VertexAttributeNode {
    fn default() -> Self {
        Self {
            attribute: attribute::TEXCOORD_0.to_string(),
            ty: GlslType::Vec2,
        }
    }
}

impl VertexAttributeNode {
    pub const VALUE: usize = 0;

    pub fn new(attribute: impl Into<String>, ty: GlslType) -> Self {
        Self {
            attribute: attribute.into(),
            ty,
        }
    }
}

impl ShaderNode for VertexAttributeNode {
    fn class_id(&self) -> &'static str {
        "vertexAttribute"
    }

    fn outputs(&self) -> Vec<Port> {
        vec![Port::new("attr", self.ty).scope(Scope::VaryingOut)]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::VALUE) {
            cx.declare_attribute(out, self.ty, &self.attribute)?;
            writeln!(out, "{} {};", cx.keywords().varying_out, cx.port(Self::VALUE).typed_ref())?;
        }
        Ok(())
    }

    fn execution_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::VALUE) {
            writeln!(out, "{} = {};", cx.port(Self::VALUE).reference(), self.attribute)?;
        }
        Ok(())
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::VALUE) {
            writeln!(out, "{} {};", cx.keywords().varying_in, cx.port(Self::VALUE).typed_ref())?;
        }
        Ok(())
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}
