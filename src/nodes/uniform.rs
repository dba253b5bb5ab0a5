use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::node::{BindContext, EmitContext, ShaderNode};
use crate::port::{Literal, Port};
use crate::render_data::ObjectData;
use crate::types::Scope;

/// A named uniform holding a constant, overridable per drawn object.
///
/// The value is uploaded once after every successful build. Objects that put
/// an entry under `name` in [`ObjectData::uniforms`] replace it for their draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UniformNode {
    pub name: String,
    pub value: Literal,
}

impl Default for UniformNode {
    fn default() -> Self {
        Self {
            name: "uValue".to_string(),
            value: Literal::ZERO,
        }
    }
}

impl UniformNode {
    pub const VALUE: usize = 0;

    pub fn new(name: impl Into<String>, value: Literal) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    fn declare(cx: &EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::VALUE) {
            writeln!(out, "uniform {};", cx.port(Self::VALUE).typed_ref())?;
        }
        Ok(())
    }
}

impl ShaderNode for UniformNode {
    fn class_id(&self) -> &'static str {
        "uniform"
    }

    fn outputs(&self) -> Vec<Port> {
        vec![Port::new(self.name.clone(), self.value.ty()).scope(Scope::Uniform)]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        Self::declare(cx, out)
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        Self::declare(cx, out)
    }

    fn shader_compiled(&self, cx: &mut BindContext<'_>) {
        cx.set_port(Self::VALUE, self.value);
    }

    fn prepare_object_data(&self, cx: &mut BindContext<'_>, object: &ObjectData) {
        match object.uniforms.get(&self.name) {
            Some(value) => cx.set_port(Self::VALUE, value.clone()),
            None => cx.set_port(Self::VALUE, self.value),
        };
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}
