//! The trait every shading node implements, and the contexts it is driven through.
//!
//! A node never holds references to other nodes. It declares input slots
//! ([`ShaderNode::input_form`]) and output ports ([`ShaderNode::outputs`]);
//! the graph stores the wiring, and each build hands the node a context with
//! its resolved ports and inputs:
//!
//! - [`PrepareContext`] before scheduling: inline expressions, texture units
//! - [`EmitContext`] while generating each stage's text
//! - [`BindContext`] after linking and at draw time: uniforms, textures, state
//!
//! # Implementing Custom Nodes
//!
//! ```ignore
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Desaturate;
//!
//! impl Desaturate {
//!     pub const RESULT: usize = 0;
//! }
//!
//! impl ShaderNode for Desaturate {
//!     fn class_id(&self) -> &'static str { "desaturate" }
//!
//!     fn input_form(&self) -> Vec<InputSlot> {
//!         vec![InputSlot::new("color", GlslType::Vec4, Literal::ONE)]
//!     }
//!
//!     fn outputs(&self) -> Vec<Port> {
//!         vec![Port::new("grey", GlslType::Vec4).scope(Scope::Local)]
//!     }
//!
//!     fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
//!         if cx.is_used(Self::RESULT) {
//!             let color = cx.input("color");
//!             writeln!(out, "{} = vec4(vec3(dot({}, vec3(0.299, 0.587, 0.114))), 1.0);",
//!                 cx.port(Self::RESULT).typed_ref(), color.as_vec3())?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Write};

use crate::backend::{ProgramHandle, RenderState, ShaderBackend, UniformValue};
use crate::port::{Literal, Port, PortRef, Value};
use crate::render_data::{MeshData, ObjectData, SceneData, TextureId};
use crate::target::{Keywords, ShaderTarget};
use crate::types::GlslType;

/// Index of a node inside one [`ShaderGraph`](crate::ShaderGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// A handle to this node's output `port`, for use with `set_input`.
    pub fn output(self, port: usize) -> PortRef {
        PortRef::Output { node: self, port }
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Upcast helper so boxed nodes can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A named input a node accepts.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSlot {
    pub name: String,
    /// `None` accepts any type.
    pub ty: Option<GlslType>,
    /// Substituted while the slot is unbound.
    pub default: Literal,
}

impl InputSlot {
    pub fn new(name: impl Into<String>, ty: GlslType, default: Literal) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            default,
        }
    }

    pub fn any(name: impl Into<String>, default: Literal) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default,
        }
    }

    pub fn accepts(&self, ty: GlslType) -> bool {
        self.ty.is_none_or(|expected| ty.coercible_to(expected))
    }
}

/// A unit of shader generation.
///
/// Output ports are identified by their position in [`outputs`](Self::outputs);
/// concrete nodes expose those positions as associated constants. Every
/// emission hook must write nothing for ports that are not used.
pub trait ShaderNode: AsAny + fmt::Debug {
    /// Stable identifier used in graph descriptions.
    fn class_id(&self) -> &'static str;

    fn input_form(&self) -> Vec<InputSlot> {
        Vec::new()
    }

    /// Fresh output ports, in a fixed order.
    fn outputs(&self) -> Vec<Port> {
        Vec::new()
    }

    /// Runs once per build, after uids and usage are known.
    fn prepare_to_build(&self, _cx: &mut PrepareContext<'_>) {}

    fn declaration_vert(&self, _cx: &mut EmitContext<'_>, _out: &mut String) -> fmt::Result {
        Ok(())
    }

    fn declaration_frag(&self, _cx: &mut EmitContext<'_>, _out: &mut String) -> fmt::Result {
        Ok(())
    }

    fn execution_vert(&self, _cx: &mut EmitContext<'_>, _out: &mut String) -> fmt::Result {
        Ok(())
    }

    fn execution_frag(&self, _cx: &mut EmitContext<'_>, _out: &mut String) -> fmt::Result {
        Ok(())
    }

    /// Runs once after a successful link, with the new program in use.
    fn shader_compiled(&self, _cx: &mut BindContext<'_>) {}

    fn prepare_scene_data(&self, _cx: &mut BindContext<'_>, _scene: &SceneData) {}

    fn prepare_object_data(&self, _cx: &mut BindContext<'_>, _object: &ObjectData) {}

    fn prepare_to_draw_mesh(&self, _cx: &mut BindContext<'_>, _mesh: &MeshData) {}

    /// Node parameters as JSON, `null` when the node has none.
    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(serde_json::Value::Null)
    }

    fn load_params(&mut self, _params: serde_json::Value) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

/// Build-time access for [`ShaderNode::prepare_to_build`].
pub struct PrepareContext<'a> {
    pub(crate) target: &'a ShaderTarget,
    pub(crate) ports: &'a mut [Port],
    pub(crate) texture_units: &'a mut Vec<u32>,
    pub(crate) next_texture_unit: &'a mut u32,
}

impl PrepareContext<'_> {
    pub fn target(&self) -> &ShaderTarget {
        self.target
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.ports[index].used
    }

    /// Sets the expression an inline port expands to.
    pub fn set_inline_code(&mut self, index: usize, code: impl Into<String>) {
        self.ports[index].inline_code = Some(code.into());
    }

    /// Claims the next free texture unit for this node.
    pub fn claim_texture_unit(&mut self) -> u32 {
        let unit = *self.next_texture_unit;
        *self.next_texture_unit += 1;
        self.texture_units.push(unit);
        unit
    }
}

/// Code-generation access for the declaration and execution hooks.
pub struct EmitContext<'a> {
    pub(crate) target: &'a ShaderTarget,
    pub(crate) keywords: Keywords,
    pub(crate) uid: u32,
    pub(crate) ports: &'a [Port],
    pub(crate) inputs: &'a BTreeMap<String, Value>,
    pub(crate) attributes: &'a mut BTreeSet<String>,
}

impl EmitContext<'_> {
    pub fn target(&self) -> &ShaderTarget {
        self.target
    }

    pub fn keywords(&self) -> Keywords {
        self.keywords
    }

    /// Per-build ordinal of this node, for suffixing node-private names.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.ports[index].used
    }

    /// The value bound to `name`, or the slot's default.
    pub fn input(&self, name: &str) -> Value {
        self.inputs
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::from_literal(Literal::ZERO))
    }

    /// Declares a vertex attribute once per stage, however many nodes read it.
    pub fn declare_attribute(&mut self, out: &mut String, ty: GlslType, name: &str) -> fmt::Result {
        if self.attributes.insert(name.to_string()) {
            writeln!(out, "{} {} {};", self.keywords.attribute, ty, name)?;
        }
        Ok(())
    }
}

/// Render-time access for pushing values into a linked program.
pub struct BindContext<'a> {
    pub(crate) backend: &'a mut dyn ShaderBackend,
    pub(crate) program: ProgramHandle,
    pub(crate) uniforms: &'a HashMap<String, i32>,
    pub(crate) uid: u32,
    pub(crate) ports: &'a [Port],
    pub(crate) texture_units: &'a [u32],
}

impl BindContext<'_> {
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.ports[index].used
    }

    /// The `nth` texture unit this node claimed during the build.
    pub fn texture_unit(&self, nth: usize) -> Option<u32> {
        self.texture_units.get(nth).copied()
    }

    fn location(&self, name: &str) -> Option<i32> {
        self.uniforms
            .get(name)
            .or_else(|| self.uniforms.get(&format!("{name}[0]")))
            .copied()
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.location(name).is_some()
    }

    /// Uploads `value` if `name` is an active uniform; returns whether it was.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        match self.location(name) {
            Some(location) => {
                self.backend.set_uniform(self.program, location, &value.into());
                true
            }
            None => {
                log::trace!("skipping inactive uniform `{name}`");
                false
            }
        }
    }

    /// Uploads `value` to the uniform behind output port `index`.
    pub fn set_port(&mut self, index: usize, value: impl Into<UniformValue>) -> bool {
        let name = self.ports[index].reference();
        self.set_uniform(&name, value)
    }

    pub fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.backend.bind_texture(unit, texture);
    }

    pub fn set_render_state(&mut self, state: RenderState) {
        self.backend.set_render_state(state);
    }
}
