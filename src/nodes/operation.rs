use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::node::{EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, Port};
use crate::types::{GlslType, Scope, Stage};

/// A free-form expression over inputs `arg1` to `argN`.
///
/// Every standalone `argK` identifier in `function` is replaced by the
/// expression bound to that input. With `varying` set, a vertex-stage result
/// is forwarded to the fragment stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationNode {
    pub function: String,
    pub result_type: GlslType,
    pub args: usize,
    pub stage: Stage,
    pub varying: bool,
}

impl Default for OperationNode {
    fn default() -> Self {
        Self {
            function: "arg1 + arg2".to_string(),
            result_type: GlslType::Vec4,
            args: 2,
            stage: Stage::Fragment,
            varying: false,
        }
    }
}

impl OperationNode {
    pub const RESULT: usize = 0;

    pub fn new(function: impl Into<String>, result_type: GlslType, args: usize) -> Self {
        Self {
            function: function.into(),
            result_type,
            args,
            ..Self::default()
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn varying(mut self, varying: bool) -> Self {
        self.varying = varying;
        self
    }

    fn is_varying(&self) -> bool {
        self.varying && self.stage == Stage::Vertex
    }

    fn expression(&self, cx: &EmitContext<'_>) -> String {
        let args: Vec<String> = (1..=self.args)
            .map(|i| {
                let code = cx.input(&format!("arg{i}")).reference().to_string();
                if code.contains(' ') { format!("({code})") } else { code }
            })
            .collect();
        substitute_args(&self.function, &args)
    }

    fn write_result(&self, cx: &EmitContext<'_>, out: &mut String) -> fmt::Result {
        let port = cx.port(Self::RESULT);
        let target = if self.is_varying() {
            port.reference()
        } else {
            port.typed_ref()
        };
        writeln!(out, "{target} = {};", self.expression(cx))
    }
}

/// Replaces each identifier `argK` (1-based) with `args[K - 1]`.
fn substitute_args(function: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(function.len());
    let mut chars = function.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if !(c.is_ascii_alphabetic() || c == '_') {
            out.push(c);
            // digits glued to a number literal never start an identifier
            if c.is_ascii_digit() || c == '.' {
                while let Some(&(_, d)) = chars.peek() {
                    if !(d.is_ascii_alphanumeric() || d == '.') {
                        break;
                    }
                    out.push(d);
                    chars.next();
                }
            }
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, d)) = chars.peek() {
            if !(d.is_ascii_alphanumeric() || d == '_') {
                break;
            }
            end = i + d.len_utf8();
            chars.next();
        }

        let ident = &function[start..end];
        let replacement = ident
            .strip_prefix("arg")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| (1..=args.len()).contains(n))
            .map(|n| args[n - 1].as_str());
        out.push_str(replacement.unwrap_or(ident));
    }
    out
}

impl ShaderNode for OperationNode {
    fn class_id(&self) -> &'static str {
        "operation"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        (1..=self.args)
            .map(|i| InputSlot::any(format!("arg{i}"), Literal::ZERO))
            .collect()
    }

    fn outputs(&self) -> Vec<Port> {
        let scope = if self.is_varying() {
            Scope::VaryingOut
        } else {
            Scope::Local
        };
        vec![Port::new("op", self.result_type).scope(scope)]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.is_varying() && cx.is_used(Self::RESULT) {
            writeln!(out, "{} {};", cx.keywords().varying_out, cx.port(Self::RESULT).typed_ref())?;
        }
        Ok(())
    }

    fn execution_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.stage == Stage::Vertex && cx.is_used(Self::RESULT) {
            self.write_result(cx, out)?;
        }
        Ok(())
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.is_varying() && cx.is_used(Self::RESULT) {
            writeln!(out, "{} {};", cx.keywords().varying_in, cx.port(Self::RESULT).typed_ref())?;
        }
        Ok(())
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.stage == Stage::Fragment && cx.is_used(Self::RESULT) {
            self.write_result(cx, out)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShaderGraph;
    use crate::nodes::test_support::{build, consume};
    use crate::nodes::{TextureNode, VertexNode};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitution_respects_identifier_boundaries() {
        let args = args(&["a0", "b1"]);
        assert_eq!(substitute_args("arg1 * arg2", &args), "a0 * b1");
        assert_eq!(substitute_args("max(arg1,arg2)", &args), "max(a0,b1)");
        assert_eq!(substitute_args("marg1 + arg12 + arg3", &args), "marg1 + arg12 + arg3");
        assert_eq!(substitute_args("arg2.xy * 1e2", &args), "b1.xy * 1e2");
    }

    #[test]
    fn fragment_operation_declares_a_local() {
        let mut graph = ShaderGraph::new();
        let texture = graph.add_node(TextureNode::default());
        let op = graph.add_node(OperationNode::new("arg1 * arg2", GlslType::Vec4, 2));
        graph.set_input(op, "arg1", texture.output(TextureNode::COLOR)).unwrap();
        graph.set_input(op, "arg2", texture.output(TextureNode::ALPHA)).unwrap();
        consume(&mut graph, op.output(OperationNode::RESULT));
        let (vertex, fragment) = build(&graph);

        assert!(fragment.contains("vec4 op3 = texColor1 * texColor1.a;"));
        assert!(!vertex.contains("op3"));
    }

    #[test]
    fn vertex_operation_can_be_forwarded() {
        let mut graph = ShaderGraph::new();
        let vertex = graph.add_node(VertexNode::default());
        let op = graph.add_node(
            OperationNode::new("arg1 * 0.5", GlslType::Vec3, 1)
                .stage(Stage::Vertex)
                .varying(true),
        );
        graph.set_input(op, "arg1", vertex.output(VertexNode::NORMAL)).unwrap();
        consume(&mut graph, op.output(OperationNode::RESULT));
        let (vertex, fragment) = build(&graph);

        assert!(vertex.contains("out vec3 op3;"));
        assert!(vertex.contains("op3 = normal1 * 0.5;"));
        assert!(fragment.contains("in vec3 op3;"));
        assert!(!fragment.contains("op3 ="));
    }

    #[test]
    fn unused_operation_emits_nothing() {
        let mut graph = ShaderGraph::new();
        graph.add_node(OperationNode::default());
        let (vertex, fragment) = build(&graph);
        assert!(!vertex.contains("op0"));
        assert!(!fragment.contains("op0"));
    }

    #[test]
    fn unbound_arguments_read_zero() {
        let mut graph = ShaderGraph::new();
        let op = graph.add_node(OperationNode::default());
        consume(&mut graph, op.output(OperationNode::RESULT));
        let (_, fragment) = build(&graph);
        assert!(fragment.contains("vec4 op0 = 0.0 + 0.0;"));
    }
}
