use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::node::{BindContext, EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, Port};
use crate::render_data::SceneData;
use crate::types::{GlslType, Scope, Semantic};

/// Curve used to bring HDR colour into display range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneMapMode {
    /// Gamma encoding only.
    #[default]
    #[serde(rename = "LinearToSRGB")]
    LinearToSrgb,
    Uncharted,
    HejlRichard,
    #[serde(rename = "ACES")]
    Aces,
}

/// Applies exposure and a tone-mapping curve to a linear colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToneMapNode {
    pub mode: ToneMapMode,
}

impl ToneMapNode {
    pub const RESULT: usize = 0;

    pub fn new(mode: ToneMapMode) -> Self {
        Self { mode }
    }

    fn write_function(&self, u: u32, out: &mut String) -> fmt::Result {
        const INV_GAMMA: &str = "vec3(1.0 / 2.2)";

        if self.mode == ToneMapMode::Uncharted {
            writeln!(out, "vec3 uncharted{u}(vec3 x) {{")?;
            writeln!(out, "    const float A = 0.15;")?;
            writeln!(out, "    const float B = 0.50;")?;
            writeln!(out, "    const float C = 0.10;")?;
            writeln!(out, "    const float D = 0.20;")?;
            writeln!(out, "    const float E = 0.02;")?;
            writeln!(out, "    const float F = 0.30;")?;
            writeln!(out, "    return ((x * (A * x + C * B) + D * E) / (x * (A * x + B) + D * F)) - E / F;")?;
            writeln!(out, "}}")?;
        }

        writeln!(out, "vec3 toneMap{u}(vec3 color) {{")?;
        writeln!(out, "    color *= uExposure{u};")?;
        match self.mode {
            ToneMapMode::LinearToSrgb => {
                writeln!(out, "    return pow(color, {INV_GAMMA});")?;
            }
            ToneMapMode::Uncharted => {
                writeln!(out, "    vec3 whiteScale = 1.0 / uncharted{u}(vec3(11.2));")?;
                writeln!(out, "    vec3 curve = uncharted{u}(color * 2.0) * whiteScale;")?;
                writeln!(out, "    return pow(curve, {INV_GAMMA});")?;
            }
            ToneMapMode::HejlRichard => {
                // the curve bakes in gamma
                writeln!(out, "    color = max(vec3(0.0), color - 0.004);")?;
                writeln!(
                    out,
                    "    return (color * (6.2 * color + 0.5)) / (color * (6.2 * color + 1.7) + 0.06);"
                )?;
            }
            ToneMapMode::Aces => {
                writeln!(out, "    const float A = 2.51;")?;
                writeln!(out, "    const float B = 0.03;")?;
                writeln!(out, "    const float C = 2.43;")?;
                writeln!(out, "    const float D = 0.59;")?;
                writeln!(out, "    const float E = 0.14;")?;
                writeln!(
                    out,
                    "    vec3 curve = clamp((color * (A * color + B)) / (color * (C * color + D) + E), 0.0, 1.0);"
                )?;
                writeln!(out, "    return pow(curve, {INV_GAMMA});")?;
            }
        }
        writeln!(out, "}}")
    }
}

impl ShaderNode for ToneMapNode {
    fn class_id(&self) -> &'static str {
        "toneMap"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        vec![InputSlot::new("inputColor", GlslType::Vec4, Literal::ONE)]
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("toneMappedColor", GlslType::Vec4)
                .scope(Scope::Local)
                .semantic(Semantic::Color),
        ]
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !cx.is_used(Self::RESULT) {
            return Ok(());
        }
        let u = cx.uid();
        writeln!(out, "uniform float uExposure{u};")?;
        self.write_function(u, out)
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !cx.is_used(Self::RESULT) {
            return Ok(());
        }
        let color = cx.input("inputColor");
        writeln!(
            out,
            "{} = vec4(toneMap{}({}), {}.a);",
            cx.port(Self::RESULT).typed_ref(),
            cx.uid(),
            color.as_vec3(),
            color.as_vec4()
        )
    }

    fn prepare_scene_data(&self, cx: &mut BindContext<'_>, scene: &SceneData) {
        let u = cx.uid();
        cx.set_uniform(&format!("uExposure{u}"), scene.exposure);
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}
