use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::backend::{CullFace, RenderState};
use crate::node::{BindContext, EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, format_float};
use crate::render_data::{AlphaMode, MeshData, SceneData};
use crate::types::GlslType;

/// Writes the clip-space position and the final fragment colour.
///
/// A graph needs exactly one of these for its program to draw anything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputNode {
    pub alpha_mode: AlphaMode,
    /// Fragments with lower alpha are discarded in [`AlphaMode::Mask`].
    pub alpha_cutoff: f32,
    /// Fraction of the far plane where objects start fading out. Values
    /// outside `0.0..=1.0` disable fading.
    pub fade_start: Option<f32>,
    pub cull_face: Option<CullFace>,
}

impl Default for OutputNode {
    fn default() -> Self {
        Self {
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            fade_start: None,
            cull_face: Some(CullFace::Back),
        }
    }
}

impl OutputNode {
    pub fn alpha_mode(mut self, mode: AlphaMode) -> Self {
        self.alpha_mode = mode;
        self
    }

    pub fn alpha_cutoff(mut self, cutoff: f32) -> Self {
        self.alpha_cutoff = cutoff;
        self
    }

    pub fn fade_start(mut self, fraction: f32) -> Self {
        self.fade_start = Some(fraction);
        self
    }

    pub fn cull_face(mut self, cull_face: Option<CullFace>) -> Self {
        self.cull_face = cull_face;
        self
    }

    fn fade(&self) -> Option<f32> {
        self.fade_start.filter(|f| (0.0..=1.0).contains(f))
    }
}

impl ShaderNode for OutputNode {
    fn class_id(&self) -> &'static str {
        "output"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        vec![
            InputSlot::new("vertPosition", GlslType::Vec4, Literal::ZERO),
            InputSlot::new("fragColor", GlslType::Vec4, Literal::ONE),
        ]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.fade().is_some() {
            writeln!(out, "{} float depthForFade{};", cx.keywords().varying_out, cx.uid())?;
        }
        Ok(())
    }

    fn execution_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        writeln!(out, "gl_Position = {};", cx.input("vertPosition").as_vec4())?;
        if self.fade().is_some() {
            writeln!(out, "depthForFade{} = gl_Position.w;", cx.uid())?;
        }
        Ok(())
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if self.fade().is_some() {
            let u = cx.uid();
            writeln!(out, "{} float depthForFade{u};", cx.keywords().varying_in)?;
            writeln!(out, "uniform float uFadeStart{u};")?;
            writeln!(out, "uniform float uFadeMul{u};")?;
        }
        Ok(())
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        let frag_color = cx.keywords().frag_color;
        writeln!(out, "{frag_color} = {};", cx.input("fragColor").as_vec4())?;

        if self.alpha_mode == AlphaMode::Mask {
            writeln!(
                out,
                "if ({frag_color}.a < {}) discard;",
                format_float(self.alpha_cutoff)
            )?;
            writeln!(out, "{frag_color}.a = 1.0;")?;
        }
        if self.fade().is_some() {
            let u = cx.uid();
            writeln!(
                out,
                "{frag_color}.a *= clamp((uFadeStart{u} - depthForFade{u}) * uFadeMul{u} + 1.0, 0.0, 1.0);"
            )?;
        }
        Ok(())
    }

    fn prepare_scene_data(&self, cx: &mut BindContext<'_>, scene: &SceneData) {
        let Some(fraction) = self.fade() else {
            return;
        };
        let u = cx.uid();
        let start = scene.far * fraction;
        cx.set_uniform(&format!("uFadeStart{u}"), start);
        cx.set_uniform(
            &format!("uFadeMul{u}"),
            (scene.far - start).max(f32::EPSILON).recip(),
        );
    }

    fn prepare_to_draw_mesh(&self, cx: &mut BindContext<'_>, mesh: &MeshData) {
        let mode = mesh.alpha_mode.unwrap_or(self.alpha_mode);
        cx.set_render_state(RenderState {
            blending: mode == AlphaMode::Blend || self.fade().is_some(),
            cull_face: self.cull_face,
        });
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}
