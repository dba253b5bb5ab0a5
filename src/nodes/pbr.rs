use std::fmt::{self, Write};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::backend::UniformValue;
use crate::node::{BindContext, EmitContext, InputSlot, ShaderNode};
use crate::port::{Literal, Port};
use crate::render_data::{Light, SceneData};
use crate::types::{GlslType, Scope, Semantic};

const PI: &str = "3.141592653589793";

/// Metallic-roughness surface shading lit by the scene's punctual lights.
///
/// Directional, point and spot lights from [`SceneData::lights`] are summed
/// with a GGX specular lobe and a Lambertian diffuse term, then ambient and
/// emissive light are added. Up to `max_lights` lights are evaluated; a scene
/// without lights shows the unlit diffuse colour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PbrNode {
    /// Size of the light uniform arrays.
    pub max_lights: u32,
}

impl Default for PbrNode {
    fn default() -> Self {
        Self { max_lights: 2 }
    }
}

impl PbrNode {
    pub const RESULT: usize = 0;

    pub fn new(max_lights: u32) -> Self {
        Self { max_lights }
    }

    fn capacity(&self) -> usize {
        self.max_lights.max(1) as usize
    }

    fn write_functions(&self, u: u32, out: &mut String) -> fmt::Result {
        let n = self.capacity();

        writeln!(out, "uniform int uLightCount{u};")?;
        writeln!(out, "uniform vec3 uLightRadiance{u}[{n}];")?;
        writeln!(out, "uniform vec3 uLightDirection{u}[{n}];")?;
        writeln!(out, "uniform vec3 uLightPosition{u}[{n}];")?;
        writeln!(out, "uniform vec4 uLightParams{u}[{n}];")?;
        writeln!(out, "uniform vec3 uAmbientColor{u};")?;

        writeln!(out, "float distributionGgx{u}(float nDotH, float alpha) {{")?;
        writeln!(out, "    float a2 = alpha * alpha;")?;
        writeln!(out, "    float f = nDotH * nDotH * (a2 - 1.0) + 1.0;")?;
        writeln!(out, "    return a2 / ({PI} * f * f);")?;
        writeln!(out, "}}")?;

        writeln!(out, "float visibilityGgx{u}(float nDotL, float nDotV, float alpha) {{")?;
        writeln!(out, "    float a2 = alpha * alpha;")?;
        writeln!(out, "    float ggxV = nDotL * sqrt(nDotV * nDotV * (1.0 - a2) + a2);")?;
        writeln!(out, "    float ggxL = nDotV * sqrt(nDotL * nDotL * (1.0 - a2) + a2);")?;
        writeln!(out, "    float ggx = ggxV + ggxL;")?;
        writeln!(out, "    return ggx > 0.0 ? 0.5 / ggx : 0.0;")?;
        writeln!(out, "}}")?;

        writeln!(out, "vec3 fresnelSchlick{u}(vec3 f0, float vDotH) {{")?;
        writeln!(
            out,
            "    return f0 + (vec3(1.0) - f0) * pow(clamp(1.0 - vDotH, 0.0, 1.0), 5.0);"
        )?;
        writeln!(out, "}}")?;

        // params: range, inner cone cos, outer cone cos, kind
        writeln!(
            out,
            "float attenuation{u}(vec4 params, vec3 spotDirection, vec3 pointToLight) {{"
        )?;
        writeln!(out, "    if (params.w < 0.5) return 1.0;")?;
        writeln!(out, "    float dist = length(pointToLight);")?;
        writeln!(out, "    float falloff = 1.0 / max(dist * dist, 0.0001);")?;
        writeln!(out, "    if (params.x > 0.0) {{")?;
        writeln!(
            out,
            "        falloff *= clamp(1.0 - pow(dist / params.x, 4.0), 0.0, 1.0);"
        )?;
        writeln!(out, "    }}")?;
        writeln!(out, "    if (params.w > 1.5) {{")?;
        writeln!(
            out,
            "        float cosAngle = dot(normalize(spotDirection), normalize(-pointToLight));"
        )?;
        writeln!(out, "        falloff *= smoothstep(params.z, params.y, cosAngle);")?;
        writeln!(out, "    }}")?;
        writeln!(out, "    return falloff;")?;
        writeln!(out, "}}")?;

        writeln!(
            out,
            "vec4 pbr{u}(vec3 position, vec3 v, vec4 baseColor, vec3 n, float occlusion, float roughness, float metallic, vec3 emissive) {{"
        )?;
        writeln!(out, "    n = normalize(n);")?;
        writeln!(out, "    roughness = clamp(roughness, 0.0, 1.0);")?;
        writeln!(out, "    metallic = clamp(metallic, 0.0, 1.0);")?;
        writeln!(out, "    float alpha = roughness * roughness;")?;
        writeln!(out, "    vec3 f0 = mix(vec3(0.04), baseColor.rgb, metallic);")?;
        writeln!(out, "    vec3 diffuseColor = mix(baseColor.rgb * 0.96, vec3(0.0), metallic);")?;
        writeln!(out, "    float nDotV = clamp(dot(n, v), 0.0, 1.0);")?;
        writeln!(out, "    vec3 diffuse = vec3(0.0);")?;
        writeln!(out, "    vec3 specular = vec3(0.0);")?;
        // the loop bound must be a constant on GLSL ES 1.00
        writeln!(out, "    for (int i = 0; i < {n}; i++) {{")?;
        writeln!(out, "        if (i >= uLightCount{u}) break;")?;
        writeln!(out, "        vec4 params = uLightParams{u}[i];")?;
        writeln!(out, "        vec3 pointToLight = -uLightDirection{u}[i];")?;
        writeln!(out, "        if (params.w > 0.5) pointToLight = uLightPosition{u}[i] - position;")?;
        writeln!(out, "        vec3 l = normalize(pointToLight);")?;
        writeln!(out, "        vec3 h = normalize(l + v);")?;
        writeln!(out, "        float nDotL = clamp(dot(n, l), 0.0, 1.0);")?;
        writeln!(out, "        float nDotH = clamp(dot(n, h), 0.0, 1.0);")?;
        writeln!(out, "        float vDotH = clamp(dot(v, h), 0.0, 1.0);")?;
        writeln!(
            out,
            "        vec3 radiance = uLightRadiance{u}[i] * attenuation{u}(params, uLightDirection{u}[i], pointToLight) * nDotL;"
        )?;
        writeln!(out, "        vec3 f = fresnelSchlick{u}(f0, vDotH);")?;
        writeln!(
            out,
            "        diffuse += radiance * (vec3(1.0) - f) * diffuseColor / {PI};"
        )?;
        writeln!(
            out,
            "        specular += radiance * f * visibilityGgx{u}(nDotL, nDotV, alpha) * distributionGgx{u}(nDotH, alpha);"
        )?;
        writeln!(out, "    }}")?;
        writeln!(out, "    if (uLightCount{u} == 0) diffuse = diffuseColor;")?;
        writeln!(
            out,
            "    vec3 ambient = uAmbientColor{u} * diffuseColor * clamp(occlusion, 0.0, 1.0);"
        )?;
        writeln!(
            out,
            "    return vec4(emissive + ambient + diffuse + specular, baseColor.a);"
        )?;
        writeln!(out, "}}")
    }
}

impl ShaderNode for PbrNode {
    fn class_id(&self) -> &'static str {
        "pbr"
    }

    fn input_form(&self) -> Vec<InputSlot> {
        let up = Literal::Vec3([0.0, 0.0, 1.0]);
        vec![
            InputSlot::new("worldPosition", GlslType::Vec3, Literal::ZERO),
            InputSlot::new("normalizedViewVector", GlslType::Vec3, up),
            InputSlot::new("baseColor", GlslType::Vec4, Literal::ONE),
            InputSlot::new("normal", GlslType::Vec3, up),
            InputSlot::new("metallic", GlslType::Float, Literal::ZERO),
            InputSlot::new("roughness", GlslType::Float, Literal::ONE),
            InputSlot::new("occlusion", GlslType::Float, Literal::ONE),
            InputSlot::new("emissive", GlslType::Vec3, Literal::ZERO),
        ]
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("result", GlslType::Vec4)
                .scope(Scope::Local)
                .semantic(Semantic::Color),
        ]
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if cx.is_used(Self::RESULT) {
            self.write_functions(cx.uid(), out)?;
        }
        Ok(())
    }

    fn execution_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !cx.is_used(Self::RESULT) {
            return Ok(());
        }
        writeln!(
            out,
            "{} = pbr{}({}, {}, {}, {}, {}, {}, {}, {});",
            cx.port(Self::RESULT).typed_ref(),
            cx.uid(),
            cx.input("worldPosition").as_vec3(),
            cx.input("normalizedViewVector").as_vec3(),
            cx.input("baseColor").as_vec4(),
            cx.input("normal").as_vec3(),
            cx.input("occlusion").as_float(),
            cx.input("roughness").as_float(),
            cx.input("metallic").as_float(),
            cx.input("emissive").as_vec3(),
        )
    }

    fn prepare_scene_data(&self, cx: &mut BindContext<'_>, scene: &SceneData) {
        if !cx.is_used(Self::RESULT) {
            return;
        }
        let u = cx.uid();
        let count = scene.lights.len().min(self.capacity());
        if count < scene.lights.len() {
            log::debug!(
                "lighting {count} of {} lights, raise max_lights to see the rest",
                scene.lights.len()
            );
        }
        let lights = &scene.lights[..count];

        cx.set_uniform(&format!("uLightCount{u}"), count as i32);
        cx.set_uniform(&format!("uAmbientColor{u}"), scene.ambient_color);
        if lights.is_empty() {
            return;
        }

        let collect = |f: fn(&Light) -> Vec3| lights.iter().map(f).collect::<Vec<_>>();
        cx.set_uniform(
            &format!("uLightRadiance{u}"),
            UniformValue::vec3_array(&collect(Light::radiance)),
        );
        cx.set_uniform(
            &format!("uLightDirection{u}"),
            UniformValue::vec3_array(&collect(|l: &Light| l.direction)),
        );
        cx.set_uniform(
            &format!("uLightPosition{u}"),
            UniformValue::vec3_array(&collect(|l: &Light| l.position)),
        );
        let params: Vec<_> = lights.iter().map(Light::packed_params).collect();
        cx.set_uniform(&format!("uLightParams{u}"), UniformValue::vec4_array(&params));
    }

    fn save_params(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn load_params(&mut self, params: serde_json::Value) -> Result<(), serde_json::Error> {
        *self = serde_json::from_value(params)?;
        Ok(())
    }
}
