use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::backend::UniformValue;
use crate::mesh::attribute;
use crate::node::{BindContext, EmitContext, ShaderNode};
use crate::port::Port;
use crate::render_data::ObjectData;
use crate::types::{GlslType, Scope, Semantic};

/// World-space position, normal and tangent frame of the current vertex.
///
/// Rigid objects are transformed by the object's world matrix. With
/// `max_bones > 0` the node also reads `JOINTS_n`/`WEIGHTS_n` and blends a
/// bone palette whenever the drawn object supplies bone matrices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VertexNode {
    /// Bone palette size; 0 disables skinning.
    pub max_bones: u32,
    /// Number of `JOINTS_n`/`WEIGHTS_n` attribute pairs.
    pub bone_sets: u32,
}

impl Default for VertexNode {
    fn default() -> Self {
        Self {
            max_bones: 0,
            bone_sets: 1,
        }
    }
}

impl VertexNode {
    pub const POSITION: usize = 0;
    pub const NORMAL: usize = 1;
    /// Tangent, bitangent, normal matrix.
    pub const TBN: usize = 2;

    pub fn skinned(max_bones: u32, bone_sets: u32) -> Self {
        Self {
            max_bones,
            bone_sets,
        }
    }

    fn has_bones(&self) -> bool {
        self.max_bones > 0 && self.bone_sets > 0
    }

    fn any_used(cx: &EmitContext<'_>) -> bool {
        cx.is_used(Self::POSITION) || cx.is_used(Self::NORMAL) || cx.is_used(Self::TBN)
    }
}

impl ShaderNode for VertexNode {
    fn class_id(&self) -> &'static str {
        "vertex"
    }

    fn outputs(&self) -> Vec<Port> {
        vec![
            Port::new("position", GlslType::Vec3)
                .scope(Scope::VaryingOut)
                .semantic(Semantic::Point),
            Port::new("normal", GlslType::Vec3)
                .scope(Scope::VaryingOut)
                .semantic(Semantic::Direction),
            Port::new("tbn", GlslType::Mat3).scope(Scope::VaryingOut),
        ]
    }

    fn declaration_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !Self::any_used(cx) {
            return Ok(());
        }
        let keywords = cx.keywords();
        let u = cx.uid();

        writeln!(out, "uniform mat4 uWorldMatrix{u};")?;
        if self.has_bones() {
            writeln!(out, "uniform mat4 uBoneMatrices{u}[{}];", self.max_bones)?;
            writeln!(out, "uniform bool uUseBones{u};")?;
            for set in 0..self.bone_sets {
                cx.declare_attribute(out, GlslType::Vec4, &attribute::joints(set))?;
                cx.declare_attribute(out, GlslType::Vec4, &attribute::weights(set))?;
            }
        }

        if cx.is_used(Self::POSITION) {
            cx.declare_attribute(out, GlslType::Vec3, attribute::POSITION)?;
            writeln!(out, "{} {};", keywords.varying_out, cx.port(Self::POSITION).typed_ref())?;
        }
        if cx.is_used(Self::NORMAL) || cx.is_used(Self::TBN) {
            cx.declare_attribute(out, GlslType::Vec3, attribute::NORMAL)?;
        }
        if cx.is_used(Self::NORMAL) {
            writeln!(out, "{} {};", keywords.varying_out, cx.port(Self::NORMAL).typed_ref())?;
        }
        if cx.is_used(Self::TBN) {
            cx.declare_attribute(out, GlslType::Vec4, attribute::TANGENT)?;
            writeln!(out, "{} {};", keywords.varying_out, cx.port(Self::TBN).typed_ref())?;
        }
        Ok(())
    }

    fn execution_vert(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        if !Self::any_used(cx) {
            return Ok(());
        }
        let u = cx.uid();
        let world = format!("uWorldMatrix{u}");

        let matrix = if self.has_bones() {
            let skinning = format!("skinning{u}");
            writeln!(out, "mat4 {skinning} = {world};")?;
            writeln!(out, "if (uUseBones{u}) {{")?;
            writeln!(out, "    {skinning} = mat4(0.0);")?;
            for set in 0..self.bone_sets {
                let joints = attribute::joints(set);
                let weights = attribute::weights(set);
                for c in ["x", "y", "z", "w"] {
                    writeln!(
                        out,
                        "    if ({weights}.{c} > 0.0) {skinning} += {weights}.{c} * uBoneMatrices{u}[int({joints}.{c})];"
                    )?;
                }
            }
            writeln!(out, "}}")?;
            skinning
        } else {
            world
        };

        if cx.is_used(Self::POSITION) {
            writeln!(
                out,
                "{} = ({matrix} * vec4({}, 1.0)).xyz;",
                cx.port(Self::POSITION).reference(),
                attribute::POSITION
            )?;
        }

        if cx.is_used(Self::NORMAL) || cx.is_used(Self::TBN) {
            // a tangent frame alone keeps the normal local to the vertex stage
            let (normal, assigned) = if cx.is_used(Self::NORMAL) {
                let normal = cx.port(Self::NORMAL).reference();
                (normal.clone(), normal)
            } else {
                let normal = format!("worldNormal{u}");
                (normal.clone(), format!("vec3 {normal}"))
            };
            writeln!(
                out,
                "mat3 normalMat{u} = mat3({matrix}[0].xyz, {matrix}[1].xyz, {matrix}[2].xyz);"
            )?;
            writeln!(out, "{assigned} = normalize(normalMat{u} * {});", attribute::NORMAL)?;

            if cx.is_used(Self::TBN) {
                let tangent = attribute::TANGENT;
                writeln!(out, "vec3 tangent{u} = normalize(normalMat{u} * {tangent}.xyz);")?;
                writeln!(out, "vec3 bitangent{u} = cross({normal}, tangent{u}) * {tangent}.w;")?;
                writeln!(
                    out,
                    "{} = mat3(tangent{u}, bitangent{u}, {normal});",
                    cx.port(Self::TBN).reference()
                )?;
            }
        }
        Ok(())
    }

    fn declaration_frag(&self, cx: &mut EmitContext<'_>, out: &mut String) -> fmt::Result {
        let varying_in = cx.keywords().varying_in;
        for index in [Self::POSITION, Self::NORMAL, Self::TBN] {
            if cx.is_used(index) {
                writeln!(out, "{varying_in} {};", cx.port(index).typed_ref())?;
            }
        }
        Ok(())
    }

    fn prepare_object_data(&self, cx: &mut BindContext<'_>, object: &ObjectData) {
        let u = cx.uid();
        cx.set_uniform(&format!("uWorldMatrix{u}"), object.world_matrix);

        if self.has_bones() {
            let bones = &object.bone_matrices;
            cx.set_uniform(&format!("uUseBones{u}"), !bones.is_empty());
            if !bones.is_empty() {
                let count = bones.len().min(self.max_bones as usize);
                cx.set_uniform(
                    &format!("uBoneMatrices{u}"),
                    UniformValue::mat4_array(&bones[..count]),
                );
            }
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
