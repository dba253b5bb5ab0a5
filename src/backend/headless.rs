//! A [`ShaderBackend`] that needs no GPU.
//!
//! Stages "compile" when they carry a `#version` line, a `main` entry point
//! and balanced braces. Linking checks that every fragment input is written by
//! the vertex stage with the same type, then reports the attributes and
//! uniforms that are declared at file scope and referenced somewhere else, the
//! way a driver drops unused variables. Every render-time call is recorded so
//! tests and tools can inspect what a program pushed.

use std::collections::{BTreeMap, HashMap};

use super::{
    ActiveVariable, BackendError, ProgramHandle, RenderState, ShaderBackend, StageHandle,
    UniformValue,
};
use crate::mesh::VertexAttribute;
use crate::render_data::{MeshData, TextureId};
use crate::types::{GlslType, Stage};

#[derive(Debug)]
struct StageObject {
    stage: Stage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    stages: Vec<u32>,
    linked: bool,
    log: String,
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    values: HashMap<i32, UniformValue>,
}

/// In-memory shader backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    stages: HashMap<u32, StageObject>,
    programs: HashMap<u32, ProgramObject>,
    failures: HashMap<Stage, String>,
    refuse_objects: bool,
    current_program: Option<ProgramHandle>,
    bound_textures: BTreeMap<u32, TextureId>,
    enabled_attributes: Vec<(i32, String)>,
    render_state: RenderState,
    draws: Vec<String>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every compile of `stage` fail with `log` until cleared.
    pub fn fail_compilation(&mut self, stage: Stage, log: impl Into<String>) {
        self.failures.insert(stage, log.into());
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Makes stage and program creation fail, as on a lost context.
    pub fn refuse_objects(&mut self, refuse: bool) {
        self.refuse_objects = refuse;
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn is_program_alive(&self, program: ProgramHandle) -> bool {
        self.programs.contains_key(&program.0)
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    /// Last value uploaded to uniform `name` of `program`.
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<&UniformValue> {
        let object = self.programs.get(&program.0)?;
        let array_name = format!("{name}[0]");
        let location = object
            .uniforms
            .iter()
            .find(|u| u.name == name || u.name == array_name)?
            .location;
        object.values.get(&location)
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.bound_textures.get(&unit).copied()
    }

    pub fn render_state(&self) -> RenderState {
        self.render_state
    }

    pub fn enabled_attributes(&self) -> &[(i32, String)] {
        &self.enabled_attributes
    }

    /// Names of the meshes drawn so far.
    pub fn draws(&self) -> &[String] {
        &self.draws
    }

    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn link_program(&self, object: &ProgramObject) -> Result<(Vec<ActiveVariable>, Vec<ActiveVariable>), String> {
        let stage_source = |wanted: Stage| {
            object
                .stages
                .iter()
                .filter_map(|id| self.stages.get(id))
                .find(|s| s.stage == wanted && s.compiled)
                .map(|s| s.source.as_str())
        };
        let vertex = stage_source(Stage::Vertex).ok_or("error: no compiled vertex stage attached")?;
        let fragment =
            stage_source(Stage::Fragment).ok_or("error: no compiled fragment stage attached")?;

        let vertex_decls = declarations(vertex);
        let fragment_decls = declarations(fragment);

        for input in fragment_decls
            .iter()
            .filter(|d| matches!(d.qualifier, "in" | "varying"))
        {
            let output = vertex_decls
                .iter()
                .find(|d| matches!(d.qualifier, "out" | "varying") && d.name == input.name);
            match output {
                None => {
                    return Err(format!(
                        "error: fragment input `{}` is not written by the vertex stage",
                        input.name
                    ));
                }
                Some(output) if output.ty != input.ty => {
                    return Err(format!(
                        "error: `{}` is {} in the vertex stage but {} in the fragment stage",
                        input.name, output.ty, input.ty
                    ));
                }
                Some(_) => {}
            }
        }

        let mut attributes = Vec::new();
        for decl in vertex_decls
            .iter()
            .filter(|d| matches!(d.qualifier, "in" | "attribute"))
        {
            if count_mentions(vertex, decl.name) > 1 {
                attributes.push(ActiveVariable {
                    name: decl.name.to_string(),
                    ty: decl.ty,
                    size: 1,
                    location: attributes.len() as i32,
                });
            }
        }

        let mut uniforms: Vec<ActiveVariable> = Vec::new();
        let mut seen: BTreeMap<&str, GlslType> = BTreeMap::new();
        let all_decls = vertex_decls.iter().chain(fragment_decls.iter());
        for decl in all_decls.filter(|d| d.qualifier == "uniform") {
            if let Some(ty) = seen.get(decl.name) {
                if *ty != decl.ty {
                    return Err(format!(
                        "error: uniform `{}` declared as both {} and {}",
                        decl.name, ty, decl.ty
                    ));
                }
                continue;
            }
            seen.insert(decl.name, decl.ty);

            let declared = vertex_decls
                .iter()
                .chain(fragment_decls.iter())
                .filter(|d| d.qualifier == "uniform" && d.name == decl.name)
                .count();
            let mentioned = count_mentions(vertex, decl.name) + count_mentions(fragment, decl.name);
            if mentioned > declared {
                let (name, size) = match decl.array {
                    Some(len) => (format!("{}[0]", decl.name), len),
                    None => (decl.name.to_string(), 1),
                };
                uniforms.push(ActiveVariable {
                    name,
                    ty: decl.ty,
                    size,
                    location: uniforms.len() as i32,
                });
            }
        }

        Ok((attributes, uniforms))
    }
}

/// A file-scope interface declaration.
#[derive(Debug, PartialEq)]
struct Declaration<'a> {
    qualifier: &'a str,
    ty: GlslType,
    name: &'a str,
    array: Option<u32>,
}

fn declarations(source: &str) -> Vec<Declaration<'_>> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    for line in source.lines() {
        let trimmed = line.trim();
        if depth == 0 {
            if let Some(decl) = parse_declaration(trimmed) {
                out.push(decl);
            }
        }
        depth += trimmed.matches('{').count() as i32;
        depth -= trimmed.matches('}').count() as i32;
    }
    out
}

fn parse_declaration(line: &str) -> Option<Declaration<'_>> {
    let line = line.strip_suffix(';')?;
    let mut tokens = line.split_whitespace();
    let qualifier = tokens.next()?;
    if !matches!(qualifier, "uniform" | "attribute" | "varying" | "in" | "out") {
        return None;
    }
    let ty = GlslType::from_name(tokens.next()?)?;
    let declarator = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    let (name, array) = match declarator.split_once('[') {
        Some((name, rest)) => (name, rest.trim_end_matches(']').parse().ok()),
        None => (declarator, None),
    };
    Some(Declaration {
        qualifier,
        ty,
        name,
        array,
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whole-word occurrences of `name` in `source`.
fn count_mentions(source: &str, name: &str) -> usize {
    source
        .match_indices(name)
        .filter(|(start, _)| {
            let before = source[..*start].chars().next_back();
            let after = source[start + name.len()..].chars().next();
            !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
        })
        .count()
}

fn check_source(source: &str) -> Result<(), String> {
    let first = source.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if !first.starts_with("#version") {
        return Err("ERROR: 0:1: '#version' directive must come first".to_string());
    }
    if !source.contains("void main()") {
        return Err("ERROR: missing entry point `void main()`".to_string());
    }
    let mut depth = 0i32;
    for (i, line) in source.lines().enumerate() {
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("ERROR: 0:{}: unexpected '}}'", i + 1));
            }
        }
    }
    if depth != 0 {
        return Err("ERROR: unexpected end of file, missing '}'".to_string());
    }
    Ok(())
}

impl ShaderBackend for HeadlessBackend {
    fn create_shader_stage(&mut self, stage: Stage) -> Result<StageHandle, BackendError> {
        if self.refuse_objects {
            return Err(BackendError::StageCreation(stage));
        }
        let handle = self.next_handle();
        self.stages.insert(
            handle,
            StageObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        Ok(StageHandle(handle))
    }

    fn compile(&mut self, stage: StageHandle, source: &str) -> bool {
        let Some(object) = self.stages.get_mut(&stage.0) else {
            return false;
        };
        object.source = source.to_string();
        let result = match self.failures.get(&object.stage) {
            Some(log) => Err(log.clone()),
            None => check_source(source),
        };
        match result {
            Ok(()) => {
                object.compiled = true;
                object.log.clear();
                true
            }
            Err(log) => {
                object.compiled = false;
                object.log = log;
                false
            }
        }
    }

    fn shader_log(&self, stage: StageHandle) -> String {
        self.stages
            .get(&stage.0)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage.0);
    }

    fn create_program(&mut self) -> Result<ProgramHandle, BackendError> {
        if self.refuse_objects {
            return Err(BackendError::ProgramCreation);
        }
        let handle = self.next_handle();
        self.programs.insert(handle, ProgramObject::default());
        Ok(ProgramHandle(handle))
    }

    fn attach(&mut self, program: ProgramHandle, stage: StageHandle) {
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.stages.push(stage.0);
        }
    }

    fn detach(&mut self, program: ProgramHandle, stage: StageHandle) {
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.stages.retain(|s| *s != stage.0);
        }
    }

    fn link(&mut self, program: ProgramHandle) -> bool {
        let Some(object) = self.programs.get(&program.0) else {
            return false;
        };
        let result = self.link_program(object);
        let Some(object) = self.programs.get_mut(&program.0) else {
            return false;
        };
        match result {
            Ok((attributes, uniforms)) => {
                object.linked = true;
                object.log.clear();
                object.attributes = attributes;
                object.uniforms = uniforms;
                true
            }
            Err(log) => {
                object.linked = false;
                object.log = log;
                false
            }
        }
    }

    fn program_log(&self, program: ProgramHandle) -> String {
        self.programs
            .get(&program.0)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(&program.0)
            .filter(|p| p.linked)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(&program.0)
            .filter(|p| p.linked)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: i32, value: &UniformValue) {
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.values.insert(location, value.clone());
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.bound_textures.insert(unit, texture);
    }

    fn enable_vertex_attribute(&mut self, location: i32, attribute: &VertexAttribute, _stride: u32) {
        self.enabled_attributes.push((location, attribute.name.clone()));
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.render_state = state;
    }

    fn draw_mesh(&mut self, mesh: &MeshData) {
        self.draws.push(mesh.name.clone());
    }
}
