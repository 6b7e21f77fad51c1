//! Shader compilation, program linking and location lookup.
//!
//! None of these calls are idempotent: each one creates fresh GPU objects,
//! and on failure every object created along the way is deleted again.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::{LocationKind, MissingLocation, RenderError, Result};
use crate::gpu::{GpuCommands, ProgramHandle, ShaderHandle, ShaderKind, UniformLocation};

/// A linked program and the locations looked up right after linking.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    program: ProgramHandle,
    attributes: HashMap<String, Option<u32>>,
    uniforms: HashMap<String, Option<UniformLocation>>,
    missing: Vec<MissingLocation>,
}

impl CompiledProgram {
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// `None` both for names that were never requested and for names the
    /// program does not expose.
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied().flatten()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied().flatten()
    }

    /// Requires a location, turning an absent one into an error.
    pub fn require_attribute(&self, name: &str) -> Result<u32> {
        self.attribute(name).ok_or_else(|| {
            RenderError::MissingLocation(MissingLocation {
                name: name.to_string(),
                kind: LocationKind::Attribute,
            })
        })
    }

    /// Requested names the program does not expose, in request order.
    pub fn missing(&self) -> &[MissingLocation] {
        &self.missing
    }
}

pub fn compile_shader<G: GpuCommands + ?Sized>(
    gpu: &mut G,
    kind: ShaderKind,
    source: &str,
) -> Result<ShaderHandle> {
    let shader = gpu.create_shader(kind)?;
    match gpu.compile_shader(shader, source) {
        Ok(true) => {
            debug!("compiled {kind} shader {}", shader.id());
            Ok(shader)
        }
        Ok(false) => {
            let log = gpu.shader_info_log(shader);
            gpu.delete_shader(shader);
            Err(RenderError::ShaderCompile { kind, log })
        }
        Err(err) => {
            gpu.delete_shader(shader);
            Err(err.into())
        }
    }
}

/// Links `vertex` and `fragment` into a new program. The shaders stay owned
/// by the caller whatever the outcome.
pub fn link_program<G: GpuCommands + ?Sized>(
    gpu: &mut G,
    vertex: ShaderHandle,
    fragment: ShaderHandle,
) -> Result<ProgramHandle> {
    let program = gpu.create_program()?;
    let linked = gpu
        .attach_shader(program, vertex)
        .and_then(|()| gpu.attach_shader(program, fragment))
        .and_then(|()| gpu.link_program(program));
    match linked {
        Ok(true) => {
            debug!("linked program {}", program.id());
            Ok(program)
        }
        Ok(false) => {
            let log = gpu.program_info_log(program);
            gpu.delete_program(program);
            Err(RenderError::ProgramLink { log })
        }
        Err(err) => {
            gpu.delete_program(program);
            Err(err.into())
        }
    }
}

/// Looks up every requested name once. Absent names are logged and recorded,
/// never fatal.
pub fn resolve_locations<G: GpuCommands + ?Sized>(
    gpu: &G,
    program: ProgramHandle,
    attribute_names: &[&str],
    uniform_names: &[&str],
) -> CompiledProgram {
    let mut missing = Vec::new();
    let mut note_missing = |name: &str, kind: LocationKind| {
        let location = MissingLocation {
            name: name.to_string(),
            kind,
        };
        warn!("{location}");
        missing.push(location);
    };

    let mut attributes = HashMap::with_capacity(attribute_names.len());
    for &name in attribute_names {
        let location = gpu.attrib_location(program, name);
        if location.is_none() {
            note_missing(name, LocationKind::Attribute);
        }
        attributes.insert(name.to_string(), location);
    }

    let mut uniforms = HashMap::with_capacity(uniform_names.len());
    for &name in uniform_names {
        let location = gpu.uniform_location(program, name);
        if location.is_none() {
            note_missing(name, LocationKind::Uniform);
        }
        uniforms.insert(name.to_string(), location);
    }

    CompiledProgram {
        program,
        attributes,
        uniforms,
        missing,
    }
}

/// Compile both stages, link them, delete the shader objects and resolve
/// locations.
pub fn build_program<G: GpuCommands + ?Sized>(
    gpu: &mut G,
    vertex_source: &str,
    fragment_source: &str,
    attribute_names: &[&str],
    uniform_names: &[&str],
) -> Result<CompiledProgram> {
    let vertex = compile_shader(gpu, ShaderKind::Vertex, vertex_source)?;
    let fragment = match compile_shader(gpu, ShaderKind::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            gpu.delete_shader(vertex);
            return Err(err);
        }
    };
    let linked = link_program(gpu, vertex, fragment);
    gpu.delete_shader(vertex);
    gpu.delete_shader(fragment);
    let program = linked?;
    Ok(resolve_locations(gpu, program, attribute_names, uniform_names))
}
