//! Reflection of the WGSL interface a program exposes to the host: entry
//! points, `@location` vertex inputs of the vertex entry point, and the single
//! `var<uniform>` block as laid out by the WGSL front end.
//!
//! Backends answer `attrib_location`/`uniform_location` from this instead of
//! hard-coding bindings, so renaming a field in the shader is enough to make a
//! lookup go absent.

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Function, Module, Scalar, ShaderStage, TypeInner, VectorSize};

use crate::gpu::{ShaderKind, UniformLocation, UniformType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    pub components: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub offset: u32,
    pub ty: UniformType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub var_name: String,
    pub group: u32,
    pub binding: u32,
    pub fields: Vec<UniformField>,
    /// Size in bytes, rounded up to the block alignment.
    pub size: u32,
}

/// What a single WGSL module declares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderInterface {
    pub vertex_entry: Option<String>,
    pub fragment_entry: Option<String>,
    pub inputs: Vec<VertexInput>,
    pub uniforms: Option<UniformBlock>,
}

impl ShaderInterface {
    /// Reflects `source`, requiring an entry point for `kind`.
    pub fn parse_for(kind: ShaderKind, source: &str) -> Result<Self, String> {
        let interface = Self::parse(source)?;
        if interface.entry_point(kind).is_none() {
            let attribute = match kind {
                ShaderKind::Vertex => "@vertex",
                ShaderKind::Fragment => "@fragment",
            };
            return Err(format!("error: {kind} shader declares no {attribute} entry point"));
        }
        Ok(interface)
    }

    /// Parses and validates `source`. The error string is the compiler
    /// diagnostic.
    pub fn parse(source: &str) -> Result<Self, String> {
        let module = wgsl::parse_str(source).map_err(|err| err.emit_to_string(source))?;
        Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .map_err(|err| err.emit_to_string(source))?;
        Self::from_module(&module)
    }

    pub fn entry_point(&self, kind: ShaderKind) -> Option<&str> {
        match kind {
            ShaderKind::Vertex => self.vertex_entry.as_deref(),
            ShaderKind::Fragment => self.fragment_entry.as_deref(),
        }
    }

    fn from_module(module: &Module) -> Result<Self, String> {
        let mut interface = Self::default();
        for entry in &module.entry_points {
            match entry.stage {
                ShaderStage::Vertex => {
                    if interface.vertex_entry.is_some() {
                        return Err("error: multiple @vertex entry points".into());
                    }
                    interface.inputs = vertex_inputs(module, &entry.function)?;
                    interface.vertex_entry = Some(entry.name.clone());
                }
                ShaderStage::Fragment => {
                    if interface.fragment_entry.is_some() {
                        return Err("error: multiple @fragment entry points".into());
                    }
                    interface.fragment_entry = Some(entry.name.clone());
                }
                _ => {}
            }
        }
        interface.uniforms = uniform_block(module)?;
        Ok(interface)
    }
}

/// The interface of a linked vertex + fragment pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub inputs: Vec<VertexInput>,
    pub uniforms: Option<UniformBlock>,
}

impl ProgramInterface {
    /// Checks that both stages have entry points and agree on the uniform
    /// block; the error string is the link diagnostic.
    pub fn link(vertex: &ShaderInterface, fragment: &ShaderInterface) -> Result<Self, String> {
        let vertex_entry = vertex
            .vertex_entry
            .clone()
            .ok_or_else(|| "error: vertex stage has no @vertex entry point".to_string())?;
        let fragment_entry = fragment
            .fragment_entry
            .clone()
            .ok_or_else(|| "error: fragment stage has no @fragment entry point".to_string())?;

        let uniforms = match (&vertex.uniforms, &fragment.uniforms) {
            (Some(a), Some(b)) if a != b => {
                return Err(format!(
                    "error: uniform block `{}` differs between the vertex and fragment stages",
                    a.var_name
                ));
            }
            (Some(block), _) | (None, Some(block)) => Some(block.clone()),
            (None, None) => None,
        };

        Ok(Self {
            vertex_entry,
            fragment_entry,
            inputs: vertex.inputs.clone(),
            uniforms,
        })
    }

    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| input.location)
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .as_ref()?
            .fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| UniformLocation {
                offset: field.offset,
                ty: field.ty,
            })
    }

    pub fn uniform_block_size(&self) -> u32 {
        self.uniforms.as_ref().map_or(0, |block| block.size)
    }
}

fn vertex_inputs(module: &Module, function: &Function) -> Result<Vec<VertexInput>, String> {
    let mut inputs = Vec::new();
    for argument in &function.arguments {
        let name = argument.name.clone().unwrap_or_default();
        let inner = &module.types[argument.ty].inner;
        match (&argument.binding, inner) {
            (Some(Binding::Location { location, .. }), _) => {
                inputs.push(vertex_input(name, *location, inner)?);
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        let name = member.name.clone().unwrap_or_default();
                        inputs.push(vertex_input(name, location, &module.types[member.ty].inner)?);
                    }
                }
            }
            _ => {}
        }
    }
    inputs.sort_by_key(|input| input.location);
    Ok(inputs)
}

fn vertex_input(name: String, location: u32, inner: &TypeInner) -> Result<VertexInput, String> {
    let components = match *inner {
        TypeInner::Scalar(Scalar::F32) => 1,
        TypeInner::Vector {
            size,
            scalar: Scalar::F32,
        } => size as u8,
        _ => return Err(format!("error: unsupported vertex input type for `{name}`")),
    };
    Ok(VertexInput {
        name,
        location,
        components,
    })
}

fn uniform_block(module: &Module) -> Result<Option<UniformBlock>, String> {
    let mut uniforms = module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .filter(|var| var.space == AddressSpace::Uniform);
    let Some(var) = uniforms.next() else {
        return Ok(None);
    };
    if uniforms.next().is_some() {
        return Err("error: only one var<uniform> block is supported".into());
    }

    let var_name = var.name.clone().unwrap_or_default();
    let resource = var
        .binding
        .as_ref()
        .ok_or_else(|| format!("error: uniform `{var_name}` is missing @group/@binding"))?;
    let inner = &module.types[var.ty].inner;
    let (fields, size) = match inner {
        TypeInner::Struct { members, span } => {
            let fields = members
                .iter()
                .map(|member| {
                    let name = member.name.clone().unwrap_or_default();
                    let ty = uniform_type(&module.types[member.ty].inner).ok_or_else(|| {
                        format!("error: unsupported uniform member type for `{name}`")
                    })?;
                    Ok(UniformField {
                        name,
                        offset: member.offset,
                        ty,
                    })
                })
                .collect::<Result<Vec<_>, String>>()?;
            (fields, *span)
        }
        other => {
            let ty = uniform_type(other)
                .ok_or_else(|| format!("error: unsupported type for uniform `{var_name}`"))?;
            let field = UniformField {
                name: var_name.clone(),
                offset: 0,
                ty,
            };
            // Bare uniforms bind at least one 16-byte slot.
            (vec![field], other.size(module.to_ctx()).div_ceil(16) * 16)
        }
    };

    Ok(Some(UniformBlock {
        var_name,
        group: resource.group,
        binding: resource.binding,
        fields,
        size,
    }))
}

fn uniform_type(inner: &TypeInner) -> Option<UniformType> {
    Some(match *inner {
        TypeInner::Scalar(Scalar::F32) => UniformType::Float,
        TypeInner::Vector {
            size,
            scalar: Scalar::F32,
        } => match size {
            VectorSize::Bi => UniformType::Vec2,
            VectorSize::Tri => UniformType::Vec3,
            VectorSize::Quad => UniformType::Vec4,
        },
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            scalar: Scalar::F32,
        } => UniformType::Mat3,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar: Scalar::F32,
        } => UniformType::Mat4,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn reflects_vertex_inputs_and_uniform_layout() {
        let interface = ShaderInterface::parse_for(ShaderKind::Vertex, VERTEX_SHADER).unwrap();
        assert_eq!(interface.vertex_entry.as_deref(), Some("vs_main"));
        let names: Vec<_> = interface
            .inputs
            .iter()
            .map(|i| (i.name.as_str(), i.location, i.components))
            .collect();
        assert_eq!(names, vec![("position", 0, 3), ("normal", 1, 3)]);

        let block = interface.uniforms.unwrap();
        let offsets: Vec<_> = block
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("world_view_projection", 0),
                ("world", 64),
                ("world_inverse_transpose", 128),
                ("color", 192),
                ("light_world_position", 208),
                ("view_world_position", 224),
                ("light_color", 240),
                ("specular_color", 256),
                ("shininess", 268),
            ]
        );
        assert_eq!(block.size, 272);
    }

    #[test]
    fn links_matching_stages() {
        let vertex = ShaderInterface::parse_for(ShaderKind::Vertex, VERTEX_SHADER).unwrap();
        let fragment = ShaderInterface::parse_for(ShaderKind::Fragment, FRAGMENT_SHADER).unwrap();
        let program = ProgramInterface::link(&vertex, &fragment).unwrap();
        assert_eq!(program.fragment_entry, "fs_main");
        assert_eq!(program.attrib_location("normal"), Some(1));
        assert_eq!(program.attrib_location("a_texcoord"), None);
        let shininess = program.uniform_location("shininess").unwrap();
        assert_eq!(shininess.ty(), UniformType::Float);
        assert!(program.uniform_location("u_missing").is_none());
    }

    #[test]
    fn rejects_mismatched_uniform_blocks() {
        let vertex = ShaderInterface::parse(
            "struct U { a: f32, }
             @group(0) @binding(0) var<uniform> u: U;
             @vertex fn vs(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                 return vec4<f32>(p, u.a);
             }",
        )
        .unwrap();
        let fragment = ShaderInterface::parse(
            "struct U { a: vec4<f32>, }
             @group(0) @binding(0) var<uniform> u: U;
             @fragment fn fs() -> @location(0) vec4<f32> { return u.a; }",
        )
        .unwrap();
        let err = ProgramInterface::link(&vertex, &fragment).unwrap_err();
        assert!(err.contains("differs"), "{err}");
        assert_eq!(vertex.inputs[0].name, "p");
    }

    #[test]
    fn compile_errors_carry_a_diagnostic() {
        let err = ShaderInterface::parse("@vertex fn main( {").unwrap_err();
        assert!(err.starts_with("error:"), "{err}");

        let err = ShaderInterface::parse_for(ShaderKind::Vertex, FRAGMENT_SHADER).unwrap_err();
        assert!(err.contains("@vertex"), "{err}");

        let err = ShaderInterface::parse(
            "struct U { m: vec4<u32>, }
             @group(0) @binding(0) var<uniform> u: U;",
        )
        .unwrap_err();
        assert!(err.contains("unsupported uniform member type"), "{err}");
    }

    #[test]
    fn explicit_align_and_size_attributes_shape_the_layout() {
        let interface = ShaderInterface::parse(
            "struct U { a: f32, @align(16) b: f32, @size(32) c: vec4<f32>, d: f32, }
             @group(0) @binding(0) var<uniform> u: U;
             @fragment fn fs() -> @location(0) vec4<f32> { return u.c * (u.a + u.b + u.d); }",
        )
        .unwrap();
        let block = interface.uniforms.unwrap();
        let offsets: Vec<_> = block
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(offsets, vec![("a", 0), ("b", 16), ("c", 32), ("d", 64)]);
        assert_eq!(block.size, 80);
    }

    #[test]
    fn bare_uniform_becomes_a_single_field() {
        let interface = ShaderInterface::parse(
            "@group(0) @binding(2) var<uniform> tint: vec4<f32>;
             @fragment fn fs() -> @location(0) vec4<f32> { return tint; }",
        )
        .unwrap();
        let block = interface.uniforms.unwrap();
        assert_eq!(block.binding, 2);
        assert_eq!(
            block.fields,
            vec![UniformField {
                name: "tint".into(),
                offset: 0,
                ty: UniformType::Vec4,
            }]
        );
        assert_eq!(block.size, 16);
    }

    #[test]
    fn vertex_inputs_come_from_struct_members_in_location_order() {
        let interface = ShaderInterface::parse(
            "struct In { @location(1) n: vec3<f32>, @location(0) p: vec2<f32>, }
             @vertex fn vs(input: In) -> @builtin(position) vec4<f32> {
                 return vec4<f32>(input.p, input.n.x, 1.0);
             }",
        )
        .unwrap();
        let inputs: Vec<_> = interface
            .inputs
            .iter()
            .map(|i| (i.name.as_str(), i.location, i.components))
            .collect();
        assert_eq!(inputs, vec![("p", 0, 2), ("n", 1, 3)]);
    }

    #[test]
    fn comments_are_ignored() {
        let interface = ShaderInterface::parse(
            "// struct Fake { x: f32, }
             /* @vertex fn nope() {} */
             @fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        )
        .unwrap();
        assert!(interface.vertex_entry.is_none());
        assert_eq!(interface.fragment_entry.as_deref(), Some("fs"));
    }
}
