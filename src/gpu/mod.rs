//! The GPU command interface the renderer is written against.
//!
//! The contract mirrors a GL-style immediate API: shader and program objects,
//! buffers bound to targets, vertex arrays holding attribute layouts, uniform
//! uploads to the program in use, and state toggles. Handles are opaque
//! `Copy` ids; every backend is free to map them onto its own resources.

use std::fmt;

use crate::error::GpuError;

pub mod recording;
pub mod reflect;
#[cfg(not(target_arch = "wasm32"))]
pub mod wgpu_backend;

pub use recording::{GpuCommand, RecordingGpu, UniformValue};
#[cfg(not(target_arch = "wasm32"))]
pub use wgpu_backend::WgpuBackend;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn id(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Compiled (or failed) shader object.
    ShaderHandle
);
handle!(
    /// Program object linking one vertex and one fragment shader.
    ProgramHandle
);
handle!(BufferHandle);
handle!(VertexArrayHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageHint {
    StaticDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
}

impl ComponentType {
    pub fn size(self) -> u32 {
        match self {
            Self::Float => 4,
        }
    }
}

/// How a vertex attribute reads its bound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribLayout {
    pub components: u8,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Bytes between consecutive vertices; `0` means tightly packed.
    pub stride: u32,
    pub offset: u32,
}

impl AttribLayout {
    /// Three floats per vertex, not normalized, tightly packed from the start
    /// of the buffer.
    pub const fn packed_vec3() -> Self {
        Self {
            components: 3,
            component_type: ComponentType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Stride after resolving the tightly-packed `0`.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            u32::from(self.components) * self.component_type.size()
        } else {
            self.stride
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Mat3 => "mat3x3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        })
    }
}

/// Resolved uniform: byte offset inside the program's uniform block and the
/// declared type, so uploads of the wrong shape are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub(crate) offset: u32,
    pub(crate) ty: UniformType,
}

impl UniformLocation {
    pub fn offset(self) -> u32 {
        self.offset
    }

    pub fn ty(self) -> UniformType {
        self.ty
    }

    pub(crate) fn expect(self, actual: UniformType) -> Result<(), GpuError> {
        if self.ty == actual {
            Ok(())
        } else {
            Err(GpuError::UniformTypeMismatch {
                offset: self.offset,
                expected: self.ty,
                actual,
            })
        }
    }
}

/// The buffer-upload subset of the GPU interface. Geometry upload only needs
/// this much.
pub trait BufferUpload {
    fn create_buffer(&mut self) -> Result<BufferHandle, GpuError>;
    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Option<BufferHandle>,
    ) -> Result<(), GpuError>;
    /// Replaces the contents of the buffer bound to `target`.
    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[f32],
        usage: UsageHint,
    ) -> Result<(), GpuError>;
    fn delete_buffer(&mut self, buffer: BufferHandle);
}

/// GL-style command interface. All calls are synchronous from the caller's
/// point of view and none of them is idempotent: every `create_*` returns a
/// new resource the caller must eventually delete.
pub trait GpuCommands: BufferUpload {
    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderHandle, GpuError>;
    /// Compiles `source` into `shader`; `Ok(false)` means the compiler
    /// rejected it and [`shader_info_log`](Self::shader_info_log) holds the
    /// diagnostic.
    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> Result<bool, GpuError>;
    fn shader_info_log(&self, shader: ShaderHandle) -> String;
    fn delete_shader(&mut self, shader: ShaderHandle);

    fn create_program(&mut self) -> Result<ProgramHandle, GpuError>;
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle)
        -> Result<(), GpuError>;
    /// `Ok(false)` means linking failed; see [`program_info_log`](Self::program_info_log).
    fn link_program(&mut self, program: ProgramHandle) -> Result<bool, GpuError>;
    fn program_info_log(&self, program: ProgramHandle) -> String;
    fn delete_program(&mut self, program: ProgramHandle);
    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), GpuError>;
    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, GpuError>;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>)
        -> Result<(), GpuError>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    /// Points `location` of the bound vertex array at the buffer currently
    /// bound to [`BufferTarget::Array`].
    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribLayout)
        -> Result<(), GpuError>;
    fn enable_vertex_attrib_array(&mut self, location: u32) -> Result<(), GpuError>;

    fn drawing_buffer_size(&self) -> (u32, u32);
    fn resize_drawing_buffer(&mut self, width: u32, height: u32) -> Result<(), GpuError>;
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<(), GpuError>;
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, mask: ClearMask) -> Result<(), GpuError>;
    fn enable(&mut self, capability: Capability) -> Result<(), GpuError>;

    fn uniform_matrix4(
        &mut self,
        location: UniformLocation,
        transpose: bool,
        value: &[f32; 16],
    ) -> Result<(), GpuError>;
    fn uniform4f(&mut self, location: UniformLocation, value: [f32; 4]) -> Result<(), GpuError>;
    fn uniform3f(&mut self, location: UniformLocation, value: [f32; 3]) -> Result<(), GpuError>;
    fn uniform1f(&mut self, location: UniformLocation, value: f32) -> Result<(), GpuError>;

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32)
        -> Result<(), GpuError>;
    /// Ends the frame and shows it.
    fn present(&mut self) -> Result<(), GpuError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_resolves_stride() {
        let layout = AttribLayout::packed_vec3();
        assert_eq!(layout.effective_stride(), 12);
        let strided = AttribLayout {
            stride: 24,
            ..layout
        };
        assert_eq!(strided.effective_stride(), 24);
    }

    #[test]
    fn uniform_location_checks_type() {
        let location = UniformLocation {
            offset: 64,
            ty: UniformType::Vec3,
        };
        assert!(location.expect(UniformType::Vec3).is_ok());
        assert_eq!(
            location.expect(UniformType::Mat4),
            Err(GpuError::UniformTypeMismatch {
                offset: 64,
                expected: UniformType::Vec3,
                actual: UniformType::Mat4,
            })
        );
    }
}
