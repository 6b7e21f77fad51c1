use std::fmt;

use thiserror::Error;

use crate::gpu::{BufferTarget, ShaderKind, UniformType};

/// Whether a looked-up name is a vertex attribute or a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Attribute,
    Uniform,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attribute => "attribute",
            Self::Uniform => "uniform",
        })
    }
}

/// A name the linked program does not expose. Recorded and logged during
/// location resolution rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} `{name}` is not active in the linked program")]
pub struct MissingLocation {
    pub name: String,
    pub kind: LocationKind,
}

/// Failures reported by a [`GpuCommands`](crate::gpu::GpuCommands) backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GpuError {
    #[error("unknown {kind} handle {id}")]
    InvalidHandle { kind: &'static str, id: u32 },
    #[error("no program is in use")]
    NoProgramInUse,
    #[error("program {0} is not linked")]
    ProgramNotLinked(u32),
    #[error("no buffer is bound to {0:?}")]
    NoBufferBound(BufferTarget),
    #[error("no vertex array is bound")]
    NoVertexArrayBound,
    #[error("uniform at offset {offset} is {expected}, cannot upload {actual}")]
    UniformTypeMismatch {
        offset: u32,
        expected: UniformType,
        actual: UniformType,
    },
    #[error("vertex attribute {location} has no enabled buffer with enough data")]
    MissingAttributeData { location: u32 },
    #[error("invalid attribute layout: {0}")]
    InvalidLayout(String),
    #[error("drawing buffer cannot be {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("device error: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Parsing a palette name failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown color `{0}` (expected one of: red, green, blue, white)")]
pub struct UnknownColor(pub String);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to compile {kind} shader: {log}")]
    ShaderCompile { kind: ShaderKind, log: String },
    #[error("failed to link program: {log}")]
    ProgramLink { log: String },
    #[error(transparent)]
    MissingLocation(#[from] MissingLocation),
    #[error("degenerate transform: {0}")]
    DegenerateTransform(String),
    #[error(
        "no usable GPU context: {0}. Check that a display server and a Vulkan, Metal, DX12 or GL \
         driver are available, or pass --headless to render without a GPU"
    )]
    SurfaceUnavailable(String),
    #[error("renderer has no prepared program")]
    NotReady,
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
