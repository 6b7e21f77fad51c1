//! Point-light shading of an extruded letter "F".
//!
//! The crate is split into a numeric core ([`math`], [`geometry`],
//! [`lighting`]), a GL-style GPU command interface ([`gpu`]) with an
//! in-process recording backend and a `wgpu` backend, and the pieces that
//! drive it: [`pipeline`] builds the shader program, [`renderer`] issues
//! frames and [`app`] ties render parameters to user input.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod lighting;
pub mod math;
pub mod pipeline;
pub mod render_state;
pub mod renderer;
pub mod shaders;
pub mod surface;

pub use app::Viewer;
pub use config::{Camera, Projection, ViewerConfig};
pub use controller::{ControlKey, Interaction, KeyBindings};
pub use error::{GpuError, MissingLocation, RenderError, Result, UnknownColor};
pub use geometry::{mesh, Mesh};
pub use gpu::{BufferUpload, GpuCommands, RecordingGpu};
pub use math::{Matrix4, Vector3, Vector4};
pub use render_state::{PaletteColor, RenderState};
pub use renderer::{FrameOutcome, FrameRenderer};
pub use surface::{DisplaySurface, SharedSurface, StaticSurface};
