use log::{debug, info};

use crate::error::{RenderError, Result};
use crate::geometry::{mesh, Mesh};
use crate::gpu::{
    AttribLayout, BufferHandle, Capability, ClearMask, GpuCommands, Primitive, VertexArrayHandle,
};
use crate::math::{self, Matrix4};
use crate::pipeline::{build_program, CompiledProgram};
use crate::render_state::RenderState;
use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use crate::surface::DisplaySurface;

pub const POSITION_ATTRIBUTE: &str = "position";
pub const NORMAL_ATTRIBUTE: &str = "normal";

pub const ATTRIBUTE_NAMES: [&str; 2] = [POSITION_ATTRIBUTE, NORMAL_ATTRIBUTE];

pub const UNIFORM_NAMES: [&str; 9] = [
    "world_view_projection",
    "world_inverse_transpose",
    "world",
    "color",
    "light_world_position",
    "view_world_position",
    "light_color",
    "specular_color",
    "shininess",
];

/// The per-frame transform chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub projection: Matrix4,
    pub view: Matrix4,
    pub view_projection: Matrix4,
    pub world: Matrix4,
    pub world_view_projection: Matrix4,
    pub world_inverse_transpose: Matrix4,
}

impl FrameTransforms {
    pub fn compute(state: &RenderState, aspect: f32) -> Result<Self> {
        let projection = state.projection();
        let projection = math::perspective(
            projection.fov_y_radians(),
            aspect,
            projection.z_near,
            projection.z_far,
        )?;
        let camera = state.camera();
        let camera_matrix = math::look_at(camera.eye, camera.target, camera.up)?;
        let view = math::inverse(&camera_matrix)?;
        let view_projection = math::multiply(&projection, &view);

        let world = math::y_rotation(state.rotation());
        let world_view_projection = math::multiply(&view_projection, &world);
        let world_inverse_transpose = math::transpose(&math::inverse(&world)?);

        Ok(Self {
            projection,
            view,
            view_projection,
            world,
            world_view_projection,
            world_inverse_transpose,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn { vertex_count: u32, resized: bool },
    /// The display has no area; nothing was issued.
    Skipped,
}

#[derive(Debug)]
struct Prepared {
    program: CompiledProgram,
    vertex_array: VertexArrayHandle,
    buffers: Vec<BufferHandle>,
    vertex_count: u32,
}

#[derive(Debug)]
enum Stage {
    Idle,
    Ready(Prepared),
}

/// Draws the letter through a [`GpuCommands`] backend.
///
/// Starts idle; [`prepare`](Self::prepare) builds the program and uploads the
/// mesh once, after which every [`render_frame`](Self::render_frame) issues a
/// complete frame.
#[derive(Debug)]
pub struct FrameRenderer<G: GpuCommands> {
    gpu: G,
    stage: Stage,
}

impl<G: GpuCommands> FrameRenderer<G> {
    pub fn new(gpu: G) -> Self {
        Self {
            gpu,
            stage: Stage::Idle,
        }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn into_gpu(self) -> G {
        self.gpu
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.stage, Stage::Ready(_))
    }

    pub fn program(&self) -> Option<&CompiledProgram> {
        match &self.stage {
            Stage::Ready(prepared) => Some(&prepared.program),
            Stage::Idle => None,
        }
    }

    /// Builds the program, uploads the mesh and configures the vertex array.
    /// Does nothing once ready.
    pub fn prepare(&mut self) -> Result<()> {
        if self.is_ready() {
            debug!("renderer already prepared");
            return Ok(());
        }

        let program = build_program(
            &mut self.gpu,
            VERTEX_SHADER,
            FRAGMENT_SHADER,
            &ATTRIBUTE_NAMES,
            &UNIFORM_NAMES,
        )?;

        let mut buffers = Vec::new();
        let mut vertex_array = None;
        let mesh = mesh();
        if let Err(err) = upload_geometry(
            &mut self.gpu,
            &program,
            mesh,
            &mut buffers,
            &mut vertex_array,
        ) {
            for buffer in buffers {
                self.gpu.delete_buffer(buffer);
            }
            if let Some(vertex_array) = vertex_array {
                self.gpu.delete_vertex_array(vertex_array);
            }
            self.gpu.delete_program(program.program());
            return Err(err);
        }
        let Some(vertex_array) = vertex_array else {
            self.gpu.delete_program(program.program());
            return Err(RenderError::NotReady);
        };

        let vertex_count = mesh.vertex_count() as u32;
        info!(
            "renderer ready: program {}, {vertex_count} vertices",
            program.program().id()
        );
        self.stage = Stage::Ready(Prepared {
            program,
            vertex_array,
            buffers,
            vertex_count,
        });
        Ok(())
    }

    /// Renders one frame of `state` at the size `surface` reports.
    ///
    /// The first failing command ends the frame and is returned; nothing is
    /// drawn after it.
    pub fn render_frame(
        &mut self,
        surface: &dyn DisplaySurface,
        state: &RenderState,
    ) -> Result<FrameOutcome> {
        let Stage::Ready(prepared) = &self.stage else {
            return Err(RenderError::NotReady);
        };

        let (width, height) = surface.display_size();
        if width == 0 || height == 0 {
            debug!("display is {width}x{height}, skipping frame");
            return Ok(FrameOutcome::Skipped);
        }
        let transforms = FrameTransforms::compute(state, width as f32 / height as f32)?;

        let gpu = &mut self.gpu;
        let resized = gpu.drawing_buffer_size() != (width, height);
        if resized {
            debug!("resizing drawing buffer to {width}x{height}");
            gpu.resize_drawing_buffer(width, height)?;
        }
        gpu.viewport(0, 0, width, height)?;

        gpu.clear_color(state.clear_color());
        gpu.clear(ClearMask::COLOR_DEPTH)?;
        gpu.enable(Capability::DepthTest)?;
        gpu.enable(Capability::CullFace)?;

        gpu.use_program(Some(prepared.program.program()))?;
        gpu.bind_vertex_array(Some(prepared.vertex_array))?;
        upload_uniforms(gpu, &prepared.program, &transforms, state)?;

        gpu.draw_arrays(Primitive::Triangles, 0, prepared.vertex_count)?;
        gpu.present()?;
        Ok(FrameOutcome::Drawn {
            vertex_count: prepared.vertex_count,
            resized,
        })
    }

    /// Deletes every GPU object created by [`prepare`](Self::prepare).
    pub fn release(&mut self) {
        if let Stage::Ready(prepared) = std::mem::replace(&mut self.stage, Stage::Idle) {
            self.gpu.delete_vertex_array(prepared.vertex_array);
            for buffer in prepared.buffers {
                self.gpu.delete_buffer(buffer);
            }
            self.gpu.delete_program(prepared.program.program());
        }
    }
}

fn upload_geometry<G: GpuCommands>(
    gpu: &mut G,
    program: &CompiledProgram,
    mesh: &Mesh,
    buffers: &mut Vec<BufferHandle>,
    vertex_array: &mut Option<VertexArrayHandle>,
) -> Result<()> {
    let created = gpu.create_vertex_array()?;
    *vertex_array = Some(created);
    gpu.bind_vertex_array(Some(created))?;

    let positions = mesh.upload_positions(gpu)?;
    buffers.push(positions);
    if let Some(location) = program.attribute(POSITION_ATTRIBUTE) {
        gpu.vertex_attrib_pointer(location, AttribLayout::packed_vec3())?;
        gpu.enable_vertex_attrib_array(location)?;
    }

    let normals = mesh.upload_normals(gpu)?;
    buffers.push(normals);
    if let Some(location) = program.attribute(NORMAL_ATTRIBUTE) {
        gpu.vertex_attrib_pointer(location, AttribLayout::packed_vec3())?;
        gpu.enable_vertex_attrib_array(location)?;
    }
    Ok(())
}

/// Uploads the matrices, then the material and light values. Uniforms the
/// program does not expose are skipped.
fn upload_uniforms<G: GpuCommands>(
    gpu: &mut G,
    program: &CompiledProgram,
    transforms: &FrameTransforms,
    state: &RenderState,
) -> Result<()> {
    let matrices = [
        ("world_view_projection", &transforms.world_view_projection),
        ("world_inverse_transpose", &transforms.world_inverse_transpose),
        ("world", &transforms.world),
    ];
    for (name, matrix) in matrices {
        if let Some(location) = program.uniform(name) {
            gpu.uniform_matrix4(location, false, matrix.as_array())?;
        }
    }

    if let Some(location) = program.uniform("color") {
        gpu.uniform4f(location, state.base_color())?;
    }
    let vectors = [
        ("light_world_position", state.light_position()),
        ("view_world_position", state.camera().eye),
        ("light_color", state.light_color().rgb()),
        ("specular_color", state.specular_color().rgb()),
    ];
    for (name, value) in vectors {
        if let Some(location) = program.uniform(name) {
            gpu.uniform3f(location, value.to_array())?;
        }
    }
    if let Some(location) = program.uniform("shininess") {
        gpu.uniform1f(location, state.shininess())?;
    }
    Ok(())
}
