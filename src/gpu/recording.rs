//! A CPU-only [`GpuCommands`] implementation that validates calls the way a
//! driver would and records them. Used by the test suite and by `--headless`.

use std::collections::{HashMap, HashSet};

use log::trace;

use crate::error::GpuError;
use crate::gpu::reflect::{ProgramInterface, ShaderInterface};
use crate::gpu::{
    AttribLayout, BufferHandle, BufferTarget, BufferUpload, Capability, ClearMask,
    GpuCommands, Primitive, ProgramHandle, ShaderHandle, ShaderKind, UniformLocation, UniformType,
    UsageHint, VertexArrayHandle,
};
use crate::math::{self, Matrix4};

/// A value written to a uniform. Matrices are stored column-major, after any
/// requested transpose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// One successful call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateShader { kind: ShaderKind, shader: ShaderHandle },
    CompileShader { shader: ShaderHandle, success: bool },
    DeleteShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    AttachShader { program: ProgramHandle, shader: ShaderHandle },
    LinkProgram { program: ProgramHandle, success: bool },
    DeleteProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    CreateBuffer(BufferHandle),
    BindBuffer { target: BufferTarget, buffer: Option<BufferHandle> },
    BufferData { target: BufferTarget, len: usize, usage: UsageHint },
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    DeleteVertexArray(VertexArrayHandle),
    VertexAttribPointer { location: u32, layout: AttribLayout },
    EnableVertexAttribArray(u32),
    ResizeDrawingBuffer { width: u32, height: u32 },
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    ClearColor([f32; 4]),
    Clear(ClearMask),
    Enable(Capability),
    Uniform { location: UniformLocation, value: UniformValue },
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
    Present,
}

/// Calls that can be told to fail once, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// The compiler rejects the next shader instead of raising an error.
    CompileShader,
    CreateBuffer,
    BufferData,
    Uniform,
    DrawArrays,
    Present,
}

#[derive(Debug)]
struct ShaderObject {
    kind: ShaderKind,
    interface: Option<ShaderInterface>,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<ShaderHandle>,
    interface: Option<ProgramInterface>,
    log: String,
    uniforms: HashMap<u32, UniformValue>,
}

#[derive(Debug, Clone, Copy)]
struct AttribState {
    buffer: BufferHandle,
    layout: AttribLayout,
    enabled: bool,
}

#[derive(Debug)]
pub struct RecordingGpu {
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    buffers: HashMap<u32, Vec<f32>>,
    vertex_arrays: HashMap<u32, HashMap<u32, AttribState>>,
    array_buffer: Option<BufferHandle>,
    vertex_array: Option<VertexArrayHandle>,
    program: Option<ProgramHandle>,
    drawing_buffer: (u32, u32),
    viewport: (i32, i32, u32, u32),
    clear_color: [f32; 4],
    capabilities: HashSet<Capability>,
    faults: HashSet<FaultPoint>,
    inactive_uniforms: HashSet<String>,
    commands: Vec<GpuCommand>,
}

impl Default for RecordingGpu {
    fn default() -> Self {
        Self::new(300, 150)
    }
}

impl RecordingGpu {
    /// Starts with a drawing buffer of `width`x`height`, like a freshly
    /// created canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            array_buffer: None,
            vertex_array: None,
            program: None,
            drawing_buffer: (width, height),
            viewport: (0, 0, width, height),
            clear_color: [0.0; 4],
            capabilities: HashSet::new(),
            faults: HashSet::new(),
            inactive_uniforms: HashSet::new(),
            commands: Vec::new(),
        }
    }

    /// Makes the next call of `point` fail with a device error.
    pub fn fail_next(&mut self, point: FaultPoint) {
        self.faults.insert(point);
    }

    /// Reports `name` as inactive from now on, the way drivers drop
    /// uniforms a shader never reads.
    pub fn deactivate_uniform(&mut self, name: &str) {
        self.inactive_uniforms.insert(name.to_string());
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// `(primitive, first, count)` of every recorded draw.
    pub fn draw_calls(&self) -> Vec<(Primitive, u32, u32)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::DrawArrays {
                    primitive,
                    first,
                    count,
                } => Some((*primitive, *first, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn frames_presented(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, GpuCommand::Present))
            .count()
    }

    /// Last value written to the uniform `name` of `program`.
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let object = self.programs.get(&program.0)?;
        let location = object.interface.as_ref()?.uniform_location(name)?;
        object.uniforms.get(&location.offset).copied()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    pub fn current_clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[f32]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, command: GpuCommand) {
        trace!("gpu: {command:?}");
        self.commands.push(command);
    }

    fn check_fault(&mut self, point: FaultPoint) -> Result<(), GpuError> {
        if self.faults.remove(&point) {
            Err(GpuError::Device(format!("injected {point:?} failure")))
        } else {
            Ok(())
        }
    }

    fn linked_program(&self) -> Result<(ProgramHandle, &ProgramInterface), GpuError> {
        let program = self.program.ok_or(GpuError::NoProgramInUse)?;
        let interface = self
            .programs
            .get(&program.0)
            .and_then(|object| object.interface.as_ref())
            .ok_or(GpuError::ProgramNotLinked(program.0))?;
        Ok((program, interface))
    }

    fn write_uniform(
        &mut self,
        location: UniformLocation,
        ty: UniformType,
        value: UniformValue,
    ) -> Result<(), GpuError> {
        self.check_fault(FaultPoint::Uniform)?;
        let (program, _) = self.linked_program()?;
        location.expect(ty)?;
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.uniforms.insert(location.offset, value);
        }
        self.record(GpuCommand::Uniform { location, value });
        Ok(())
    }

    fn bound_vertex_array(&mut self) -> Result<&mut HashMap<u32, AttribState>, GpuError> {
        let vertex_array = self.vertex_array.ok_or(GpuError::NoVertexArrayBound)?;
        self.vertex_arrays
            .get_mut(&vertex_array.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })
    }

    fn check_attribute_data(&self, first: u32, count: u32) -> Result<(), GpuError> {
        let (_, interface) = self.linked_program()?;
        let vertex_array = self.vertex_array.ok_or(GpuError::NoVertexArrayBound)?;
        let attributes = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;
        if count == 0 {
            return Ok(());
        }
        for input in &interface.inputs {
            let missing = GpuError::MissingAttributeData {
                location: input.location,
            };
            let state = attributes
                .get(&input.location)
                .filter(|state| state.enabled)
                .ok_or_else(|| missing.clone())?;
            let data = self.buffers.get(&state.buffer.0).ok_or_else(|| missing.clone())?;
            let layout = state.layout;
            let last = u64::from(first) + u64::from(count) - 1;
            let needed_bytes = u64::from(layout.offset)
                + last * u64::from(layout.effective_stride())
                + u64::from(layout.components) * u64::from(layout.component_type.size());
            if (data.len() as u64) * 4 < needed_bytes {
                return Err(missing);
            }
        }
        Ok(())
    }
}

impl BufferUpload for RecordingGpu {
    fn create_buffer(&mut self) -> Result<BufferHandle, GpuError> {
        self.check_fault(FaultPoint::CreateBuffer)?;
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer.0, Vec::new());
        self.record(GpuCommand::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Option<BufferHandle>,
    ) -> Result<(), GpuError> {
        if let Some(handle) = buffer {
            if !self.buffers.contains_key(&handle.0) {
                return Err(GpuError::InvalidHandle {
                    kind: "buffer",
                    id: handle.0,
                });
            }
        }
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
        }
        self.record(GpuCommand::BindBuffer { target, buffer });
        Ok(())
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[f32],
        usage: UsageHint,
    ) -> Result<(), GpuError> {
        self.check_fault(FaultPoint::BufferData)?;
        let buffer = match target {
            BufferTarget::Array => self.array_buffer,
        }
        .ok_or(GpuError::NoBufferBound(target))?;
        let contents = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "buffer",
                id: buffer.0,
            })?;
        contents.clear();
        contents.extend_from_slice(data);
        self.record(GpuCommand::BufferData {
            target,
            len: data.len(),
            usage,
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer.0).is_some() {
            if self.array_buffer == Some(buffer) {
                self.array_buffer = None;
            }
            self.record(GpuCommand::DeleteBuffer(buffer));
        }
    }
}

impl GpuCommands for RecordingGpu {
    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderHandle, GpuError> {
        let shader = ShaderHandle(self.allocate());
        self.shaders.insert(
            shader.0,
            ShaderObject {
                kind,
                interface: None,
                log: String::new(),
            },
        );
        self.record(GpuCommand::CreateShader { kind, shader });
        Ok(shader)
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> Result<bool, GpuError> {
        let rejected = self.faults.remove(&FaultPoint::CompileShader);
        let object = self
            .shaders
            .get_mut(&shader.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "shader",
                id: shader.0,
            })?;
        let parsed = if rejected {
            Err("error: injected compile failure".to_string())
        } else {
            ShaderInterface::parse_for(object.kind, source)
        };
        let success = match parsed {
            Ok(interface) => {
                object.interface = Some(interface);
                object.log.clear();
                true
            }
            Err(log) => {
                object.interface = None;
                object.log = log;
                false
            }
        };
        self.record(GpuCommand::CompileShader { shader, success });
        Ok(success)
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader.0)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if self.shaders.remove(&shader.0).is_some() {
            self.record(GpuCommand::DeleteShader(shader));
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle, GpuError> {
        let program = ProgramHandle(self.allocate());
        self.programs.insert(program.0, ProgramObject::default());
        self.record(GpuCommand::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(
        &mut self,
        program: ProgramHandle,
        shader: ShaderHandle,
    ) -> Result<(), GpuError> {
        if !self.shaders.contains_key(&shader.0) {
            return Err(GpuError::InvalidHandle {
                kind: "shader",
                id: shader.0,
            });
        }
        let object = self
            .programs
            .get_mut(&program.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: program.0,
            })?;
        if !object.attached.contains(&shader) {
            object.attached.push(shader);
        }
        self.record(GpuCommand::AttachShader { program, shader });
        Ok(())
    }

    fn link_program(&mut self, program: ProgramHandle) -> Result<bool, GpuError> {
        let attached = self
            .programs
            .get(&program.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: program.0,
            })?
            .attached
            .clone();

        let stage = |kind: ShaderKind| {
            attached
                .iter()
                .filter_map(|shader| self.shaders.get(&shader.0))
                .find(|object| object.kind == kind)
                .ok_or_else(|| format!("error: no {kind} shader attached"))
                .and_then(|object| {
                    object
                        .interface
                        .as_ref()
                        .ok_or_else(|| format!("error: attached {kind} shader is not compiled"))
                })
        };
        let result = stage(ShaderKind::Vertex).and_then(|vertex| {
            let fragment = stage(ShaderKind::Fragment)?;
            ProgramInterface::link(vertex, fragment)
        });

        let success = result.is_ok();
        if let Some(object) = self.programs.get_mut(&program.0) {
            object.uniforms.clear();
            match result {
                Ok(interface) => {
                    object.interface = Some(interface);
                    object.log.clear();
                }
                Err(log) => {
                    object.interface = None;
                    object.log = log;
                }
            }
        }
        self.record(GpuCommand::LinkProgram { program, success });
        Ok(success)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.programs
            .get(&program.0)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program.0).is_some() {
            if self.program == Some(program) {
                self.program = None;
            }
            self.record(GpuCommand::DeleteProgram(program));
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), GpuError> {
        if let Some(handle) = program {
            let object = self.programs.get(&handle.0).ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: handle.0,
            })?;
            if object.interface.is_none() {
                return Err(GpuError::ProgramNotLinked(handle.0));
            }
        }
        self.program = program;
        self.record(GpuCommand::UseProgram(program));
        Ok(())
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs
            .get(&program.0)?
            .interface
            .as_ref()?
            .attrib_location(name)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if self.inactive_uniforms.contains(name) {
            return None;
        }
        self.programs
            .get(&program.0)?
            .interface
            .as_ref()?
            .uniform_location(name)
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, GpuError> {
        let vertex_array = VertexArrayHandle(self.allocate());
        self.vertex_arrays.insert(vertex_array.0, HashMap::new());
        self.record(GpuCommand::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn bind_vertex_array(
        &mut self,
        vertex_array: Option<VertexArrayHandle>,
    ) -> Result<(), GpuError> {
        if let Some(handle) = vertex_array {
            if !self.vertex_arrays.contains_key(&handle.0) {
                return Err(GpuError::InvalidHandle {
                    kind: "vertex array",
                    id: handle.0,
                });
            }
        }
        self.vertex_array = vertex_array;
        self.record(GpuCommand::BindVertexArray(vertex_array));
        Ok(())
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array.0).is_some() {
            if self.vertex_array == Some(vertex_array) {
                self.vertex_array = None;
            }
            self.record(GpuCommand::DeleteVertexArray(vertex_array));
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        layout: AttribLayout,
    ) -> Result<(), GpuError> {
        if !(1..=4).contains(&layout.components) {
            return Err(GpuError::InvalidLayout(format!(
                "{} components per vertex",
                layout.components
            )));
        }
        let buffer = self
            .array_buffer
            .ok_or(GpuError::NoBufferBound(BufferTarget::Array))?;
        let attributes = self.bound_vertex_array()?;
        let enabled = attributes
            .get(&location)
            .is_some_and(|state| state.enabled);
        attributes.insert(
            location,
            AttribState {
                buffer,
                layout,
                enabled,
            },
        );
        self.record(GpuCommand::VertexAttribPointer { location, layout });
        Ok(())
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) -> Result<(), GpuError> {
        let attributes = self.bound_vertex_array()?;
        let state = attributes
            .get_mut(&location)
            .ok_or(GpuError::MissingAttributeData { location })?;
        state.enabled = true;
        self.record(GpuCommand::EnableVertexAttribArray(location));
        Ok(())
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.drawing_buffer
    }

    fn resize_drawing_buffer(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        self.drawing_buffer = (width, height);
        self.record(GpuCommand::ResizeDrawingBuffer { width, height });
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<(), GpuError> {
        self.viewport = (x, y, width, height);
        self.record(GpuCommand::Viewport {
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
        self.record(GpuCommand::ClearColor(rgba));
    }

    fn clear(&mut self, mask: ClearMask) -> Result<(), GpuError> {
        self.record(GpuCommand::Clear(mask));
        Ok(())
    }

    fn enable(&mut self, capability: Capability) -> Result<(), GpuError> {
        self.capabilities.insert(capability);
        self.record(GpuCommand::Enable(capability));
        Ok(())
    }

    fn uniform_matrix4(
        &mut self,
        location: UniformLocation,
        transpose: bool,
        value: &[f32; 16],
    ) -> Result<(), GpuError> {
        let stored = if transpose {
            math::transpose(&Matrix4::from_cols_array(*value)).to_cols_array()
        } else {
            *value
        };
        self.write_uniform(location, UniformType::Mat4, UniformValue::Mat4(stored))
    }

    fn uniform4f(&mut self, location: UniformLocation, value: [f32; 4]) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Vec4, UniformValue::Vec4(value))
    }

    fn uniform3f(&mut self, location: UniformLocation, value: [f32; 3]) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Vec3, UniformValue::Vec3(value))
    }

    fn uniform1f(&mut self, location: UniformLocation, value: f32) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Float, UniformValue::Float(value))
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) -> Result<(), GpuError> {
        self.check_fault(FaultPoint::DrawArrays)?;
        self.check_attribute_data(first, count)?;
        self.record(GpuCommand::DrawArrays {
            primitive,
            first,
            count,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.check_fault(FaultPoint::Present)?;
        self.record(GpuCommand::Present);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

    fn linked(gpu: &mut RecordingGpu) -> ProgramHandle {
        let vertex = gpu.create_shader(ShaderKind::Vertex).unwrap();
        assert!(gpu.compile_shader(vertex, VERTEX_SHADER).unwrap());
        let fragment = gpu.create_shader(ShaderKind::Fragment).unwrap();
        assert!(gpu.compile_shader(fragment, FRAGMENT_SHADER).unwrap());
        let program = gpu.create_program().unwrap();
        gpu.attach_shader(program, vertex).unwrap();
        gpu.attach_shader(program, fragment).unwrap();
        assert!(gpu.link_program(program).unwrap());
        program
    }

    #[test]
    fn failed_compile_keeps_the_log() {
        let mut gpu = RecordingGpu::default();
        let shader = gpu.create_shader(ShaderKind::Vertex).unwrap();
        assert!(!gpu.compile_shader(shader, "fn main( {").unwrap());
        assert!(gpu.shader_info_log(shader).starts_with("error:"));
    }

    #[test]
    fn link_without_fragment_fails() {
        let mut gpu = RecordingGpu::default();
        let vertex = gpu.create_shader(ShaderKind::Vertex).unwrap();
        gpu.compile_shader(vertex, VERTEX_SHADER).unwrap();
        let program = gpu.create_program().unwrap();
        gpu.attach_shader(program, vertex).unwrap();
        assert!(!gpu.link_program(program).unwrap());
        assert!(gpu.program_info_log(program).contains("fragment"));
        assert_eq!(
            gpu.use_program(Some(program)),
            Err(GpuError::ProgramNotLinked(program.id()))
        );
    }

    #[test]
    fn uniforms_require_a_program_and_matching_type() {
        let mut gpu = RecordingGpu::default();
        let program = linked(&mut gpu);
        let shininess = gpu.uniform_location(program, "shininess").unwrap();
        assert_eq!(gpu.uniform1f(shininess, 4.0), Err(GpuError::NoProgramInUse));

        gpu.use_program(Some(program)).unwrap();
        assert!(matches!(
            gpu.uniform3f(shininess, [1.0; 3]),
            Err(GpuError::UniformTypeMismatch { .. })
        ));
        gpu.uniform1f(shininess, 4.0).unwrap();
        assert_eq!(
            gpu.uniform_value(program, "shininess"),
            Some(UniformValue::Float(4.0))
        );
    }

    #[test]
    fn transpose_flag_is_applied_before_storing() {
        let mut gpu = RecordingGpu::default();
        let program = linked(&mut gpu);
        gpu.use_program(Some(program)).unwrap();
        let world = gpu.uniform_location(program, "world").unwrap();
        let mut value = [0.0; 16];
        value[1] = 7.0;
        gpu.uniform_matrix4(world, true, &value).unwrap();
        let Some(UniformValue::Mat4(stored)) = gpu.uniform_value(program, "world") else {
            panic!("world was not written");
        };
        assert_eq!(stored[4], 7.0);
        assert_eq!(stored[1], 0.0);
    }

    #[test]
    fn draw_checks_attribute_data() {
        let mut gpu = RecordingGpu::default();
        let program = linked(&mut gpu);
        gpu.use_program(Some(program)).unwrap();
        let vertex_array = gpu.create_vertex_array().unwrap();
        gpu.bind_vertex_array(Some(vertex_array)).unwrap();

        let buffer = gpu.create_buffer().unwrap();
        gpu.bind_buffer(BufferTarget::Array, Some(buffer)).unwrap();
        gpu.buffer_data(BufferTarget::Array, &[0.0; 9], UsageHint::StaticDraw)
            .unwrap();
        for location in [0, 1] {
            gpu.vertex_attrib_pointer(location, AttribLayout::packed_vec3())
                .unwrap();
            gpu.enable_vertex_attrib_array(location).unwrap();
        }

        gpu.draw_arrays(Primitive::Triangles, 0, 3).unwrap();
        assert_eq!(
            gpu.draw_arrays(Primitive::Triangles, 0, 6),
            Err(GpuError::MissingAttributeData { location: 0 })
        );
        assert_eq!(gpu.draw_calls(), vec![(Primitive::Triangles, 0, 3)]);
    }

    #[test]
    fn injected_faults_fire_once() {
        let mut gpu = RecordingGpu::default();
        gpu.fail_next(FaultPoint::Present);
        assert!(matches!(gpu.present(), Err(GpuError::Device(_))));
        gpu.present().unwrap();
        assert_eq!(gpu.frames_presented(), 1);
    }

    #[test]
    fn resize_rejects_empty_buffers() {
        let mut gpu = RecordingGpu::new(10, 10);
        assert_eq!(
            gpu.resize_drawing_buffer(0, 5),
            Err(GpuError::InvalidSize {
                width: 0,
                height: 5
            })
        );
        gpu.resize_drawing_buffer(640, 480).unwrap();
        assert_eq!(gpu.drawing_buffer_size(), (640, 480));
    }
}
