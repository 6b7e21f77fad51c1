use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use log::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::{Window, WindowId};

use crate::error::GpuError;
use crate::gpu::reflect::{ProgramInterface, ShaderInterface};
use crate::gpu::{
    AttribLayout, BufferHandle, BufferTarget, BufferUpload, Capability, ClearMask,
    GpuCommands, Primitive, ProgramHandle, ShaderHandle, ShaderKind, UniformLocation, UniformType,
    UsageHint, VertexArrayHandle,
};
use crate::math::{self, Matrix4};

/// [`GpuCommands`] on top of wgpu, drawing into a winit window.
///
/// GL state (program in use, bound vertex array, depth/cull toggles,
/// viewport) is kept on the CPU and turned into a render pipeline and a
/// render pass at each draw. Uniform uploads land in a per-program staging
/// block that is flushed to the program's uniform buffer before drawing.
pub struct WgpuBackend {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    frame: Option<Frame>,
    next_id: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    buffers: HashMap<u32, Option<wgpu::Buffer>>,
    vertex_arrays: HashMap<u32, HashMap<u32, AttribState>>,
    array_buffer: Option<BufferHandle>,
    vertex_array: Option<VertexArrayHandle>,
    program: Option<ProgramHandle>,
    viewport: (i32, i32, u32, u32),
    clear_color: [f32; 4],
    capabilities: HashSet<Capability>,
}

struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

struct ShaderObject {
    kind: ShaderKind,
    compiled: Option<(Arc<wgpu::ShaderModule>, ShaderInterface)>,
    log: String,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderHandle>,
    linked: Option<LinkedProgram>,
    log: String,
}

struct LinkedProgram {
    interface: ProgramInterface,
    vertex: Arc<wgpu::ShaderModule>,
    fragment: Arc<wgpu::ShaderModule>,
    layout: wgpu::PipelineLayout,
    uniforms: Option<UniformBinding>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

struct UniformBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    staging: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct AttribState {
    buffer: BufferHandle,
    layout: AttribLayout,
    enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    depth_test: bool,
    cull_face: bool,
    primitive: Primitive,
    attributes: Vec<(u32, AttribLayout)>,
}

impl WgpuBackend {
    /// Acquires an adapter and device for `window` and configures its
    /// surface.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("letterlight-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: Default::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("failed to create GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        // Shader output is written as-is, like a GL default framebuffer.
        let format = caps
            .formats
            .iter()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .context("surface reports no supported formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth = DepthBuffer::create(&device, config.width, config.height);
        debug!(
            "wgpu backend ready: {:?} {}x{}",
            format, config.width, config.height
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth,
            frame: None,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            array_buffer: None,
            vertex_array: None,
            program: None,
            viewport: (0, 0, size.width, size.height),
            clear_color: [0.0; 4],
            capabilities: HashSet::new(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Runs `f` inside a validation error scope and reports what the device
    /// rejected.
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }

    fn ensure_frame(&mut self) -> Result<(), GpuError> {
        if self.frame.is_some() {
            return Ok(());
        }
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|err| GpuError::Surface(err.to_string()))?
            }
            Err(err) => return Err(GpuError::Surface(err.to_string())),
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(Frame { texture, view });
        Ok(())
    }

    fn linked(&self, program: ProgramHandle) -> Result<&LinkedProgram, GpuError> {
        self.programs
            .get(&program.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: program.0,
            })?
            .linked
            .as_ref()
            .ok_or(GpuError::ProgramNotLinked(program.0))
    }

    fn write_uniform(
        &mut self,
        location: UniformLocation,
        ty: UniformType,
        values: &[f32],
    ) -> Result<(), GpuError> {
        let program = self.program.ok_or(GpuError::NoProgramInUse)?;
        location.expect(ty)?;
        let linked = self
            .programs
            .get_mut(&program.0)
            .and_then(|object| object.linked.as_mut())
            .ok_or(GpuError::ProgramNotLinked(program.0))?;
        let binding = linked.uniforms.as_mut().ok_or(GpuError::InvalidHandle {
            kind: "uniform block",
            id: program.0,
        })?;
        let bytes: &[u8] = bytemuck::cast_slice(values);
        let start = location.offset as usize;
        let end = start + bytes.len();
        let slot = binding
            .staging
            .get_mut(start..end)
            .ok_or_else(|| GpuError::InvalidLayout(format!("uniform offset {start} out of range")))?;
        slot.copy_from_slice(bytes);
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

    /// The drawing buffer region for the GL-style viewport, whose origin is
    /// bottom-left.
    fn pass_viewport(&self) -> Option<[f32; 4]> {
        let (x, y, width, height) = self.viewport;
        let target_width = self.config.width as f32;
        let target_height = self.config.height as f32;
        let left = (x as f32).clamp(0.0, target_width);
        let top = (target_height - (y as f32 + height as f32)).clamp(0.0, target_height);
        let right = (x as f32 + width as f32).clamp(0.0, target_width);
        let bottom = (target_height - y as f32).clamp(0.0, target_height);
        (right > left && bottom > top).then_some([left, top, right - left, bottom - top])
    }

    fn create_pipeline(
        device: &wgpu::Device,
        linked: &LinkedProgram,
        key: &PipelineKey,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .attributes
            .iter()
            .map(|(location, layout)| {
                [wgpu::VertexAttribute {
                    format: vertex_format(layout.components),
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
            .attributes
            .iter()
            .zip(attributes.iter())
            .map(|((_, layout), attribute)| wgpu::VertexBufferLayout {
                array_stride: u64::from(layout.effective_stride()),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attribute,
            })
            .collect();

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("letterlight-pipeline"),
            layout: Some(&linked.layout),
            vertex: wgpu::VertexState {
                module: &linked.vertex,
                entry_point: Some(linked.interface.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            primitive: wgpu::PrimitiveState {
                topology: match key.primitive {
                    Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
                },
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.cull_face.then_some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: key.depth_test,
                depth_compare: if key.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &linked.fragment,
                entry_point: Some(linked.interface.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        })
    }
}

fn vertex_format(components: u8) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

impl BufferUpload for WgpuBackend {
    fn create_buffer(&mut self) -> Result<BufferHandle, GpuError> {
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer.0, None);
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
        Ok(())
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        data: &[f32],
        usage: UsageHint,
    ) -> Result<(), GpuError> {
        let handle = match target {
            BufferTarget::Array => self.array_buffer,
        }
        .ok_or(GpuError::NoBufferBound(target))?;
        let contents = (!data.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(match usage {
                        UsageHint::StaticDraw => "static-vertex-buffer",
                    }),
                    contents: bytemuck::cast_slice(data),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                })
        });
        let slot = self
            .buffers
            .get_mut(&handle.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "buffer",
                id: handle.0,
            })?;
        *slot = contents;
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer.0).is_some() && self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
    }
}

impl GpuCommands for WgpuBackend {
    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderHandle, GpuError> {
        let shader = ShaderHandle(self.allocate());
        self.shaders.insert(
            shader.0,
            ShaderObject {
                kind,
                compiled: None,
                log: String::new(),
            },
        );
        Ok(shader)
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) -> Result<bool, GpuError> {
        let kind = self
            .shaders
            .get(&shader.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "shader",
                id: shader.0,
            })?
            .kind;

        let result = ShaderInterface::parse_for(kind, source).and_then(|interface| {
            let (module, error) = self.scoped(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(match kind {
                        ShaderKind::Vertex => "vertex-shader",
                        ShaderKind::Fragment => "fragment-shader",
                    }),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            });
            match error {
                Some(err) => Err(err.to_string()),
                None => Ok((Arc::new(module), interface)),
            }
        });

        let object = self
            .shaders
            .get_mut(&shader.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "shader",
                id: shader.0,
            })?;
        match result {
            Ok(compiled) => {
                object.compiled = Some(compiled);
                object.log.clear();
                Ok(true)
            }
            Err(log) => {
                object.compiled = None;
                object.log = log;
                Ok(false)
            }
        }
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader.0)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader.0);
    }

    fn create_program(&mut self) -> Result<ProgramHandle, GpuError> {
        let program = ProgramHandle(self.allocate());
        self.programs.insert(program.0, ProgramObject::default());
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
                        .compiled
                        .as_ref()
                        .ok_or_else(|| format!("error: attached {kind} shader is not compiled"))
                })
        };

        let result = stage(ShaderKind::Vertex).and_then(|(vertex, vertex_interface)| {
            let (fragment, fragment_interface) = stage(ShaderKind::Fragment)?;
            let interface = ProgramInterface::link(vertex_interface, fragment_interface)?;
            if let Some(block) = &interface.uniforms {
                if block.group != 0 {
                    return Err(format!(
                        "error: uniform block `{}` must use @group(0)",
                        block.var_name
                    ));
                }
            }

            let uniform_layout = interface.uniforms.as_ref().map(|block| {
                let layout = self
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("uniform-bind-layout"),
                        entries: &[wgpu::BindGroupLayoutEntry {
                            binding: block.binding,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(u64::from(block.size)),
                            },
                            count: None,
                        }],
                    });
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("uniform-block"),
                    size: u64::from(block.size),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("uniform-bind-group"),
                    layout: &layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: block.binding,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                let binding = UniformBinding {
                    buffer,
                    bind_group,
                    staging: vec![0; block.size as usize],
                };
                (layout, binding)
            });

            let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
                uniform_layout.iter().map(|(layout, _)| layout).collect();
            let (layout, error) = self.scoped(|device| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("program-layout"),
                    bind_group_layouts: &bind_group_layouts,
                    push_constant_ranges: &[],
                })
            });
            if let Some(err) = error {
                return Err(err.to_string());
            }

            Ok(LinkedProgram {
                interface,
                vertex: Arc::clone(vertex),
                fragment: Arc::clone(fragment),
                layout,
                uniforms: uniform_layout.map(|(_, binding)| binding),
                pipelines: HashMap::new(),
            })
        });

        let object = self
            .programs
            .get_mut(&program.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "program",
                id: program.0,
            })?;
        match result {
            Ok(linked) => {
                object.linked = Some(linked);
                object.log.clear();
                Ok(true)
            }
            Err(log) => {
                object.linked = None;
                object.log = log;
                Ok(false)
            }
        }
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.programs
            .get(&program.0)
            .map(|object| object.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program.0).is_some() && self.program == Some(program) {
            self.program = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) -> Result<(), GpuError> {
        if let Some(handle) = program {
            self.linked(handle)?;
        }
        self.program = program;
        Ok(())
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.linked(program).ok()?.interface.attrib_location(name)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.linked(program).ok()?.interface.uniform_location(name)
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, GpuError> {
        let vertex_array = VertexArrayHandle(self.allocate());
        self.vertex_arrays.insert(vertex_array.0, HashMap::new());
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
        Ok(())
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array.0).is_some()
            && self.vertex_array == Some(vertex_array)
        {
            self.vertex_array = None;
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
        if layout.offset != 0 {
            return Err(GpuError::InvalidLayout(
                "attribute offsets are not supported".into(),
            ));
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
        Ok(())
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) -> Result<(), GpuError> {
        let attributes = self.bound_vertex_array()?;
        let state = attributes
            .get_mut(&location)
            .ok_or(GpuError::MissingAttributeData { location })?;
        state.enabled = true;
        Ok(())
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize_drawing_buffer(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }
        // An acquired texture belongs to the old configuration.
        self.frame = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, width, height);
        Ok(())
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<(), GpuError> {
        self.viewport = (x, y, width, height);
        Ok(())
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    fn clear(&mut self, mask: ClearMask) -> Result<(), GpuError> {
        self.ensure_frame()?;
        let Some(frame) = self.frame.as_ref() else {
            return Err(GpuError::Surface("no frame acquired".into()));
        };
        let [r, g, b, a] = self.clear_color;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear-encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if mask.color {
                            wgpu::LoadOp::Clear(wgpu::Color {
                                r: f64::from(r),
                                g: f64::from(g),
                                b: f64::from(b),
                                a: f64::from(a),
                            })
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: if mask.depth {
                            wgpu::LoadOp::Clear(1.0)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn enable(&mut self, capability: Capability) -> Result<(), GpuError> {
        self.capabilities.insert(capability);
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
        self.write_uniform(location, UniformType::Mat4, &stored)
    }

    fn uniform4f(&mut self, location: UniformLocation, value: [f32; 4]) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Vec4, &value)
    }

    fn uniform3f(&mut self, location: UniformLocation, value: [f32; 3]) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Vec3, &value)
    }

    fn uniform1f(&mut self, location: UniformLocation, value: f32) -> Result<(), GpuError> {
        self.write_uniform(location, UniformType::Float, &[value])
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) -> Result<(), GpuError> {
        let program = self.program.ok_or(GpuError::NoProgramInUse)?;
        let vertex_array = self.vertex_array.ok_or(GpuError::NoVertexArrayBound)?;
        let Some(viewport) = self.pass_viewport() else {
            return Ok(());
        };
        if count == 0 {
            return Ok(());
        }
        self.ensure_frame()?;

        let attributes = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or(GpuError::InvalidHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;
        let inputs = self.linked(program)?.interface.inputs.clone();
        let mut bound = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let missing = GpuError::MissingAttributeData {
                location: input.location,
            };
            let state = attributes
                .get(&input.location)
                .filter(|state| state.enabled)
                .ok_or_else(|| missing.clone())?;
            let buffer = self
                .buffers
                .get(&state.buffer.0)
                .and_then(Option::as_ref)
                .ok_or(missing)?;
            bound.push((input.location, state.layout, buffer));
        }

        let key = PipelineKey {
            depth_test: self.capabilities.contains(&Capability::DepthTest),
            cull_face: self.capabilities.contains(&Capability::CullFace),
            primitive,
            attributes: bound.iter().map(|(location, layout, _)| (*location, *layout)).collect(),
        };

        let format = self.config.format;
        let Some(linked) = self
            .programs
            .get_mut(&program.0)
            .and_then(|object| object.linked.as_mut())
        else {
            return Err(GpuError::ProgramNotLinked(program.0));
        };
        let Some(frame) = self.frame.as_ref() else {
            return Err(GpuError::Surface("no frame acquired".into()));
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        if !linked.pipelines.contains_key(&key) {
            debug!("building pipeline for {key:?}");
            let pipeline = Self::create_pipeline(&self.device, linked, &key, format);
            linked.pipelines.insert(key.clone(), pipeline);
        }
        if let Some(uniforms) = &linked.uniforms {
            self.queue.write_buffer(&uniforms.buffer, 0, &uniforms.staging);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("draw-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("draw-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let [x, y, width, height] = viewport;
            pass.set_viewport(x, y, width, height, 0.0, 1.0);
            if let Some(pipeline) = linked.pipelines.get(&key) {
                pass.set_pipeline(pipeline);
            }
            if let Some(uniforms) = &linked.uniforms {
                pass.set_bind_group(0, &uniforms.bind_group, &[]);
            }
            for (slot, (_, _, buffer)) in bound.iter().enumerate() {
                pass.set_vertex_buffer(slot as u32, buffer.slice(..));
            }
            pass.draw(first..first + count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::Device(err.to_string())),
            None => Ok(()),
        }
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.ensure_frame()?;
        if let Some(frame) = self.frame.take() {
            self.window.pre_present_notify();
            frame.texture.present();
        }
        Ok(())
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}
