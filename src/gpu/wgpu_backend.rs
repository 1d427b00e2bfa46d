use super::{
    BackendStats, BufferKey, DrawCommand, Frame, GpuBackend, Program, ShaderSet, TextureKey,
};
use crate::error::{PainterError, Result};
use crate::utils::{DrawUniform, RectVertex, SymbolVertex};
use image::RgbaImage;
use pollster::block_on;
use std::borrow::Cow;
use std::collections::HashMap;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const UNIT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const MESH_POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x3];
const MESH_COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];
const SYMBOL_ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
    1 => Float32x3,
    2 => Float32x3,
    3 => Float32x3,
    4 => Float32,
    5 => Float32,
    6 => Float32,
    7 => Float32,
    8 => Float32
];
const RECT_ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x3,
    4 => Float32x3,
    5 => Float32,
    6 => Float32,
    7 => Float32,
    8 => Float32
];

// src alpha for color, one for alpha, as the GL painter blends
const MARK_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

struct RenderTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Offscreen wgpu renderer. Draws into an RGBA8 target that can be read
/// back with [`GpuBackend::read_pixels`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: PhysicalSize<u32>,
    target: RenderTarget,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    // (program, depth test) -> pipeline
    pipelines: HashMap<(Program, bool), wgpu::RenderPipeline>,
    buffers: HashMap<BufferKey, wgpu::Buffer>,
    textures: HashMap<TextureKey, GpuTexture>,
    stats: BackendStats,
    last_frame: Option<Frame>,
}

impl WgpuBackend {
    pub fn new(size: PhysicalSize<u32>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(PainterError::NoAdapter)?;

        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("painter device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| PainterError::RequestDevice(e.to_string()))?;

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("draw_uniform_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<DrawUniform>() as _,
                        ),
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("texture_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("image sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let target = create_target(&device, size);

        Ok(Self {
            device,
            queue,
            size,
            target,
            uniform_bind_group_layout,
            texture_bind_group_layout,
            sampler,
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            stats: BackendStats::default(),
            last_frame: None,
        })
    }

    fn vertex_layouts(program: Program) -> Vec<wgpu::VertexBufferLayout<'static>> {
        let unit = wgpu::VertexBufferLayout {
            array_stride: (2 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &UNIT_ATTRIBUTES,
        };
        match program {
            Program::Mesh => vec![
                wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_POSITION_ATTRIBUTES,
                },
                wgpu::VertexBufferLayout {
                    array_stride: (4 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &MESH_COLOR_ATTRIBUTES,
                },
            ],
            Program::Symbol => vec![
                unit,
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<SymbolVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &SYMBOL_ATTRIBUTES,
                },
            ],
            Program::Rect => vec![
                unit,
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<RectVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &RECT_ATTRIBUTES,
                },
            ],
            Program::Image => Vec::new(),
        }
    }

    fn create_pipeline(
        &self,
        program: Program,
        module: &wgpu::ShaderModule,
        depth_test: bool,
    ) -> wgpu::RenderPipeline {
        let mut bind_group_layouts = vec![&self.uniform_bind_group_layout];
        if program == Program::Image {
            bind_group_layouts.push(&self.texture_bind_group_layout);
        }
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(program.name()),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        let blend = if program == Program::Image {
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
        } else {
            MARK_BLEND
        };
        let buffers = Self::vertex_layouts(program);

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.name()),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_test,
                    depth_compare: if depth_test {
                        wgpu::CompareFunction::LessEqual
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }

    fn uniform_bind_group(&self, uniform: &DrawUniform) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Draw Uniform Buffer"),
                contents: bytemuck::cast_slice(&[*uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Draw Uniform Bind Group"),
        })
    }
}

fn create_target(device: &wgpu::Device, size: PhysicalSize<u32>) -> RenderTarget {
    let extent = wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    };
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("painter-target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("painter-depth"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
    RenderTarget {
        color,
        color_view,
        depth_view,
    }
}

impl GpuBackend for WgpuBackend {
    fn compile(&mut self, shaders: &ShaderSet) -> Result<()> {
        shaders.validate()?;
        for program in Program::ALL {
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = self
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(program.name()),
                    source: wgpu::ShaderSource::Wgsl(Cow::Owned(
                        shaders.source(program).to_string(),
                    )),
                });
            let plain = self.create_pipeline(program, &module, false);
            let depth = self.create_pipeline(program, &module, true);
            if let Some(err) = block_on(self.device.pop_error_scope()) {
                return Err(PainterError::ShaderCompile {
                    program: program.name().to_string(),
                    log: err.to_string(),
                });
            }
            self.pipelines.insert((program, false), plain);
            self.pipelines.insert((program, true), depth);
        }
        log::debug!("compiled {} render pipelines", self.pipelines.len());
        Ok(())
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> BufferKey {
        // zero sized vertex buffers are invalid
        let padded = [0u8; 4];
        let contents = if contents.is_empty() {
            &padded[..]
        } else {
            contents
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let key = BufferKey::new();
        self.buffers.insert(key, buffer);
        self.stats.buffers_created += 1;
        self.stats.buffers_live = self.buffers.len();
        key
    }

    fn delete_buffer(&mut self, key: BufferKey) {
        if let Some(buffer) = self.buffers.remove(&key) {
            buffer.destroy();
        }
        self.stats.buffers_live = self.buffers.len();
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureKey> {
        if width == 0 || height == 0 || rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(PainterError::Image(format!(
                "invalid {}x{} texture data ({} bytes)",
                width,
                height,
                rgba.len()
            )));
        }
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("painter-image"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("image bind group"),
        });
        let key = TextureKey::new();
        self.textures.insert(
            key,
            GpuTexture {
                texture,
                bind_group,
            },
        );
        self.stats.textures_created += 1;
        self.stats.textures_live = self.textures.len();
        Ok(key)
    }

    fn delete_texture(&mut self, key: TextureKey) {
        if let Some(texture) = self.textures.remove(&key) {
            texture.texture.destroy();
        }
        self.stats.textures_live = self.textures.len();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        if size != self.size {
            self.size = size;
            self.target = create_target(&self.device, size);
        }
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn submit(&mut self, frame: Frame) -> Result<()> {
        if self.pipelines.is_empty() {
            return Err(PainterError::NotInitialized);
        }

        // bind groups must outlive the render pass
        let uniforms: Vec<wgpu::BindGroup> = frame
            .commands
            .iter()
            .map(|command| match command {
                DrawCommand::Mesh { uniform, .. }
                | DrawCommand::Symbol { uniform, .. }
                | DrawCommand::Rect { uniform, .. }
                | DrawCommand::Image { uniform, .. } => self.uniform_bind_group(uniform),
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut draw_calls = 0;
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: frame.clear[0] as f64,
                            g: frame.clear[1] as f64,
                            b: frame.clear[2] as f64,
                            a: frame.clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (command, uniform) in frame.commands.iter().zip(uniforms.iter()) {
                let Some(pipeline) = self.pipelines.get(&(command.program(), frame.depth_test))
                else {
                    continue;
                };
                match command {
                    DrawCommand::Mesh {
                        triangles,
                        colors,
                        vertex_count,
                        ..
                    } => {
                        let (Some(triangles), Some(colors)) =
                            (self.buffers.get(triangles), self.buffers.get(colors))
                        else {
                            log::warn!("mesh draw references a deleted buffer");
                            continue;
                        };
                        if *vertex_count == 0 {
                            continue;
                        }
                        rpass.set_pipeline(pipeline);
                        rpass.set_bind_group(0, uniform, &[]);
                        rpass.set_vertex_buffer(0, triangles.slice(..));
                        rpass.set_vertex_buffer(1, colors.slice(..));
                        rpass.draw(0..*vertex_count, 0..1);
                    }
                    DrawCommand::Symbol {
                        unit,
                        attributes,
                        vertex_count,
                        ..
                    }
                    | DrawCommand::Rect {
                        unit,
                        attributes,
                        vertex_count,
                        ..
                    } => {
                        let (Some(unit), Some(attributes)) =
                            (self.buffers.get(unit), self.buffers.get(attributes))
                        else {
                            log::warn!("shape draw references a deleted buffer");
                            continue;
                        };
                        if *vertex_count == 0 {
                            continue;
                        }
                        rpass.set_pipeline(pipeline);
                        rpass.set_bind_group(0, uniform, &[]);
                        rpass.set_vertex_buffer(0, unit.slice(..));
                        rpass.set_vertex_buffer(1, attributes.slice(..));
                        rpass.draw(0..*vertex_count, 0..1);
                    }
                    DrawCommand::Image { texture, .. } => {
                        let Some(texture) = self.textures.get(texture) else {
                            log::warn!("image draw references a deleted texture");
                            continue;
                        };
                        rpass.set_pipeline(pipeline);
                        rpass.set_bind_group(0, uniform, &[]);
                        rpass.set_bind_group(1, &texture.bind_group, &[]);
                        rpass.draw(0..6, 0..1);
                    }
                }
                draw_calls += 1;
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.stats.frames += 1;
        self.stats.draw_calls += draw_calls;
        self.last_frame = Some(frame);
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        self.stats
    }

    fn has_buffer(&self, key: BufferKey) -> bool {
        self.buffers.contains_key(&key)
    }

    fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    fn read_pixels(&mut self) -> Result<RgbaImage> {
        let size = self.target.color.size();
        let bytes_per_row = ((size.width * 4 + 255) / 256) * 256; // align to 256
        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback-output"),
            size: (bytes_per_row as u64) * (size.height as u64),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.target.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size.height),
                },
            },
            size,
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = output.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| PainterError::Readback(e.to_string()))?
            .map_err(|e| PainterError::Readback(e.to_string()))?;

        let view = slice.get_mapped_range();
        let mut rgba = Vec::with_capacity((size.width * size.height * 4) as usize);
        for row in view.chunks(bytes_per_row as usize) {
            rgba.extend_from_slice(&row[..(size.width * 4) as usize]);
        }
        drop(view);
        output.unmap();

        RgbaImage::from_raw(size.width, size.height, rgba)
            .ok_or_else(|| PainterError::Readback("pixel buffer size mismatch".to_string()))
    }
}
