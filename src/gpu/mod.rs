//! GPU seam of the painter. Drawers talk to a [`GpuBackend`] through buffer
//! and texture keys and hand it one [`Frame`] per render.

pub mod headless;
pub mod wgpu_backend;

use crate::error::{PainterError, Result};
use crate::utils::{DrawUniform, Rectangle};
use image::RgbaImage;
use uuid::Uuid;
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferKey(pub Uuid);

impl BufferKey {
    pub fn new() -> Self {
        BufferKey(Uuid::new_v4())
    }
}

impl Default for BufferKey {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey(pub Uuid);

impl TextureKey {
    pub fn new() -> Self {
        TextureKey(Uuid::new_v4())
    }
}

impl Default for TextureKey {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Mesh,
    Symbol,
    Rect,
    Image,
}

impl Program {
    pub const ALL: [Program; 4] = [Program::Mesh, Program::Symbol, Program::Rect, Program::Image];

    pub fn name(&self) -> &'static str {
        match self {
            Program::Mesh => "mesh",
            Program::Symbol => "symbol",
            Program::Rect => "rect",
            Program::Image => "image",
        }
    }
}

/// The four WGSL programs every drawer depends on.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub mesh: String,
    pub symbol: String,
    pub rect: String,
    pub image: String,
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self {
            mesh: include_str!("../../shaders/mesh.wgsl").to_string(),
            symbol: include_str!("../../shaders/symbol.wgsl").to_string(),
            rect: include_str!("../../shaders/rect.wgsl").to_string(),
            image: include_str!("../../shaders/image.wgsl").to_string(),
        }
    }
}

impl ShaderSet {
    pub fn source(&self, program: Program) -> &str {
        match program {
            Program::Mesh => &self.mesh,
            Program::Symbol => &self.symbol,
            Program::Rect => &self.rect,
            Program::Image => &self.image,
        }
    }

    /// Cheap structural check run before the backend compiles anything.
    pub fn validate(&self) -> Result<()> {
        for program in Program::ALL {
            let source = self.source(program);
            for entry in ["fn vs_main", "fn fs_main"] {
                if !source.contains(entry) {
                    return Err(PainterError::ShaderCompile {
                        program: program.name().to_string(),
                        log: format!("missing entry point `{}`", &entry[3..]),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// `triangles` holds xyz triples, `colors` rgba quadruples.
    Mesh {
        triangles: BufferKey,
        colors: BufferKey,
        vertex_count: u32,
        uniform: DrawUniform,
    },
    Symbol {
        unit: BufferKey,
        attributes: BufferKey,
        vertex_count: u32,
        uniform: DrawUniform,
    },
    Rect {
        unit: BufferKey,
        attributes: BufferKey,
        vertex_count: u32,
        uniform: DrawUniform,
    },
    /// `bounds` is the logical rectangle the texture covers; the uniform
    /// transform already maps the unit quad onto it.
    Image {
        texture: TextureKey,
        bounds: Rectangle,
        uniform: DrawUniform,
    },
}

impl DrawCommand {
    pub fn program(&self) -> Program {
        match self {
            DrawCommand::Mesh { .. } => Program::Mesh,
            DrawCommand::Symbol { .. } => Program::Symbol,
            DrawCommand::Rect { .. } => Program::Rect,
            DrawCommand::Image { .. } => Program::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub clear: [f32; 4],
    pub depth_test: bool,
    pub commands: Vec<DrawCommand>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            clear: [1.0, 1.0, 1.0, 1.0],
            depth_test: false,
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub buffers_created: usize,
    pub buffers_live: usize,
    pub textures_created: usize,
    pub textures_live: usize,
    pub frames: usize,
    pub draw_calls: usize,
}

pub trait GpuBackend {
    /// Compiles the shader programs; must succeed before any `submit`.
    fn compile(&mut self, shaders: &ShaderSet) -> Result<()>;
    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> BufferKey;
    fn delete_buffer(&mut self, key: BufferKey);
    /// `rgba` is premultiplied, tightly packed, `width * height * 4` bytes.
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureKey>;
    fn delete_texture(&mut self, key: TextureKey);
    fn resize(&mut self, size: PhysicalSize<u32>);
    fn size(&self) -> PhysicalSize<u32>;
    fn submit(&mut self, frame: Frame) -> Result<()>;
    fn stats(&self) -> BackendStats;
    fn has_buffer(&self, key: BufferKey) -> bool;

    fn last_frame(&self) -> Option<&Frame> {
        None
    }

    /// CPU copy of a buffer, for backends that keep one.
    fn buffer_contents(&self, _key: BufferKey) -> Option<&[u8]> {
        None
    }

    fn read_pixels(&mut self) -> Result<RgbaImage> {
        Err(PainterError::Unsupported("pixel readback"))
    }
}
