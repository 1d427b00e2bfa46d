use crate::color::ColorCache;
use crate::config::RendererConfig;
use crate::error::Result;
use crate::geometry::{GeomSlot, ItemGeometry, PathCache};
use crate::gpu::{BufferKey, DrawCommand, GpuBackend, ShaderSet, TextureKey};
use crate::matrix::{self, Mat4};
use crate::overlay::Overlay;
use crate::rng::DepthJitter;
use crate::scene::{ItemId, MarkId};
use crate::utils::{DrawUniform, Rectangle};
use std::collections::{HashMap, HashSet};
use winit::dpi::PhysicalSize;

/// Batched rect or symbol buffers of one mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeBatch {
    pub unit: BufferKey,
    pub attributes: BufferKey,
    pub count: usize,
    pub offset: [f32; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub path_hits: usize,
    pub path_misses: usize,
    pub item_hits: usize,
    pub item_misses: usize,
    pub shape_hits: usize,
    pub shape_misses: usize,
}

/// Everything the drawers share during a frame, plus the caches that
/// survive between frames.
pub struct RenderContext {
    pub backend: Box<dyn GpuBackend>,
    pub colors: ColorCache,
    pub path_cache: PathCache,
    pub geometry: HashMap<GeomSlot, ItemGeometry>,
    pub batches: HashMap<MarkId, ShapeBatch>,
    pub dirty: HashSet<ItemId>,
    pub tx: f32,
    pub ty: f32,
    /// Active clip in canvas coordinates.
    pub clip: Rectangle,
    clip_stack: Vec<Rectangle>,
    /// Whole canvas in logical pixels.
    pub bounds: Rectangle,
    pub origin: [f32; 2],
    pub ratio: f64,
    pub matrix: Mat4,
    pub z_factor: f32,
    pub random_z: bool,
    pub full_redraw: bool,
    pub queue: Vec<DrawCommand>,
    /// Textures that live until the next frame starts.
    pub images: Vec<TextureKey>,
    pub overlay: Overlay,
    pub stats: CacheStats,
    pub simplify_threshold: f32,
    jitter: DepthJitter,
}

impl RenderContext {
    /// Compiles the built-in programs on `backend` and sets up an empty
    /// context for a `width` x `height` logical canvas.
    pub fn bootstrap(
        backend: Box<dyn GpuBackend>,
        width: u32,
        height: u32,
        config: &RendererConfig,
    ) -> Result<Self> {
        Self::bootstrap_with_shaders(backend, width, height, config, &ShaderSet::default())
    }

    pub fn bootstrap_with_shaders(
        mut backend: Box<dyn GpuBackend>,
        width: u32,
        height: u32,
        config: &RendererConfig,
        shaders: &ShaderSet,
    ) -> Result<Self> {
        shaders.validate()?;
        backend.compile(shaders)?;
        backend.resize(PhysicalSize::new(width.max(1), height.max(1)));

        let bounds = Rectangle::new(0.0, 0.0, width as f32, height as f32);
        Ok(Self {
            backend,
            colors: ColorCache::new(),
            path_cache: PathCache::new(config.path_cache_limit),
            geometry: HashMap::new(),
            batches: HashMap::new(),
            dirty: HashSet::new(),
            tx: 0.0,
            ty: 0.0,
            clip: bounds,
            clip_stack: Vec::new(),
            bounds,
            origin: [0.0, 0.0],
            ratio: 1.0,
            matrix: matrix::identity(),
            z_factor: config.z_factor,
            random_z: config.random_z,
            full_redraw: true,
            queue: Vec::new(),
            images: Vec::new(),
            overlay: Overlay::new(PhysicalSize::new(width.max(1), height.max(1)), 1.0),
            stats: CacheStats::default(),
            simplify_threshold: config.simplify_threshold,
            jitter: DepthJitter::new(config.random_z_seed),
        })
    }

    pub fn uniform(&self, offset: [f32; 2]) -> DrawUniform {
        DrawUniform {
            transform: self.matrix,
            clip: self.clip.to_clip(),
            offset,
            z_factor: self.z_factor,
            _padding: 0.0,
        }
    }

    /// Translation from item coordinates to canvas coordinates.
    pub fn offset(&self) -> [f32; 2] {
        [self.tx + self.origin[0], self.ty + self.origin[1]]
    }

    /// Narrows the clip to `rect` (canvas coordinates) until the matching
    /// `pop_clip`.
    pub fn push_clip(&mut self, rect: Rectangle) {
        self.clip_stack.push(self.clip);
        self.clip = self.clip.intersect(&rect);
    }

    pub fn pop_clip(&mut self) {
        if let Some(previous) = self.clip_stack.pop() {
            self.clip = previous;
        }
    }

    /// Depth jitter for a new path geometry; zero unless random-z is on.
    pub fn next_z(&mut self) -> f32 {
        if self.random_z {
            self.jitter.next_offset()
        } else {
            0.0
        }
    }

    pub fn is_dirty(&self, item: ItemId) -> bool {
        self.dirty.contains(&item)
    }

    /// Per-frame reset: drops last frame's textures and draw queue and
    /// returns the transform and clip to the canvas.
    pub fn reset_frame(&mut self) {
        self.tx = 0.0;
        self.ty = 0.0;
        for texture in self.images.drain(..) {
            self.backend.delete_texture(texture);
        }
        self.queue.clear();
        self.clip_stack.clear();
        self.clip = self.bounds;
        self.stats = CacheStats::default();
        self.overlay.clear();
    }

    pub fn free_slot(&mut self, slot: GeomSlot) {
        if let Some(old) = self.geometry.remove(&slot) {
            self.backend.delete_buffer(old.triangle_buffer);
            self.backend.delete_buffer(old.color_buffer);
        }
    }

    pub fn free_batch(&mut self, mark: MarkId) {
        if let Some(old) = self.batches.remove(&mark) {
            self.backend.delete_buffer(old.unit);
            self.backend.delete_buffer(old.attributes);
        }
    }

    /// Frees geometry of items and marks no longer in the scene.
    pub fn prune(&mut self, items: &HashSet<ItemId>, marks: &HashSet<MarkId>) {
        let stale: Vec<GeomSlot> = self
            .geometry
            .keys()
            .filter(|slot| match slot {
                GeomSlot::Item(id) => !items.contains(id),
                GeomSlot::Mark(id) => !marks.contains(id),
            })
            .copied()
            .collect();
        for slot in stale {
            self.free_slot(slot);
        }
        let stale: Vec<MarkId> = self
            .batches
            .keys()
            .filter(|id| !marks.contains(id))
            .copied()
            .collect();
        for mark in stale {
            self.free_batch(mark);
        }
    }

    /// Frees every cached buffer. Cached entries stay, flagged deleted, so
    /// the next frame rebuilds them.
    pub fn release_buffers(&mut self) {
        let backend = &mut self.backend;
        for geometry in self.geometry.values_mut() {
            if !geometry.deleted {
                backend.delete_buffer(geometry.triangle_buffer);
                backend.delete_buffer(geometry.color_buffer);
                geometry.deleted = true;
            }
        }
        for (_, batch) in self.batches.drain() {
            backend.delete_buffer(batch.unit);
            backend.delete_buffer(batch.attributes);
        }
    }
}
