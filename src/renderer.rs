//! The painter renderer: owns the render context and runs one pass over the
//! scene per `render` call.

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::context::RenderContext;
use crate::error::{PainterError, Result};
use crate::gpu::headless::HeadlessBackend;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::gpu::{DrawCommand, Frame, GpuBackend, ShaderSet};
use crate::loader::ResourceLoader;
use crate::marks::draw_mark;
use crate::marks::image::image_command;
use crate::pick::{mark_bounds, visit_marks_with_offset};
use crate::resize::{resize, Canvas};
use crate::scene::{Item, ItemId, Mark, MarkId, Scene, SceneId, SceneRef};
use crate::traits::SceneRenderer;
use crate::utils::Rectangle;
use image::RgbaImage;
use std::collections::HashSet;
use std::rc::Rc;
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Wgpu,
    Headless,
}

pub struct PainterRenderer {
    loader: Rc<dyn ResourceLoader>,
    kind: BackendKind,
    config: RendererConfig,
    shaders: ShaderSet,
    camera: Camera,
    background: Option<String>,
    canvas: Canvas,
    width: f32,
    height: f32,
    origin: [f32; 2],
    ctx: Option<RenderContext>,
    redraw: bool,
    painting: bool,
    last_scene: Option<SceneRef>,
    interactive: Option<(SceneId, Rc<Vec<MarkId>>)>,
    selected: Option<(SceneId, Option<Rectangle>, Rc<Vec<ItemId>>)>,
}

impl PainterRenderer {
    /// Renders through wgpu; the device is created by `initialize`.
    pub fn new(loader: Rc<dyn ResourceLoader>) -> Self {
        Self::with_kind(loader, BackendKind::Wgpu)
    }

    /// Renders into the bookkeeping backend, without a GPU.
    pub fn headless(loader: Rc<dyn ResourceLoader>) -> Self {
        Self::with_kind(loader, BackendKind::Headless)
    }

    fn with_kind(loader: Rc<dyn ResourceLoader>, kind: BackendKind) -> Self {
        Self {
            loader,
            kind,
            config: RendererConfig::default(),
            shaders: ShaderSet::default(),
            camera: Camera::new(),
            background: None,
            canvas: Canvas::detached(),
            width: 0.0,
            height: 0.0,
            origin: [0.0, 0.0],
            ctx: None,
            redraw: false,
            painting: false,
            last_scene: None,
            interactive: None,
            selected: None,
        }
    }

    /// Applies `config`. Setters called afterwards override it.
    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.camera.set_depth_test(config.depth_test);
        self.camera.set_random_z(config.random_z);
        self.camera.set_z_factor(config.z_factor);
        self.background = config.background.clone();
        self.config = config;
        self
    }

    /// Replaces the built-in programs; takes effect at `initialize`.
    pub fn with_shaders(mut self, shaders: ShaderSet) -> Self {
        self.shaders = shaders;
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.ctx.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut RenderContext> {
        self.ctx.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.is_some()
    }

    fn effective_canvas(&self, canvas: Canvas) -> Canvas {
        match self.config.device_pixel_ratio {
            Some(ratio) => Canvas::attached(ratio),
            None => canvas,
        }
    }

    fn create_backend(&self) -> Result<Box<dyn GpuBackend>> {
        let size = PhysicalSize::new(1, 1);
        Ok(match self.kind {
            BackendKind::Wgpu => Box::new(WgpuBackend::new(size)?),
            BackendKind::Headless => Box::new(HeadlessBackend::new(size)),
        })
    }

    pub fn rotate(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.camera.rotate(x, y, z);
        self
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.camera.translate(x, y, z);
        self
    }

    pub fn z_factor(&mut self, z: f32) -> &mut Self {
        self.camera.set_z_factor(z);
        self
    }

    pub fn depth_test(&mut self, on: bool) -> &mut Self {
        self.camera.set_depth_test(on);
        self
    }

    /// Jitters path depth so overlapping meshes do not z-fight.
    pub fn random_z(&mut self, on: bool) -> &mut Self {
        self.camera.set_random_z(on);
        self
    }

    pub fn background(&mut self, color: Option<&str>) -> &mut Self {
        self.background = color.map(str::to_string);
        self
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn set_painting(&mut self, painting: bool) {
        self.painting = painting;
    }

    /// Re-renders the last scene with nothing marked changed, for camera
    /// only updates.
    pub fn frame(&mut self) -> Result<()> {
        match self.last_scene.clone() {
            Some(scene) => self.render_scene(&scene, Some(&[])),
            None => Ok(()),
        }
    }

    /// Clears the target to the background without drawing the scene.
    pub fn clear(&mut self) -> Result<()> {
        let clear = self.clear_color()?;
        let ctx = self.ctx.as_mut().ok_or(PainterError::NotInitialized)?;
        ctx.reset_frame();
        ctx.backend.submit(Frame {
            clear,
            depth_test: false,
            commands: Vec::new(),
        })
    }

    fn clear_color(&mut self) -> Result<[f32; 4]> {
        let ctx = self.ctx.as_mut().ok_or(PainterError::NotInitialized)?;
        Ok(match self.background.as_deref() {
            Some(css) => {
                let [r, g, b] = ctx.colors.rgb(css);
                [r, g, b, 1.0]
            }
            None => [1.0, 1.0, 1.0, 1.0],
        })
    }

    /// Marks the changed items dirty. Removed items of area and line marks
    /// also dirty the mark's first item, which owns the shared mesh.
    fn mark_dirty(ctx: &mut RenderContext, scene: &Scene, items: &[ItemId]) {
        for id in items {
            ctx.dirty.insert(*id);
            let Some(mark) = scene.parent_mark(*id) else {
                continue;
            };
            let exiting = mark.items.iter().any(|i| i.id == *id && i.exit);
            if exiting && mark.marktype.is_nested() {
                if let Some(first) = mark.items.first() {
                    ctx.dirty.insert(first.id);
                }
            }
        }
    }

    fn prune(ctx: &mut RenderContext, scene: &Scene) {
        let mut items = HashSet::new();
        let mut marks = HashSet::new();
        scene.visit_marks(|mark| {
            marks.insert(mark.id);
        });
        scene.visit_items(|_, item| {
            items.insert(item.id);
        });
        ctx.prune(&items, &marks);
    }

    fn render_scene(&mut self, scene_ref: &SceneRef, items: Option<&[ItemId]>) -> Result<()> {
        let clear = self.clear_color()?;
        let ctx = self.ctx.as_mut().ok_or(PainterError::NotInitialized)?;
        let scene = scene_ref.borrow();

        ctx.reset_frame();
        ctx.full_redraw = items.is_none() || self.redraw;
        self.redraw = false;
        ctx.dirty.clear();
        if let Some(items) = items {
            Self::mark_dirty(ctx, &scene, items);
        }

        ctx.z_factor = self.camera.z_factor();
        ctx.random_z = self.camera.random_z();
        ctx.matrix = self.camera.matrix(ctx.bounds.width, ctx.bounds.height);

        draw_mark(ctx, &scene.root, self.loader.as_ref())?;

        let pixmap = ctx.overlay.rasterize()?;
        let texture = ctx
            .backend
            .create_texture(pixmap.width(), pixmap.height(), pixmap.data())?;
        ctx.images.push(texture);
        let bounds = ctx.bounds;
        let blit = image_command(ctx, texture, bounds);
        ctx.queue.push(blit);

        let commands: Vec<DrawCommand> = std::mem::take(&mut ctx.queue);
        ctx.backend.submit(Frame {
            clear,
            depth_test: self.camera.depth_test(),
            commands,
        })?;

        if ctx.full_redraw {
            Self::prune(ctx, &scene);
        }
        ctx.dirty.clear();
        ctx.full_redraw = false;
        let stats = ctx.stats;
        log::debug!(
            "frame: path cache {}/{} hit/miss, item cache {}/{}, shape cache {}/{}",
            stats.path_hits,
            stats.path_misses,
            stats.item_hits,
            stats.item_misses,
            stats.shape_hits,
            stats.shape_misses
        );
        drop(scene);
        self.last_scene = Some(scene_ref.clone());
        Ok(())
    }

    /// Interactive marks with no interactive descendants, in draw order.
    /// Cached until the scene revision changes.
    pub fn select_interactive(&mut self, scene: &Scene) -> Rc<Vec<MarkId>> {
        if let Some((id, marks)) = &self.interactive {
            if *id == scene.id {
                return marks.clone();
            }
        }
        fn walk(mark: &Mark, selected: &mut Vec<MarkId>) {
            if !mark.interactive {
                return;
            }
            let before = selected.len();
            for item in &mark.items {
                for child in &item.items {
                    walk(child, selected);
                }
            }
            if selected.len() == before {
                selected.push(mark.id);
            }
        }
        let mut selected = Vec::new();
        walk(&scene.root, &mut selected);
        let selected = Rc::new(selected);
        self.interactive = Some((scene.id, selected.clone()));
        selected
    }

    /// Items carrying a datum in the interactive marks whose bounds lie
    /// within `bounds` (canvas coordinates; `None` accepts every mark).
    pub fn select_items(&mut self, scene: &Scene, bounds: Option<Rectangle>) -> Rc<Vec<ItemId>> {
        if let Some((id, cached_bounds, items)) = &self.selected {
            if *id == scene.id && *cached_bounds == bounds {
                return items.clone();
            }
        }
        let marks: HashSet<MarkId> = self.select_interactive(scene).iter().copied().collect();
        let origin = self.origin;
        let mut items = Vec::new();
        visit_marks_with_offset(scene, |mark, offset| {
            if !marks.contains(&mark.id) {
                return;
            }
            let inside = match (bounds, mark_bounds(mark)) {
                (None, _) => true,
                (Some(outer), Some(b)) => {
                    outer.contains_rect(&b.translate(offset[0] + origin[0], offset[1] + origin[1]))
                }
                (Some(_), None) => false,
            };
            if inside {
                items.extend(mark.items.iter().filter(|i| i.datum.is_some()).map(|i| i.id));
            }
        });
        let items = Rc::new(items);
        self.selected = Some((scene.id, bounds, items.clone()));
        items
    }

    /// Visits every item that carries a datum.
    pub fn visit_datum_items<F: FnMut(&Mark, &Item)>(&self, scene: &Scene, mut visitor: F) {
        scene.visit_items(|mark, item| {
            if item.datum.is_some() {
                visitor(mark, item);
            }
        });
    }

    /// Renders `scene` in full and reads the target back.
    pub fn to_image(&mut self, scene: &SceneRef) -> Result<RgbaImage> {
        self.render_scene(scene, None)?;
        let ctx = self.ctx.as_mut().ok_or(PainterError::NotInitialized)?;
        ctx.backend.read_pixels()
    }
}

impl SceneRenderer for PainterRenderer {
    fn initialize(
        &mut self,
        canvas: Canvas,
        width: f32,
        height: f32,
        origin: [f32; 2],
    ) -> Result<()> {
        self.config.validate()?;
        let backend = self.create_backend()?;
        let ctx = RenderContext::bootstrap_with_shaders(
            backend,
            width.max(1.0) as u32,
            height.max(1.0) as u32,
            &self.config,
            &self.shaders,
        )?;
        self.ctx = Some(ctx);
        self.canvas = self.effective_canvas(canvas);
        log::info!(
            "painter initialized ({:?} backend, {}x{})",
            self.kind,
            width,
            height
        );
        self.resize(width, height, origin)
    }

    fn resize(&mut self, width: f32, height: f32, origin: [f32; 2]) -> Result<()> {
        let ctx = self.ctx.as_mut().ok_or(PainterError::NotInitialized)?;
        resize(ctx, &self.canvas, width, height, origin);
        self.width = width;
        self.height = height;
        self.origin = origin;
        self.selected = None;
        self.redraw = true;
        Ok(())
    }

    fn render(&mut self, scene: &SceneRef, items: Option<&[ItemId]>) -> Result<()> {
        self.render_scene(scene, items)
    }

    fn is_painting(&self) -> bool {
        self.painting
    }

    fn set_painting(&mut self, painting: bool) {
        self.painting = painting;
    }

    fn as_painter(&self) -> Option<&PainterRenderer> {
        Some(self)
    }

    fn as_painter_mut(&mut self) -> Option<&mut PainterRenderer> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FileLoader;
    use crate::scene::{MarkType, Paint};

    fn renderer() -> PainterRenderer {
        let mut r = PainterRenderer::headless(Rc::new(FileLoader::new(".")));
        r.initialize(Canvas::detached(), 100.0, 100.0, [0.0, 0.0])
            .unwrap();
        r
    }

    fn nested() -> Scene {
        let mut point = Item::at(5.0, 5.0);
        point.datum = Some(serde_json::Map::new());
        let inner = Mark::new(MarkType::Symbol, vec![point]);
        let plain = Mark::new(MarkType::Rect, vec![Item::at(0.0, 0.0)]);
        let mut group = Item::at(10.0, 10.0);
        group.items = vec![inner, plain];
        Scene::new(Mark::new(MarkType::Group, vec![group]))
    }

    #[test]
    fn interactive_leaves_only() {
        let scene = nested();
        let mut r = renderer();
        let marks = r.select_interactive(&scene);
        let group = &scene.root.items[0];
        assert_eq!(*marks, vec![group.items[0].id, group.items[1].id]);
        assert!(Rc::ptr_eq(&marks, &r.select_interactive(&scene)));
    }

    #[test]
    fn select_items_keeps_datum_items() {
        let scene = nested();
        let mut r = renderer();
        let items = r.select_items(&scene, None);
        assert_eq!(*items, vec![scene.root.items[0].items[0].items[0].id]);
        let none = r.select_items(&scene, Some(Rectangle::new(50.0, 50.0, 10.0, 10.0)));
        assert!(none.is_empty());
    }

    #[test]
    fn datum_visit_reaches_nested_groups() {
        let mut scene = nested();
        let mut deep = Item::at(1.0, 1.0);
        deep.datum = Some(serde_json::Map::new());
        let mut inner_group = Item::at(0.0, 0.0);
        inner_group.items = vec![Mark::new(
            MarkType::Rect,
            vec![deep, Item::at(2.0, 2.0)],
        )];
        scene.root.items[0]
            .items
            .push(Mark::new(MarkType::Group, vec![inner_group]));

        let r = renderer();
        let mut seen = Vec::new();
        r.visit_datum_items(&scene, |mark, item| seen.push((mark.marktype, item.id)));

        let group = &scene.root.items[0];
        let deep_id = group.items[2].items[0].items[0].items[0].id;
        assert_eq!(
            seen,
            vec![
                (MarkType::Symbol, group.items[0].items[0].id),
                (MarkType::Rect, deep_id),
            ]
        );
    }

    #[test]
    fn exit_of_a_line_point_dirties_the_first_point() {
        let mut a = Item::at(0.0, 0.0);
        a.stroke = Some(Paint::color("black"));
        let mut b = Item::at(10.0, 0.0);
        b.exit = true;
        let scene = Scene::new(Mark::new(MarkType::Line, vec![a, b]));
        let mut r = renderer();
        let ctx = r.context_mut().unwrap();
        let exiting = scene.root.items[1].id;
        PainterRenderer::mark_dirty(ctx, &scene, &[exiting]);
        assert!(ctx.is_dirty(scene.root.items[0].id));
        assert!(ctx.is_dirty(exiting));
    }
}
