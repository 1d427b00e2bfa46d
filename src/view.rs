//! A host view: the scene, the canvas it is drawn into and the renderer and
//! handler currently attached to it. Cloning a `View` clones the handle.

use crate::error::{PainterError, Result};
use crate::events::{Channel, EventType, Listener, PointerEvent};
use crate::handler::ListenerId;
use crate::loader::{ResourceLoader, TooltipHandler};
use crate::renderer::PainterRenderer;
use crate::resize::Canvas;
use crate::scene::{ItemId, SceneRef};
use crate::traits::{ModuleRegistry, RenderModule, SceneHandler, SceneRenderer, PAINTER_MODULE};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub canvas: Canvas,
    pub width: f32,
    pub height: f32,
    pub origin: [f32; 2],
    /// Use the module's headless renderer.
    pub headless: bool,
    /// Module attached at construction.
    pub renderer: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            canvas: Canvas::detached(),
            width: 400.0,
            height: 300.0,
            origin: [0.0, 0.0],
            headless: false,
            renderer: PAINTER_MODULE.to_string(),
        }
    }
}

struct ViewInner {
    scene: SceneRef,
    loader: Rc<dyn ResourceLoader>,
    tooltip: Rc<dyn TooltipHandler>,
    registry: RefCell<ModuleRegistry>,
    canvas: Cell<Canvas>,
    size: Cell<(f32, f32)>,
    origin: Cell<[f32; 2]>,
    headless: bool,
    renderer_type: RefCell<String>,
    renderer: RefCell<Option<Box<dyn SceneRenderer>>>,
    handler: RefCell<Option<Box<dyn SceneHandler>>>,
    /// Listeners of a handler that is out dispatching an event.
    dispatching: RefCell<Option<Vec<(Channel, Listener)>>>,
    pending: RefCell<Vec<ItemId>>,
}

#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

#[derive(Clone)]
pub struct WeakView(Weak<ViewInner>);

impl WeakView {
    pub fn upgrade(&self) -> Option<View> {
        self.0.upgrade().map(|inner| View { inner })
    }
}

impl View {
    pub fn new(
        scene: SceneRef,
        loader: Rc<dyn ResourceLoader>,
        tooltip: Rc<dyn TooltipHandler>,
        options: ViewOptions,
    ) -> Result<View> {
        Self::with_registry(scene, loader, tooltip, options, ModuleRegistry::new())
    }

    pub fn with_registry(
        scene: SceneRef,
        loader: Rc<dyn ResourceLoader>,
        tooltip: Rc<dyn TooltipHandler>,
        options: ViewOptions,
        registry: ModuleRegistry,
    ) -> Result<View> {
        let view = View {
            inner: Rc::new(ViewInner {
                scene,
                loader,
                tooltip,
                registry: RefCell::new(registry),
                canvas: Cell::new(options.canvas),
                size: Cell::new((options.width, options.height)),
                origin: Cell::new(options.origin),
                headless: options.headless,
                renderer_type: RefCell::new(String::new()),
                renderer: RefCell::new(None),
                handler: RefCell::new(None),
                dispatching: RefCell::new(None),
                pending: RefCell::new(Vec::new()),
            }),
        };
        view.renderer(&options.renderer)?;
        Ok(view)
    }

    pub fn downgrade(&self) -> WeakView {
        WeakView(Rc::downgrade(&self.inner))
    }

    pub fn scene(&self) -> SceneRef {
        self.inner.scene.clone()
    }

    pub fn loader(&self) -> Rc<dyn ResourceLoader> {
        self.inner.loader.clone()
    }

    pub fn origin(&self) -> [f32; 2] {
        self.inner.origin.get()
    }

    pub fn size(&self) -> (f32, f32) {
        self.inner.size.get()
    }

    pub fn register_module(&self, name: &str, module: RenderModule) {
        self.inner.registry.borrow_mut().register(name, module);
    }

    pub fn renderer_type(&self) -> String {
        self.inner.renderer_type.borrow().clone()
    }

    /// Switches to the module registered as `name`: a fresh renderer and
    /// handler, with the previous handler's listeners and the painting flag
    /// carried over. A no-op
    /// when `name` is already active.
    pub fn renderer(&self, name: &str) -> Result<()> {
        if *self.inner.renderer_type.borrow() == name {
            return Ok(());
        }
        let module = self.inner.registry.borrow().get(name)?;
        let canvas = self.inner.canvas.get();
        let (width, height) = self.inner.size.get();
        let origin = self.inner.origin.get();

        let mut renderer = if self.inner.headless {
            (module.headless)(self.inner.loader.clone())
        } else {
            (module.renderer)(self.inner.loader.clone())
        };
        renderer.initialize(canvas, width, height, origin)?;
        renderer.set_painting(self.is_painting());

        let listeners = match self.inner.handler.borrow().as_ref() {
            Some(handler) => handler.handlers(),
            None => self.inner.dispatching.borrow().clone().unwrap_or_default(),
        };
        let mut handler = (module.handler)(self.inner.loader.clone(), self.inner.tooltip.clone());
        handler.initialize(canvas, origin, self);
        for (channel, listener) in listeners {
            handler.on(&channel.to_string(), listener);
        }

        *self.inner.renderer.borrow_mut() = Some(renderer);
        *self.inner.handler.borrow_mut() = Some(handler);
        let previous = self.inner.renderer_type.replace(name.to_string());
        if previous.is_empty() {
            log::info!("view renderer set to {}", name);
        } else {
            log::info!("view renderer switched from {} to {}", previous, name);
        }
        Ok(())
    }

    pub fn resize(&self, width: f32, height: f32, origin: [f32; 2]) -> Result<()> {
        self.inner.size.set((width, height));
        self.inner.origin.set(origin);
        if let Some(handler) = self.inner.handler.borrow_mut().as_mut() {
            handler.set_origin(origin);
        }
        self.with_renderer(|r| r.resize(width, height, origin))?
    }

    /// Runs `f` on the attached renderer.
    pub fn with_renderer<R>(&self, f: impl FnOnce(&mut dyn SceneRenderer) -> R) -> Result<R> {
        let mut slot = self
            .inner
            .renderer
            .try_borrow_mut()
            .map_err(|_| PainterError::Unsupported("re-entrant renderer access"))?;
        let renderer = slot.as_mut().ok_or(PainterError::NotInitialized)?;
        Ok(f(renderer.as_mut()))
    }

    /// Runs `f` on the attached renderer when it is the painter.
    pub fn with_painter<R>(&self, f: impl FnOnce(&mut PainterRenderer) -> R) -> Option<R> {
        let mut slot = self.inner.renderer.try_borrow_mut().ok()?;
        slot.as_mut()?.as_painter_mut().map(f)
    }

    pub fn is_painting(&self) -> bool {
        self.inner
            .renderer
            .try_borrow()
            .map(|slot| slot.as_ref().is_some_and(|r| r.is_painting()))
            .unwrap_or(false)
    }

    pub fn set_painting(&self, painting: bool) -> Result<()> {
        self.with_renderer(|r| r.set_painting(painting))
    }

    /// Registers `listener` on `name` (`click`, `gl_mousemove`,
    /// `mouseover.tag`, ...).
    pub fn on(&self, name: &str, listener: Listener) -> Option<ListenerId> {
        let mut slot = self.inner.handler.borrow_mut();
        match slot.as_mut() {
            Some(handler) => handler.on(name, listener),
            None => {
                let channel = Channel::parse(name)?;
                if let Some(pending) = self.inner.dispatching.borrow_mut().as_mut() {
                    pending.push((channel, listener));
                }
                None
            }
        }
    }

    pub fn off(&self, name: &str, listener: &Listener) -> bool {
        self.inner
            .handler
            .borrow_mut()
            .as_mut()
            .is_some_and(|h| h.off(name, listener))
    }

    pub fn native_listeners(&self) -> Vec<EventType> {
        self.inner
            .handler
            .borrow()
            .as_ref()
            .map(|h| h.native_listeners())
            .unwrap_or_default()
    }

    /// Delivers a native pointer event. Listeners may switch the renderer
    /// or paint while it is being handled.
    pub fn dispatch(&self, event: &PointerEvent) {
        let taken = self.inner.handler.borrow_mut().take();
        let Some(mut handler) = taken else {
            log::warn!("dropping {} event: no handler attached", event.kind);
            return;
        };
        let known = handler.handlers();
        let count = known.len();
        *self.inner.dispatching.borrow_mut() = Some(known);
        handler.handle(event);
        let registered = self.inner.dispatching.borrow_mut().take().unwrap_or_default();
        let mut slot = self.inner.handler.borrow_mut();
        if slot.is_none() {
            for (channel, listener) in registered.into_iter().skip(count) {
                handler.on(&channel.to_string(), listener);
            }
            *slot = Some(handler);
        }
    }

    /// Topmost interactive item under a canvas point.
    pub fn pick(&self, x: f32, y: f32) -> Option<ItemId> {
        self.inner
            .handler
            .borrow()
            .as_ref()
            .and_then(|h| h.pick(x, y))
    }

    /// Queues items for the next `run_async`.
    pub fn mark_dirty<I: IntoIterator<Item = ItemId>>(&self, items: I) {
        self.inner.pending.borrow_mut().extend(items);
    }

    pub fn pending(&self) -> Vec<ItemId> {
        self.inner.pending.borrow().clone()
    }

    /// Full render of the scene.
    pub fn run(&self) -> Result<()> {
        self.inner.pending.borrow_mut().clear();
        let scene = self.scene();
        self.with_renderer(|r| r.render(&scene, None))?
    }

    /// Renders the items queued since the last render.
    pub async fn run_async(&self) -> Result<()> {
        let items: Vec<ItemId> = self.inner.pending.borrow_mut().drain(..).collect();
        let scene = self.scene();
        self.with_renderer(|r| r.render(&scene, Some(&items)))?
    }
}
