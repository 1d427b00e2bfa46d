use crate::error::{PainterError, Result};
use crate::events::{Channel, EventType, Listener, PointerEvent};
use crate::handler::{ListenerId, PainterHandler};
use crate::loader::{ResourceLoader, TooltipHandler};
use crate::renderer::PainterRenderer;
use crate::resize::Canvas;
use crate::scene::{ItemId, SceneRef};
use crate::view::View;
use std::collections::HashMap;
use std::rc::Rc;

/// What a view needs from a renderer.
pub trait SceneRenderer {
    fn initialize(&mut self, canvas: Canvas, width: f32, height: f32, origin: [f32; 2])
        -> Result<()>;
    fn resize(&mut self, width: f32, height: f32, origin: [f32; 2]) -> Result<()>;
    /// `items` lists the items changed since the last render; `None` redraws
    /// everything.
    fn render(&mut self, scene: &SceneRef, items: Option<&[ItemId]>) -> Result<()>;
    fn is_painting(&self) -> bool;
    fn set_painting(&mut self, painting: bool);

    fn as_painter(&self) -> Option<&PainterRenderer> {
        None
    }

    fn as_painter_mut(&mut self) -> Option<&mut PainterRenderer> {
        None
    }
}

/// What a view needs from an event handler.
pub trait SceneHandler {
    fn initialize(&mut self, canvas: Canvas, origin: [f32; 2], view: &View);
    fn set_origin(&mut self, origin: [f32; 2]);
    fn on(&mut self, name: &str, listener: Listener) -> Option<ListenerId>;
    fn off(&mut self, name: &str, listener: &Listener) -> bool;
    /// Registered listeners in registration order, for handing over to a
    /// replacement handler.
    fn handlers(&self) -> Vec<(Channel, Listener)>;
    /// Native event types the host should forward.
    fn native_listeners(&self) -> Vec<EventType>;
    fn handle(&mut self, event: &PointerEvent);
    fn pick(&self, x: f32, y: f32) -> Option<ItemId>;
}

pub type RendererFactory = fn(Rc<dyn ResourceLoader>) -> Box<dyn SceneRenderer>;
pub type HandlerFactory =
    fn(Rc<dyn ResourceLoader>, Rc<dyn TooltipHandler>) -> Box<dyn SceneHandler>;

/// A rendering backend a view can switch to by name.
#[derive(Clone, Copy)]
pub struct RenderModule {
    pub renderer: RendererFactory,
    pub headless: RendererFactory,
    pub handler: HandlerFactory,
}

fn painter_renderer(loader: Rc<dyn ResourceLoader>) -> Box<dyn SceneRenderer> {
    Box::new(PainterRenderer::new(loader))
}

fn painter_headless(loader: Rc<dyn ResourceLoader>) -> Box<dyn SceneRenderer> {
    Box::new(PainterRenderer::headless(loader))
}

fn painter_handler(
    loader: Rc<dyn ResourceLoader>,
    tooltip: Rc<dyn TooltipHandler>,
) -> Box<dyn SceneHandler> {
    Box::new(PainterHandler::new(loader, tooltip))
}

impl RenderModule {
    pub fn painter() -> Self {
        Self {
            renderer: painter_renderer,
            headless: painter_headless,
            handler: painter_handler,
        }
    }
}

pub const PAINTER_MODULE: &str = "painter";

#[derive(Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, RenderModule>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert(PAINTER_MODULE.to_string(), RenderModule::painter());
        Self { modules }
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the module registered under `name`.
    pub fn register(&mut self, name: &str, module: RenderModule) {
        self.modules.insert(name.to_string(), module);
    }

    pub fn get(&self, name: &str) -> Result<RenderModule> {
        self.modules
            .get(name)
            .copied()
            .ok_or_else(|| PainterError::UnknownModule(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painter_is_preregistered() {
        let registry = ModuleRegistry::new();
        assert!(registry.contains(PAINTER_MODULE));
        assert!(matches!(
            registry.get("svg"),
            Err(PainterError::UnknownModule(name)) if name == "svg"
        ));
    }
}
