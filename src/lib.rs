extern crate image;

pub mod camera;
pub mod color;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gpu;
pub mod handler;
pub mod loader;
pub mod marks;
pub mod matrix;
pub mod overlay;
pub mod paint;
pub mod pick;
pub mod renderer;
pub mod resize;
pub mod rng;
pub mod scene;
pub mod traits;
pub mod utils;
pub mod view;

pub use config::RendererConfig;
pub use error::{PainterError, Result};
pub use events::{Channel, EventType, HandlerEvent, Listener, PointerEvent};
pub use handler::{ListenerId, PainterHandler};
pub use loader::{FileLoader, ResourceLoader, TooltipHandler, TooltipRecorder};
pub use paint::{paint, start_paint, stop_paint, Changeset, IndexValue, PaintConfig, PaintMode, PaintResult};
pub use renderer::PainterRenderer;
pub use resize::Canvas;
pub use scene::{Datum, Item, ItemId, Mark, MarkId, MarkType, Paint, Scene, SceneRef};
pub use traits::{ModuleRegistry, RenderModule, SceneHandler, SceneRenderer, PAINTER_MODULE};
pub use view::{View, ViewOptions, WeakView};
