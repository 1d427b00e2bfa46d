//! Pointer interaction for the painter: tracks the active item, turns native
//! pointer events into semantic events and mirrors every native event on its
//! `gl_` channel.

use crate::events::{
    Channel, EventType, HandlerEvent, Listener, PointerEvent, HREF_EVENT, TOOLTIP_HIDE_EVENT,
    TOOLTIP_SHOW_EVENT,
};
use crate::loader::{ResourceLoader, TooltipHandler};
use crate::pick::pick;
use crate::resize::Canvas;
use crate::scene::{Item, ItemId, SceneRef};
use crate::traits::SceneHandler;
use crate::view::{View, WeakView};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// One step of the response to a native event. Each native event maps to
/// its `gl_` reaction followed by its semantic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Gl,
    Move {
        moved: EventType,
        over: EventType,
        out: EventType,
    },
    Inactive(EventType),
    Down,
    Click,
    TouchStart,
    Touch(EventType),
    TouchEnd,
    Fire(EventType),
}

fn reactions(kind: EventType) -> [Reaction; 2] {
    let semantic = match kind {
        EventType::MouseMove => Reaction::Move {
            moved: EventType::MouseMove,
            over: EventType::MouseOver,
            out: EventType::MouseOut,
        },
        EventType::DragOver => Reaction::Move {
            moved: EventType::DragOver,
            over: EventType::DragEnter,
            out: EventType::DragLeave,
        },
        EventType::MouseOut | EventType::DragLeave => Reaction::Inactive(kind),
        EventType::MouseDown => Reaction::Down,
        EventType::Click => Reaction::Click,
        EventType::TouchStart => Reaction::TouchStart,
        EventType::TouchMove => Reaction::Touch(kind),
        EventType::TouchEnd => Reaction::TouchEnd,
        other => Reaction::Fire(other),
    };
    [Reaction::Gl, semantic]
}

/// Native events that must be forwarded for `kind` listeners to fire.
fn native_sources(kind: EventType) -> &'static [EventType] {
    match kind {
        EventType::MouseMove | EventType::MouseOver | EventType::MouseOut => {
            &[EventType::MouseMove, EventType::MouseOut]
        }
        EventType::DragOver | EventType::DragEnter | EventType::DragLeave => {
            &[EventType::DragOver, EventType::DragLeave]
        }
        EventType::Click => &[EventType::MouseDown, EventType::Click],
        EventType::DblClick => &[EventType::DblClick],
        EventType::MouseDown => &[EventType::MouseDown],
        EventType::MouseUp => &[EventType::MouseUp],
        EventType::Wheel => &[EventType::Wheel],
        EventType::TouchStart => &[EventType::TouchStart],
        EventType::TouchMove => &[EventType::TouchMove],
        EventType::TouchEnd => &[EventType::TouchEnd],
    }
}

pub struct PainterHandler {
    loader: Rc<dyn ResourceLoader>,
    tooltip: Rc<dyn TooltipHandler>,
    view: Option<WeakView>,
    scene: Option<SceneRef>,
    canvas: Option<Canvas>,
    origin: [f32; 2],
    active: Option<ItemId>,
    touch: Option<ItemId>,
    down: Option<ItemId>,
    first_touch: bool,
    listeners: HashMap<Channel, Vec<(ListenerId, Listener)>>,
    order: Vec<Channel>,
    native: HashSet<EventType>,
    next_id: u64,
}

impl PainterHandler {
    pub fn new(loader: Rc<dyn ResourceLoader>, tooltip: Rc<dyn TooltipHandler>) -> Self {
        Self {
            loader,
            tooltip,
            view: None,
            scene: None,
            canvas: None,
            origin: [0.0, 0.0],
            active: None,
            touch: None,
            down: None,
            first_touch: true,
            listeners: HashMap::new(),
            order: Vec::new(),
            native: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn active(&self) -> Option<ItemId> {
        self.active
    }

    pub fn touch(&self) -> Option<ItemId> {
        self.touch
    }

    pub fn down(&self) -> Option<ItemId> {
        self.down
    }

    fn view(&self) -> Option<View> {
        self.view.as_ref().and_then(WeakView::upgrade)
    }

    fn is_painting(&self) -> bool {
        self.view().is_some_and(|view| view.is_painting())
    }

    /// Records the native listeners `channel` needs. Nothing is attached
    /// before the handler has a canvas; `initialize` catches up.
    fn listener_check(&mut self, channel: Channel) {
        if self.canvas.is_none() {
            return;
        }
        for source in native_sources(channel.event_type()) {
            if self.native.insert(*source) {
                log::debug!("listening for native {}", source);
            }
        }
    }

    fn lookup(&self, id: Option<ItemId>) -> Option<Item> {
        let id = id?;
        let scene = self.scene.as_ref()?;
        let scene = scene.borrow();
        scene.find_item(id).cloned()
    }

    fn pick_event(&self, event: &PointerEvent) -> Option<ItemId> {
        let scene = self.scene.as_ref()?;
        let scene = scene.borrow();
        pick(&scene, event.x - self.origin[0], event.y - self.origin[1])
    }

    fn notify(&self, channel: Channel, event: &PointerEvent, item: Option<&Item>) {
        let Some(listeners) = self.listeners.get(&channel) else {
            return;
        };
        let listeners: Vec<Listener> = listeners.iter().map(|(_, l)| l.clone()).collect();
        let payload = HandlerEvent {
            channel,
            native: *event,
            point: [event.x, event.y],
            origin: self.origin,
            view: self.view(),
        };
        for listener in listeners {
            listener(&payload, item);
        }
    }

    fn handle_href(&self, href: &str) {
        match self.loader.sanitize(href) {
            Some(url) => self.loader.open_href(&url),
            None => log::debug!("dropped link {}", href),
        }
    }

    fn handle_tooltip(&self, item: Option<&Item>, show: bool) {
        let Some(item) = item else {
            return;
        };
        let Some(value) = item.tooltip.as_ref().filter(|v| !v.is_null()) else {
            return;
        };
        self.tooltip
            .tooltip(Some(item), if show { Some(value) } else { None }, show);
    }

    /// Fires `kind` for the active item (the touch item for touch events):
    /// links and tooltips first, then listeners in registration order.
    fn fire(&mut self, kind: EventType, event: &PointerEvent, touch: bool) {
        let item = self.lookup(if touch { self.touch } else { self.active });
        let href = item.as_ref().and_then(|i| i.href.clone());
        match href {
            Some(href) if kind == HREF_EVENT => self.handle_href(&href),
            _ if kind == TOOLTIP_SHOW_EVENT || kind == TOOLTIP_HIDE_EVENT => {
                let show = kind == TOOLTIP_SHOW_EVENT && !self.is_painting();
                self.handle_tooltip(item.as_ref(), show);
            }
            _ => {}
        }
        self.notify(Channel::Semantic(kind), event, item.as_ref());
    }

    fn move_to(&mut self, event: &PointerEvent, moved: EventType, over: EventType, out: EventType) {
        let picked = self.pick_event(event);
        let previous = self.active;
        if picked == previous {
            self.fire(moved, event, false);
            return;
        }
        let exited = match previous {
            None => false,
            Some(_) => self.lookup(previous).map_or(true, |item| item.exit),
        };
        if !exited {
            self.fire(out, event, false);
        }
        self.active = picked;
        self.fire(over, event, false);
        self.fire(moved, event, false);
    }

    fn react(&mut self, reaction: Reaction, event: &PointerEvent) {
        match reaction {
            Reaction::Gl => {
                let active = if event.kind.is_touch() { self.touch } else { self.active };
                let item = self.lookup(active);
                self.notify(Channel::Gl(event.kind), event, item.as_ref());
            }
            Reaction::Move { moved, over, out } => self.move_to(event, moved, over, out),
            Reaction::Inactive(kind) => {
                self.fire(kind, event, false);
                self.active = None;
            }
            Reaction::Down => {
                self.down = self.active;
                self.fire(EventType::MouseDown, event, false);
            }
            Reaction::Click => {
                if self.down == self.active {
                    self.fire(EventType::Click, event, false);
                    self.down = None;
                }
            }
            Reaction::TouchStart => {
                self.touch = self.pick_event(event);
                if self.first_touch {
                    self.active = self.touch;
                    self.first_touch = false;
                }
                self.fire(EventType::TouchStart, event, true);
            }
            Reaction::Touch(kind) => self.fire(kind, event, true),
            Reaction::TouchEnd => {
                self.fire(EventType::TouchEnd, event, true);
                self.touch = None;
            }
            Reaction::Fire(kind) => self.fire(kind, event, false),
        }
    }
}

impl SceneHandler for PainterHandler {
    fn initialize(&mut self, canvas: Canvas, origin: [f32; 2], view: &View) {
        self.canvas = Some(canvas);
        self.origin = origin;
        self.view = Some(view.downgrade());
        self.scene = Some(view.scene());
        for channel in self.order.clone() {
            self.listener_check(channel);
        }
    }

    fn set_origin(&mut self, origin: [f32; 2]) {
        self.origin = origin;
    }

    fn on(&mut self, name: &str, listener: Listener) -> Option<ListenerId> {
        let Some(channel) = Channel::parse(name) else {
            log::warn!("ignoring listener for unknown event `{}`", name);
            return None;
        };
        let entries = self.listeners.entry(channel).or_default();
        if let Some((id, _)) = entries.iter().find(|(_, l)| Rc::ptr_eq(l, &listener)) {
            return Some(*id);
        }
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        entries.push((id, listener));
        if !self.order.contains(&channel) {
            self.order.push(channel);
        }
        self.listener_check(channel);
        Some(id)
    }

    fn off(&mut self, name: &str, listener: &Listener) -> bool {
        let Some(channel) = Channel::parse(name) else {
            return false;
        };
        let Some(entries) = self.listeners.get_mut(&channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(_, l)| !Rc::ptr_eq(l, listener));
        before != entries.len()
    }

    fn handlers(&self) -> Vec<(Channel, Listener)> {
        self.order
            .iter()
            .flat_map(|channel| {
                self.listeners
                    .get(channel)
                    .into_iter()
                    .flatten()
                    .map(move |(_, l)| (*channel, l.clone()))
            })
            .collect()
    }

    fn native_listeners(&self) -> Vec<EventType> {
        EventType::ALL
            .into_iter()
            .filter(|t| self.native.contains(t))
            .collect()
    }

    fn handle(&mut self, event: &PointerEvent) {
        for reaction in reactions(event.kind) {
            self.react(reaction, event);
        }
    }

    fn pick(&self, x: f32, y: f32) -> Option<ItemId> {
        self.pick_event(&PointerEvent::new(EventType::MouseMove, x, y))
    }
}
