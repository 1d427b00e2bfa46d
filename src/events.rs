//! Event vocabulary shared by the handler, its listeners and the host.

use crate::view::View;
use std::fmt;
use std::rc::Rc;

use crate::scene::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    DblClick,
    MouseDown,
    MouseUp,
    MouseMove,
    MouseOver,
    MouseOut,
    Wheel,
    DragEnter,
    DragOver,
    DragLeave,
    TouchStart,
    TouchMove,
    TouchEnd,
}

/// Clicks open links.
pub const HREF_EVENT: EventType = EventType::Click;
/// Moves show the tooltip of the active item.
pub const TOOLTIP_SHOW_EVENT: EventType = EventType::MouseMove;
/// Leaving an item hides it.
pub const TOOLTIP_HIDE_EVENT: EventType = EventType::MouseOut;

impl EventType {
    pub const ALL: [EventType; 14] = [
        EventType::Click,
        EventType::DblClick,
        EventType::MouseDown,
        EventType::MouseUp,
        EventType::MouseMove,
        EventType::MouseOver,
        EventType::MouseOut,
        EventType::Wheel,
        EventType::DragEnter,
        EventType::DragOver,
        EventType::DragLeave,
        EventType::TouchStart,
        EventType::TouchMove,
        EventType::TouchEnd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::DblClick => "dblclick",
            EventType::MouseDown => "mousedown",
            EventType::MouseUp => "mouseup",
            EventType::MouseMove => "mousemove",
            EventType::MouseOver => "mouseover",
            EventType::MouseOut => "mouseout",
            EventType::Wheel => "wheel",
            EventType::DragEnter => "dragenter",
            EventType::DragOver => "dragover",
            EventType::DragLeave => "dragleave",
            EventType::TouchStart => "touchstart",
            EventType::TouchMove => "touchmove",
            EventType::TouchEnd => "touchend",
        }
    }

    pub fn parse(name: &str) -> Option<EventType> {
        EventType::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn is_touch(&self) -> bool {
        matches!(
            self,
            EventType::TouchStart | EventType::TouchMove | EventType::TouchEnd
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A listener channel: the semantic event, or its `gl_` twin that carries
/// canvas coordinates for the paint tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Semantic(EventType),
    Gl(EventType),
}

impl Channel {
    /// Parses `click`, `gl_click` or `click.namespace`.
    pub fn parse(name: &str) -> Option<Channel> {
        let name = name.split('.').next().unwrap_or(name);
        match name.strip_prefix("gl_") {
            Some(rest) => EventType::parse(rest).map(Channel::Gl),
            None => EventType::parse(name).map(Channel::Semantic),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Channel::Semantic(t) | Channel::Gl(t) => *t,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Semantic(t) => write!(f, "{}", t),
            Channel::Gl(t) => write!(f, "gl_{}", t),
        }
    }
}

/// A native pointer event as the host delivers it, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: EventType,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(kind: EventType, x: f32, y: f32) -> Self {
        Self { kind, x, y }
    }
}

/// What a listener receives.
#[derive(Clone)]
pub struct HandlerEvent {
    /// The channel this event was fired on.
    pub channel: Channel,
    pub native: PointerEvent,
    /// Canvas-relative pointer position.
    pub point: [f32; 2],
    pub origin: [f32; 2],
    /// The view owning the handler, when it is still alive.
    pub view: Option<View>,
}

impl HandlerEvent {
    /// Pointer position in scene coordinates.
    pub fn scene_point(&self) -> [f32; 2] {
        [self.point[0] - self.origin[0], self.point[1] - self.origin[1]]
    }
}

impl fmt::Debug for HandlerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEvent")
            .field("channel", &self.channel)
            .field("native", &self.native)
            .field("point", &self.point)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Listeners are compared by pointer: registering the same `Rc` twice on
/// one channel is a no-op.
pub type Listener = Rc<dyn Fn(&HandlerEvent, Option<&Item>)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_round_trip() {
        for t in EventType::ALL {
            assert_eq!(Channel::parse(t.name()), Some(Channel::Semantic(t)));
            let gl = Channel::Gl(t).to_string();
            assert_eq!(Channel::parse(&gl), Some(Channel::Gl(t)));
        }
    }

    #[test]
    fn namespaces_are_stripped() {
        assert_eq!(
            Channel::parse("click.paint"),
            Some(Channel::Semantic(EventType::Click))
        );
        assert_eq!(Channel::parse("gl_mousemove.brush").map(|c| c.event_type()), Some(EventType::MouseMove));
        assert_eq!(Channel::parse("keydown"), None);
    }
}
