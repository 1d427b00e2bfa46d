use plutonium_painter::{
    start_paint, stop_paint, EventType, FileLoader, HandlerEvent, Item, Listener, PointerEvent,
    RenderModule, Scene, TooltipRecorder, View, ViewOptions,
};
use std::cell::RefCell;
use std::rc::Rc;

const SCENE: &str = r#"{
    "marktype": "group",
    "items": [{
        "x": 0, "y": 0, "width": 200, "height": 200,
        "items": [{
            "marktype": "rect",
            "items": [
                {"x": 10, "y": 10, "width": 20, "height": 20, "fill": "red",
                 "tooltip": "A", "href": "https://example.com/a"},
                {"x": 50, "y": 50, "width": 20, "height": 20, "fill": "blue",
                 "tooltip": "B", "href": "javascript:alert(1)"}
            ]
        }]
    }]
}"#;

struct Fixture {
    view: View,
    loader: Rc<FileLoader>,
    tooltips: Rc<TooltipRecorder>,
    log: Rc<RefCell<Vec<String>>>,
}

fn fixture(origin: [f32; 2]) -> Fixture {
    let loader = Rc::new(FileLoader::new("."));
    let tooltips = Rc::new(TooltipRecorder::default());
    let options = ViewOptions {
        width: 200.0,
        height: 200.0,
        origin,
        headless: true,
        ..Default::default()
    };
    let scene = Scene::from_json(SCENE).unwrap().into_ref();
    let view = View::new(scene, loader.clone(), tooltips.clone(), options).unwrap();
    Fixture {
        view,
        loader,
        tooltips,
        log: Rc::new(RefCell::new(Vec::new())),
    }
}

fn recorder(log: &Rc<RefCell<Vec<String>>>) -> Listener {
    let log = log.clone();
    Rc::new(move |evt: &HandlerEvent, item: Option<&Item>| {
        let name = item
            .and_then(|i| i.tooltip.as_ref())
            .and_then(|t| t.as_str())
            .unwrap_or("-")
            .to_string();
        log.borrow_mut().push(format!("{}:{}", evt.channel, name));
    })
}

fn send(view: &View, kind: EventType, x: f32, y: f32) {
    view.dispatch(&PointerEvent::new(kind, x, y));
}

fn take(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

#[test_log::test]
fn hover_fires_out_over_move() {
    let f = fixture([0.0, 0.0]);
    let listener = recorder(&f.log);
    for name in ["mouseover", "mouseout", "mousemove"] {
        f.view.on(name, listener.clone());
    }

    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    assert_eq!(take(&f.log), ["mouseout:-", "mouseover:A", "mousemove:A"]);

    send(&f.view, EventType::MouseMove, 16.0, 16.0);
    assert_eq!(take(&f.log), ["mousemove:A"]);

    send(&f.view, EventType::MouseMove, 55.0, 55.0);
    assert_eq!(take(&f.log), ["mouseout:A", "mouseover:B", "mousemove:B"]);

    send(&f.view, EventType::MouseOut, 300.0, 300.0);
    assert_eq!(take(&f.log), ["mouseout:B"]);

    send(&f.view, EventType::MouseMove, 150.0, 150.0);
    assert_eq!(take(&f.log), ["mousemove:-"]);
}

#[test]
fn removed_item_gets_no_exit_event() {
    let f = fixture([0.0, 0.0]);
    let listener = recorder(&f.log);
    for name in ["mouseover", "mouseout", "mousemove"] {
        f.view.on(name, listener.clone());
    }
    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    take(&f.log);

    f.view.scene().borrow_mut().root.items[0].items[0].items.remove(0);
    send(&f.view, EventType::MouseMove, 55.0, 55.0);
    assert_eq!(take(&f.log), ["mouseover:B", "mousemove:B"]);
}

#[test]
fn dragging_away_cancels_the_click() {
    let f = fixture([0.0, 0.0]);
    f.view.on("click", recorder(&f.log));

    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    send(&f.view, EventType::MouseDown, 15.0, 15.0);
    send(&f.view, EventType::MouseMove, 55.0, 55.0);
    send(&f.view, EventType::Click, 55.0, 55.0);
    assert!(take(&f.log).is_empty());

    send(&f.view, EventType::MouseDown, 55.0, 55.0);
    send(&f.view, EventType::Click, 55.0, 55.0);
    assert_eq!(take(&f.log), ["click:B"]);
}

#[test]
fn gl_channel_fires_first_with_canvas_point() {
    let f = fixture([5.0, 5.0]);
    let log = f.log.clone();
    let seen = Rc::new(RefCell::new(None));
    let seen_in = seen.clone();
    let gl: Listener = Rc::new(move |evt: &HandlerEvent, _item: Option<&Item>| {
        log.borrow_mut().push(evt.channel.to_string());
        *seen_in.borrow_mut() = Some((evt.point, evt.origin, evt.view.is_some()));
    });
    f.view.on("gl_click", gl);
    f.view.on("click", recorder(&f.log));

    send(&f.view, EventType::Click, 42.0, 24.0);
    assert_eq!(take(&f.log), ["gl_click", "click:-"]);
    assert_eq!(*seen.borrow(), Some(([42.0, 24.0], [5.0, 5.0], true)));
}

#[test]
fn origin_offsets_picking() {
    let f = fixture([100.0, 100.0]);
    f.view.on("mouseover", recorder(&f.log));
    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    assert!(take(&f.log).is_empty());
    send(&f.view, EventType::MouseMove, 115.0, 115.0);
    assert_eq!(take(&f.log), ["mouseover:A"]);
    assert!(f.view.pick(115.0, 115.0).is_some());
}

#[test_log::test]
fn tooltips_hide_while_painting() {
    let f = fixture([0.0, 0.0]);
    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    assert_eq!(f.tooltips.current.borrow().as_deref(), Some("A"));

    start_paint(&f.view).unwrap();
    send(&f.view, EventType::MouseMove, 16.0, 16.0);
    assert_eq!(*f.tooltips.current.borrow(), None);

    stop_paint(&f.view).unwrap();
    send(&f.view, EventType::MouseMove, 17.0, 17.0);
    assert_eq!(f.tooltips.current.borrow().as_deref(), Some("A"));
}

#[test]
fn clicks_open_sanitized_links() {
    let f = fixture([0.0, 0.0]);
    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    send(&f.view, EventType::MouseDown, 15.0, 15.0);
    send(&f.view, EventType::Click, 15.0, 15.0);

    send(&f.view, EventType::MouseMove, 55.0, 55.0);
    send(&f.view, EventType::MouseDown, 55.0, 55.0);
    send(&f.view, EventType::Click, 55.0, 55.0);
    assert_eq!(f.loader.opened(), vec!["https://example.com/a".to_string()]);
}

#[test]
fn listeners_are_deduplicated_and_removable() {
    let f = fixture([0.0, 0.0]);
    let listener = recorder(&f.log);
    let first = f.view.on("wheel", listener.clone());
    let second = f.view.on("wheel.zoom", listener.clone());
    assert!(first.is_some());
    assert_eq!(first, second);

    send(&f.view, EventType::Wheel, 1.0, 1.0);
    assert_eq!(take(&f.log), ["wheel:-"]);

    assert!(f.view.off("wheel.zoom", &listener));
    assert!(!f.view.off("wheel", &listener));
    send(&f.view, EventType::Wheel, 1.0, 1.0);
    assert!(take(&f.log).is_empty());
    assert_eq!(f.view.on("keypress", listener), None);
}

#[test]
fn native_listeners_attach_lazily() {
    let f = fixture([0.0, 0.0]);
    assert!(f.view.native_listeners().is_empty());
    let listener = recorder(&f.log);
    f.view.on("mouseover", listener.clone());
    f.view.on("mouseout", listener.clone());
    assert_eq!(
        f.view.native_listeners(),
        vec![EventType::MouseMove, EventType::MouseOut]
    );
    f.view.on("gl_click", listener);
    assert_eq!(
        f.view.native_listeners(),
        vec![
            EventType::Click,
            EventType::MouseDown,
            EventType::MouseMove,
            EventType::MouseOut
        ]
    );
}

#[test]
fn listeners_survive_a_renderer_switch() {
    let f = fixture([0.0, 0.0]);
    f.view.on("mouseover", recorder(&f.log));
    f.view.register_module("mirror", RenderModule::painter());
    f.view.renderer("mirror").unwrap();
    assert_eq!(f.view.renderer_type(), "mirror");
    assert_eq!(
        f.view.native_listeners(),
        vec![EventType::MouseMove, EventType::MouseOut]
    );

    send(&f.view, EventType::MouseMove, 15.0, 15.0);
    assert_eq!(take(&f.log), ["mouseover:A"]);
}

#[test]
fn touch_tracks_its_own_item() {
    let f = fixture([0.0, 0.0]);
    let listener = recorder(&f.log);
    for name in ["touchstart", "touchmove", "touchend"] {
        f.view.on(name, listener.clone());
    }
    send(&f.view, EventType::TouchStart, 55.0, 55.0);
    send(&f.view, EventType::TouchMove, 15.0, 15.0);
    send(&f.view, EventType::TouchEnd, 15.0, 15.0);
    send(&f.view, EventType::TouchMove, 15.0, 15.0);
    assert_eq!(
        take(&f.log),
        ["touchstart:B", "touchmove:B", "touchend:B", "touchmove:-"]
    );
}
