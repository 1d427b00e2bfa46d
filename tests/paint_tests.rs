use plutonium_painter::traits::SceneRenderer;
use plutonium_painter::{
    paint, start_paint, stop_paint, Canvas, FileLoader, IndexValue, ItemId, ModuleRegistry, Paint,
    PaintConfig, PaintMode, PainterError, RenderModule, ResourceLoader, Scene, SceneRef,
    TooltipRecorder, View, ViewOptions, PAINTER_MODULE,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::rc::Rc;

fn point_scene(rows: &[Value]) -> SceneRef {
    let items: Vec<Value> = rows
        .iter()
        .map(|datum| json!({"x": 10, "y": 10, "fill": "steelblue", "datum": datum}))
        .collect();
    let scene = json!({
        "marktype": "group",
        "items": [{
            "x": 0, "y": 0, "width": 200, "height": 200,
            "items": [
                {"marktype": "symbol", "name": "points", "items": items},
                {"marktype": "symbol", "interactive": false, "items": [
                    {"x": 10, "y": 10, "fill": "gray", "datum": {"x": 50, "y": 50, "a": 0, "b": 5, "idx": 99}}
                ]}
            ]
        }]
    });
    Scene::from_json(&scene.to_string()).unwrap().into_ref()
}

fn view(scene: SceneRef) -> View {
    let options = ViewOptions {
        headless: true,
        ..Default::default()
    };
    View::new(
        scene,
        Rc::new(FileLoader::new(".")),
        Rc::new(TooltipRecorder::default()),
        options,
    )
    .unwrap()
}

fn indices(values: &[i64]) -> HashSet<IndexValue> {
    values.iter().map(|v| IndexValue::from(*v)).collect()
}

fn points(scene: &SceneRef) -> Vec<plutonium_painter::Item> {
    scene.borrow().root.items[0].items[0].items.clone()
}

fn ellipse_config(view: View) -> PaintConfig {
    let mut config = PaintConfig::new(view);
    config.mode = PaintMode::Color;
    config.fields = ["x".to_string(), "y".to_string()];
    config.point = [50.0, 50.0];
    config.radius = 1.0;
    config.range = json!([10, 10]);
    config.group_key = "label".to_string();
    config.group_value = json!("painted");
    config.index_key = "idx".to_string();
    config.new_color = "#ff0000".to_string();
    config
}

#[test_log::test]
fn color_mode_paints_inside_the_ellipse() {
    let scene = point_scene(&[
        json!({"x": 50, "y": 50, "idx": 0}),
        json!({"x": 60, "y": 50, "idx": 1}),
        json!({"x": 58, "y": 58, "idx": 2}),
        json!({"x": 45, "y": 52, "idx": 3}),
        json!({"x": 100, "y": 100, "idx": 4}),
    ]);
    let view = view(scene.clone());
    let result = paint(ellipse_config(view)).unwrap();

    assert_eq!(result.mut_indices, indices(&[0, 1, 3]));
    assert_eq!(result.mut_values.len(), 3);
    assert!(result
        .mut_values
        .iter()
        .all(|d| d.get("label") == Some(&json!("painted"))));
    assert_eq!(result.changes.removed, indices(&[0, 1, 3]));
    assert_eq!(result.changes.inserted.len(), 3);

    let items = points(&scene);
    for (i, item) in items.iter().enumerate() {
        let painted = [0, 1, 3].contains(&i);
        let expected = if painted { "#ff0000" } else { "steelblue" };
        assert_eq!(item.fill, Some(Paint::color(expected)), "item {}", i);
        let label = item.datum.as_ref().and_then(|d| d.get("label"));
        assert_eq!(label.is_some(), painted);
    }

    let hidden = &scene.borrow().root.items[0].items[1].items[0];
    assert_eq!(hidden.fill, Some(Paint::color("gray")));
}

#[test]
fn scalar_range_is_a_band_on_the_exact_y() {
    let scene = point_scene(&[
        json!({"a": 0, "b": 5, "idx": 0}),
        json!({"a": 3.9, "b": 5, "idx": 1}),
        json!({"a": -3.9, "b": 5, "idx": 2}),
        json!({"a": 4, "b": 5, "idx": 3}),
        json!({"a": 0, "b": 6, "idx": 4}),
        json!({"a": 0, "b": 5.5, "idx": 5}),
    ]);
    let mut config = ellipse_config(view(scene));
    config.fields = ["a".to_string(), "b".to_string()];
    config.point = [0.0, 5.0];
    config.radius = 2.0;
    config.range = json!(4);

    let result = paint(config).unwrap();
    assert_eq!(result.mut_indices, indices(&[0, 1, 2]));
}

#[test]
fn bad_range_is_rejected() {
    let scene = point_scene(&[json!({"x": 50, "y": 50, "idx": 0})]);
    for range in [json!("bad"), json!([1, 2, 3]), json!({"a": 1}), Value::Null] {
        let mut config = ellipse_config(view(scene.clone()));
        config.range = range;
        match paint(config) {
            Err(e) => {
                assert_eq!(e, PainterError::InvalidRange);
                assert_eq!(e.to_string(), "Invalid range");
            }
            Ok(_) => panic!("range accepted"),
        }
    }
    assert_eq!(points(&scene)[0].fill, Some(Paint::color("steelblue")));
}

#[test]
fn hide_mode_records_indices_only() {
    let scene = point_scene(&[
        json!({"x": 50, "y": 50, "idx": "a"}),
        json!({"x": 90, "y": 90, "idx": "b"}),
    ]);
    let mut config = ellipse_config(view(scene.clone()));
    config.mode = PaintMode::Hide;

    let result = paint(config).unwrap();
    let expected: HashSet<IndexValue> = [IndexValue::Text("a".to_string())].into_iter().collect();
    assert_eq!(result.mut_indices, expected);
    assert!(result.mut_values.is_empty());
    assert!(result.changes.inserted.is_empty());

    let items = points(&scene);
    assert_eq!(items[0].fill, Some(Paint::color("white")));
    assert_eq!(items[0].opacity, Some(0.0));
    assert_eq!(items[0].size, Some(0.0));
    assert!(items[0].datum.as_ref().is_some_and(|d| d.get("label").is_none()));
    assert_eq!(items[1].opacity, None);
}

#[test]
fn painted_items_render_when_awaited() {
    let scene = point_scene(&[json!({"x": 50, "y": 50, "idx": 0})]);
    let view = view(scene.clone());
    let result = paint(ellipse_config(view.clone())).unwrap();
    let painted: Vec<ItemId> = points(&scene).iter().map(|i| i.id).collect();
    assert_eq!(result.items, painted);
    assert_eq!(view.pending(), painted);

    pollster::block_on(result.rendered()).unwrap();
    assert!(view.pending().is_empty());
    let frames = view.with_painter(|p| p.context().map(|c| c.backend.stats().frames));
    assert_eq!(frames, Some(Some(1)));
}

#[test]
fn start_and_stop_are_idempotent() {
    let view = view(point_scene(&[]));
    start_paint(&view).unwrap();
    start_paint(&view).unwrap();
    assert!(view.is_painting());
    stop_paint(&view).unwrap();
    stop_paint(&view).unwrap();
    assert!(!view.is_painting());
}

#[derive(Default)]
struct NullRenderer {
    painting: bool,
}

impl SceneRenderer for NullRenderer {
    fn initialize(&mut self, _: Canvas, _: f32, _: f32, _: [f32; 2]) -> plutonium_painter::Result<()> {
        Ok(())
    }

    fn resize(&mut self, _: f32, _: f32, _: [f32; 2]) -> plutonium_painter::Result<()> {
        Ok(())
    }

    fn render(&mut self, _: &SceneRef, _: Option<&[ItemId]>) -> plutonium_painter::Result<()> {
        Ok(())
    }

    fn is_painting(&self) -> bool {
        self.painting
    }

    fn set_painting(&mut self, painting: bool) {
        self.painting = painting;
    }
}

fn null_renderer(_: Rc<dyn ResourceLoader>) -> Box<dyn SceneRenderer> {
    Box::new(NullRenderer::default())
}

fn canvas_view(scene: SceneRef) -> View {
    let mut registry = ModuleRegistry::new();
    registry.register(
        "canvas",
        RenderModule {
            renderer: null_renderer,
            headless: null_renderer,
            handler: RenderModule::painter().handler,
        },
    );
    let options = ViewOptions {
        headless: true,
        renderer: "canvas".to_string(),
        ..Default::default()
    };
    View::with_registry(
        scene,
        Rc::new(FileLoader::new(".")),
        Rc::new(TooltipRecorder::default()),
        options,
        registry,
    )
    .unwrap()
}

#[test_log::test]
fn paint_switches_the_view_to_the_painter_once() {
    let view = canvas_view(point_scene(&[json!({"x": 50, "y": 50, "idx": 0})]));
    assert_eq!(view.renderer_type(), "canvas");
    assert!(view.with_painter(|_| ()).is_none());

    paint(ellipse_config(view.clone())).unwrap();
    assert_eq!(view.renderer_type(), PAINTER_MODULE);
    view.set_painting(true).unwrap();

    paint(ellipse_config(view.clone())).unwrap();
    assert_eq!(view.renderer_type(), PAINTER_MODULE);
    assert!(view.is_painting());
}

#[test]
fn painting_flag_survives_the_first_switch() {
    let view = canvas_view(point_scene(&[json!({"x": 50, "y": 50, "idx": 0})]));
    start_paint(&view).unwrap();
    assert!(view.is_painting());

    paint(ellipse_config(view.clone())).unwrap();
    assert_eq!(view.renderer_type(), PAINTER_MODULE);
    assert!(view.is_painting());

    stop_paint(&view).unwrap();
    assert!(!view.is_painting());
}

#[test]
fn unknown_module_is_an_error() {
    let view = view(point_scene(&[]));
    assert_eq!(
        view.renderer("svg"),
        Err(PainterError::UnknownModule("svg".to_string()))
    );
    assert_eq!(view.renderer_type(), PAINTER_MODULE);
}
