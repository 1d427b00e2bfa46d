use plutonium_painter::geometry::{build_path_geometry, geometry_for_item, geometry_for_path, GeomSlot};
use plutonium_painter::gpu::{BufferKey, DrawCommand, ShaderSet};
use plutonium_painter::traits::SceneRenderer;
use plutonium_painter::utils::Rectangle;
use plutonium_painter::{
    Canvas, FileLoader, Item, PainterError, PainterRenderer, RendererConfig, Scene, SceneRef,
};
use std::rc::Rc;
use winit::dpi::PhysicalSize;

const SCENE: &str = r#"{
    "marktype": "group",
    "items": [{
        "x": 10, "y": 10, "width": 100, "height": 80,
        "items": [
            {"marktype": "path", "items": [
                {"x": 5, "y": 5, "path": "M0,0L20,0L20,20Z", "fill": "red"}
            ]},
            {"marktype": "rect", "items": [
                {"x": 30, "y": 30, "width": 10, "height": 10, "fill": "blue"}
            ]},
            {"marktype": "symbol", "items": [
                {"x": 60, "y": 40, "fill": "green"}
            ]}
        ]
    }]
}"#;

fn renderer() -> PainterRenderer {
    let mut r = PainterRenderer::headless(Rc::new(FileLoader::new(".")));
    r.initialize(Canvas::detached(), 200.0, 100.0, [0.0, 0.0])
        .unwrap();
    r
}

fn scene() -> SceneRef {
    Scene::from_json(SCENE).unwrap().into_ref()
}

fn buffers_of(r: &PainterRenderer) -> Vec<BufferKey> {
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    frame
        .commands
        .iter()
        .flat_map(|c| match c {
            DrawCommand::Mesh {
                triangles, colors, ..
            } => vec![*triangles, *colors],
            DrawCommand::Symbol {
                unit, attributes, ..
            }
            | DrawCommand::Rect {
                unit, attributes, ..
            } => vec![*unit, *attributes],
            DrawCommand::Image { .. } => vec![],
        })
        .collect()
}

#[test_log::test]
fn path_geometry_is_shared_until_the_cache_clears() {
    let mut r = renderer();
    let ctx = r.context_mut().unwrap();
    let a = geometry_for_path(ctx, "M0,0L10,0L10,10Z", 1.0);
    let b = geometry_for_path(ctx, "M0,0L10,0L10,10Z", 1.0);
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(ctx.stats.path_hits, 1);

    ctx.path_cache.clear();
    let c = geometry_for_path(ctx, "M0,0L10,0L10,10Z", 1.0);
    assert!(!Rc::ptr_eq(&a, &c));
}

#[test]
fn closed_flag_follows_the_final_command() {
    assert!(build_path_geometry("M0,0L10,0L10,10Z", 1.0, 0.0).closed);
    assert!(build_path_geometry("M0,0L10,0L10,10z ", 1.0, 0.0).closed);
    assert!(!build_path_geometry("M0,0L10,0L10,10", 1.0, 0.0).closed);
}

#[test]
fn invisible_items_have_no_triangles() {
    let mut r = renderer();
    let ctx = r.context_mut().unwrap();
    let shape = geometry_for_path(ctx, "M0,0L10,0L10,10L0,10Z", 1.0);
    let mut item = Item::at(0.0, 0.0);
    item.stroke_width = Some(0.0);
    let geometry = geometry_for_item(ctx, GeomSlot::Item(item.id), &item, &shape);
    assert_eq!(geometry.num_triangles, 0);

    item.fill = Some(plutonium_painter::Paint::color("transparent"));
    let geometry = geometry_for_item(ctx, GeomSlot::Item(item.id), &item, &shape);
    assert_eq!(geometry.num_triangles, 0);
}

#[test_log::test]
fn unchanged_scene_reuses_every_buffer() {
    let scene = scene();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let first = buffers_of(&r);
    let created = r.context().unwrap().backend.stats().buffers_created;
    assert_eq!(first.len(), 6);

    r.render(&scene, Some(&[])).unwrap();
    assert_eq!(buffers_of(&r), first);
    assert_eq!(r.context().unwrap().backend.stats().buffers_created, created);
    let stats = r.context().unwrap().stats;
    assert_eq!(stats.item_hits, 1);
    assert_eq!(stats.shape_hits, 2);
}

#[test_log::test]
fn dirty_item_rebuilds_only_its_mesh() {
    let scene = scene();
    let path_item = scene.borrow().root.items[0].items[0].items[0].id;
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let before = r.context().unwrap().backend.stats();

    r.render(&scene, Some(&[path_item])).unwrap();
    let after = r.context().unwrap().backend.stats();
    assert_eq!(after.buffers_created, before.buffers_created + 2);
    assert_eq!(after.buffers_live, before.buffers_live);
}

#[test]
fn overlay_is_blitted_last_over_the_canvas() {
    let scene = scene();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    match frame.commands.last() {
        Some(DrawCommand::Image { bounds, .. }) => {
            assert_eq!(*bounds, Rectangle::new(0.0, 0.0, 200.0, 100.0))
        }
        other => panic!("expected overlay blit, got {:?}", other),
    }
    assert_eq!(frame.clear, [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn last_frame_textures_are_released() {
    let scene = scene();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    r.render(&scene, None).unwrap();
    let stats = r.context().unwrap().backend.stats();
    assert_eq!(stats.textures_created, 2);
    assert_eq!(stats.textures_live, 1);
}

#[test_log::test]
fn full_redraw_prunes_removed_items() {
    let scene = scene();
    let path_item = scene.borrow().root.items[0].items[0].items[0].id;
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let live = r.context().unwrap().backend.stats().buffers_live;

    scene.borrow_mut().root.items[0].items.remove(0);
    r.render(&scene, None).unwrap();
    let ctx = r.context().unwrap();
    assert!(!ctx.geometry.contains_key(&GeomSlot::Item(path_item)));
    assert_eq!(ctx.backend.stats().buffers_live, live - 2);
}

#[test]
fn render_before_initialize_fails() {
    let mut r = PainterRenderer::headless(Rc::new(FileLoader::new(".")));
    assert_eq!(r.render(&scene(), None), Err(PainterError::NotInitialized));
    assert_eq!(r.frame(), Ok(()));
}

#[test]
fn broken_shader_fails_initialize() {
    let mut shaders = ShaderSet::default();
    shaders.mesh = "@vertex fn main() {}".to_string();
    let mut r = PainterRenderer::headless(Rc::new(FileLoader::new("."))).with_shaders(shaders);
    let result = r.initialize(Canvas::detached(), 10.0, 10.0, [0.0, 0.0]);
    assert!(matches!(
        result,
        Err(PainterError::ShaderCompile { ref program, .. }) if program == "mesh"
    ));
    assert!(!r.is_initialized());
}

#[test]
fn resize_round_trip_restores_the_clip() {
    let mut r = renderer();
    r.resize(300.0, 150.0, [0.0, 0.0]).unwrap();
    assert_eq!(
        r.context().unwrap().clip,
        Rectangle::new(0.0, 0.0, 300.0, 150.0)
    );
    r.resize(200.0, 100.0, [0.0, 0.0]).unwrap();
    assert_eq!(
        r.context().unwrap().clip,
        Rectangle::new(0.0, 0.0, 200.0, 100.0)
    );
}

#[test]
fn device_pixel_ratio_scales_the_target_only() {
    let mut r = PainterRenderer::headless(Rc::new(FileLoader::new(".")));
    r.initialize(Canvas::attached(2.0), 200.0, 100.0, [0.0, 0.0])
        .unwrap();
    let ctx = r.context().unwrap();
    assert_eq!(ctx.backend.size(), PhysicalSize::new(400, 200));
    assert_eq!(ctx.bounds, Rectangle::new(0.0, 0.0, 200.0, 100.0));
    assert_eq!(ctx.ratio, 2.0);
}

#[test]
fn resize_forces_a_full_redraw() {
    let scene = scene();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let created = r.context().unwrap().backend.stats().buffers_created;
    r.resize(200.0, 100.0, [0.0, 0.0]).unwrap();
    r.render(&scene, Some(&[])).unwrap();
    assert!(r.context().unwrap().backend.stats().buffers_created > created);
}

#[test]
fn frame_repeats_the_last_scene() {
    let scene = scene();
    let mut r = renderer();
    r.frame().unwrap();
    assert_eq!(r.context().unwrap().backend.stats().frames, 0);
    r.render(&scene, None).unwrap();
    r.rotate(0.0, 0.3, 0.0);
    r.frame().unwrap();
    let ctx = r.context().unwrap();
    assert_eq!(ctx.backend.stats().frames, 2);
    assert_eq!(ctx.stats.item_hits, 1);
}

#[test]
fn config_and_setters() {
    let config =
        RendererConfig::from_json_str(r#"{"background": "black", "depth_test": true}"#).unwrap();
    let mut r = PainterRenderer::headless(Rc::new(FileLoader::new("."))).with_config(config);
    r.initialize(Canvas::detached(), 50.0, 50.0, [0.0, 0.0])
        .unwrap();
    r.render(&scene(), None).unwrap();
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    assert_eq!(frame.clear, [0.0, 0.0, 0.0, 1.0]);
    assert!(frame.depth_test);

    r.background(None).depth_test(false);
    r.render(&scene(), None).unwrap();
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    assert_eq!(frame.clear, [1.0, 1.0, 1.0, 1.0]);
    assert!(!frame.depth_test);
}

#[test]
fn clear_draws_nothing() {
    let mut r = renderer();
    r.clear().unwrap();
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    assert!(frame.commands.is_empty());
}

#[test]
fn gradient_sends_the_whole_rect_mark_to_the_overlay() {
    let scene = Scene::from_json(
        r#"{"marktype": "rect", "items": [
            {"x": 0, "y": 0, "width": 10, "height": 10, "fill": "red"},
            {"x": 20, "y": 0, "width": 10, "height": 10,
             "fill": {"id": "g", "stops": [{"offset": 0, "color": "red"}, {"offset": 1, "color": "blue"}]}}
        ]}"#,
    )
    .unwrap()
    .into_ref();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let ctx = r.context().unwrap();
    assert_eq!(ctx.overlay.len(), 2);
    let frame = ctx.backend.last_frame().unwrap();
    assert_eq!(frame.commands.len(), 1);
    assert!(matches!(frame.commands[0], DrawCommand::Image { .. }));
}

#[test]
fn group_clip_narrows_child_uniforms() {
    let scene = Scene::from_json(
        r#"{"marktype": "group", "items": [{
            "x": 20, "y": 10, "width": 50, "height": 40, "clip": true,
            "items": [{"marktype": "rect", "items": [
                {"x": 0, "y": 0, "width": 100, "height": 100, "fill": "red"}
            ]}]
        }]}"#,
    )
    .unwrap()
    .into_ref();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let frame = r.context().unwrap().backend.last_frame().unwrap();
    let clip = match &frame.commands[0] {
        DrawCommand::Rect { uniform, .. } => uniform.clip,
        other => panic!("expected rect batch, got {:?}", other),
    };
    assert_eq!(clip, Rectangle::new(20.0, 10.0, 50.0, 40.0).to_clip());
}

#[test_log::test]
fn released_buffers_are_rebuilt_on_the_next_frame() {
    let scene = scene();
    let mut r = renderer();
    r.render(&scene, None).unwrap();
    let old = buffers_of(&r);
    let live = r.context().unwrap().backend.stats().buffers_live;

    r.context_mut().unwrap().release_buffers();
    {
        let ctx = r.context().unwrap();
        assert_eq!(ctx.backend.stats().buffers_live, 0);
        assert!(ctx.geometry.values().all(|g| g.deleted));
        assert!(ctx.batches.is_empty());
    }

    r.frame().unwrap();
    let fresh = buffers_of(&r);
    assert_eq!(fresh.len(), old.len());
    assert!(fresh.iter().all(|key| !old.contains(key)));
    let ctx = r.context().unwrap();
    assert!(old.iter().all(|key| !ctx.backend.has_buffer(*key)));
    assert!(fresh.iter().all(|key| ctx.backend.has_buffer(*key)));
    assert_eq!(ctx.backend.stats().buffers_live, live);
    assert!(ctx.geometry.values().all(|g| !g.deleted));
    assert_eq!(ctx.stats.item_hits, 0);
    assert_eq!(ctx.stats.shape_hits, 0);
}
