use anyhow::Context;
use image::{ImageReader, RgbaImage};
use plutonium_painter::traits::SceneRenderer;
use plutonium_painter::{Canvas, FileLoader, PainterRenderer, RendererConfig, Scene};
use std::fs;
use std::path::Path;
use std::rc::Rc;

const SCATTER: &str = r##"{
    "marktype": "group",
    "items": [{
        "x": 20, "y": 20, "width": 260, "height": 160, "clip": true,
        "fill": "#f4f4f4", "stroke": "#999",
        "items": [
            {"marktype": "rule", "items": [
                {"x": 0, "y": 160, "x2": 260, "y2": 160, "stroke": "black"}
            ]},
            {"marktype": "symbol", "items": [
                {"x": 40, "y": 120, "size": 100, "shape": "circle", "fill": "steelblue"},
                {"x": 90, "y": 60, "size": 100, "shape": "square", "fill": "orange", "stroke": "black"},
                {"x": 140, "y": 90, "size": 150, "shape": "diamond", "fill": "seagreen"},
                {"x": 200, "y": 30, "size": 120, "shape": "triangle-up", "fill": "crimson"}
            ]},
            {"marktype": "text", "items": [
                {"x": 130, "y": 150, "text": "scatter", "fill": "black", "fontSize": 12, "align": "center"}
            ]}
        ]
    }]
}"##;

const BARS: &str = r##"{
    "marktype": "group",
    "items": [{
        "x": 0, "y": 0, "width": 300, "height": 200,
        "items": [
            {"marktype": "rect", "items": [
                {"x": 20, "y": 120, "width": 40, "height": 60, "fill": "steelblue"},
                {"x": 80, "y": 60, "width": 40, "height": 120, "fill": "steelblue"},
                {"x": 140, "y": 90, "width": 40, "height": 90, "fill": "steelblue", "stroke": "navy", "strokeWidth": 2}
            ]},
            {"marktype": "area", "items": [
                {"x": 200, "y": 150, "y2": 180, "fill": "#ccc"},
                {"x": 240, "y": 100, "y2": 180},
                {"x": 280, "y": 130, "y2": 180}
            ]},
            {"marktype": "path", "items": [
                {"x": 200, "y": 20, "path": "M0,0L40,0L20,30Z", "fill": "purple"}
            ]}
        ]
    }]
}"##;

fn compare_with_tolerance(a_path: &Path, b_path: &Path, tolerance: u8) -> anyhow::Result<bool> {
    let a = ImageReader::open(a_path)?.decode()?.to_rgba8();
    let b = ImageReader::open(b_path)?.decode()?.to_rgba8();

    if a.dimensions() != b.dimensions() {
        return Ok(false);
    }
    Ok(a.pixels().zip(b.pixels()).all(|(pa, pb)| {
        let da = pa.0;
        let db = pb.0;
        (0..4).all(|i| da[i].abs_diff(db[i]) <= tolerance)
    }))
}

fn render(json: &str, config: &RendererConfig) -> anyhow::Result<RgbaImage> {
    let scene = Scene::from_json(json)?.into_ref();
    let mut renderer =
        PainterRenderer::new(Rc::new(FileLoader::new("."))).with_config(config.clone());
    renderer.initialize(Canvas::detached(), 300.0, 200.0, [0.0, 0.0])?;
    Ok(renderer.to_image(&scene)?)
}

fn snapshot(name: &str, json: &str, config: &RendererConfig) -> anyhow::Result<bool> {
    let image = render(json, config).with_context(|| format!("rendering {}", name))?;

    fs::create_dir_all("snapshots/actual")?;
    fs::create_dir_all("snapshots/golden")?;
    let out_actual = Path::new("snapshots/actual").join(format!("{}.png", name));
    let out_golden = Path::new("snapshots/golden").join(format!("{}.png", name));
    image.save(&out_actual)?;

    if !out_golden.exists() {
        fs::copy(&out_actual, &out_golden)?;
        println!("golden created at {}", out_golden.display());
        return Ok(true);
    }

    let ok = compare_with_tolerance(&out_actual, &out_golden, 3)?;
    if ok {
        println!("snapshot OK for {}.png", name);
    } else {
        println!("snapshot mismatch for {}.png", name);
    }
    Ok(ok)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => RendererConfig::load(&path)?,
        None => RendererConfig::default(),
    };

    let mut failures = 0;
    for (name, json) in [("scatter", SCATTER), ("bars", BARS)] {
        if !snapshot(name, json, &config)? {
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{} snapshot(s) differ from their goldens", failures);
    }
    Ok(())
}
