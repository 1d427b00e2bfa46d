//! The 2D layer drawn over the GL marks: text, and rects or symbols whose
//! paint is a gradient. Each frame is collected as one SVG document and
//! rasterised with resvg at physical resolution.

use crate::error::{PainterError, Result};
use crate::geometry::symbols::{symbol_path, DEFAULT_SYMBOL_SIZE};
use crate::scene::{Gradient, Item, Paint};
use crate::utils::Rectangle;
use resvg::usvg::{fontdb, Options, Tree};
use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;
use tiny_skia::{Color, Pixmap, Transform};
use winit::dpi::PhysicalSize;

const DEFAULT_FONT: &str = "sans-serif";
const DEFAULT_FONT_SIZE: f32 = 11.0;

pub struct Overlay {
    size: PhysicalSize<u32>,
    ratio: f64,
    origin: [f32; 2],
    defs: String,
    body: String,
    gradients: HashSet<String>,
    open_groups: usize,
    clip_ids: usize,
    elements: usize,
    has_text: bool,
    fontdb: Option<Arc<fontdb::Database>>,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn text_anchor(align: Option<&str>) -> &'static str {
    match align {
        Some("center") => "middle",
        Some("right") => "end",
        _ => "start",
    }
}

fn dominant_baseline(baseline: Option<&str>) -> &'static str {
    match baseline {
        Some("top") => "hanging",
        Some("middle") => "central",
        Some("bottom") => "text-after-edge",
        _ => "alphabetic",
    }
}

impl Overlay {
    pub fn new(size: PhysicalSize<u32>, ratio: f64) -> Self {
        Self {
            size,
            ratio,
            origin: [0.0, 0.0],
            defs: String::new(),
            body: String::new(),
            gradients: HashSet::new(),
            open_groups: 0,
            clip_ids: 0,
            elements: 0,
            has_text: false,
            fontdb: None,
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>, ratio: f64, origin: [f32; 2]) {
        self.size = size;
        self.ratio = ratio;
        self.origin = origin;
        self.clear();
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn clear(&mut self) {
        self.defs.clear();
        self.body.clear();
        self.gradients.clear();
        self.open_groups = 0;
        self.clip_ids = 0;
        self.elements = 0;
        self.has_text = false;
    }

    /// Number of drawn elements this frame.
    pub fn len(&self) -> usize {
        self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Mirrors a group: translate by `(tx, ty)`, clip to `clip` in the
    /// group's own coordinates.
    pub fn push_group(&mut self, tx: f32, ty: f32, clip: Option<Rectangle>) {
        write!(self.body, r#"<g transform="translate({},{})""#, tx, ty).ok();
        if let Some(rect) = clip {
            self.clip_ids += 1;
            let id = format!("clip{}", self.clip_ids);
            write!(
                self.defs,
                r#"<clipPath id="{}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath>"#,
                id, rect.x, rect.y, rect.width, rect.height
            )
            .ok();
            write!(self.body, r#" clip-path="url(#{})""#, id).ok();
        }
        self.body.push('>');
        self.open_groups += 1;
    }

    pub fn pop_group(&mut self) {
        if self.open_groups > 0 {
            self.body.push_str("</g>");
            self.open_groups -= 1;
        }
    }

    fn gradient_def(&mut self, gradient: &Gradient) {
        if !self.gradients.insert(gradient.id.clone()) {
            return;
        }
        write!(
            self.defs,
            r#"<linearGradient id="{}" x1="{}" y1="{}" x2="{}" y2="{}">"#,
            escape(&gradient.id),
            gradient.x1,
            gradient.y1,
            gradient.x2,
            gradient.y2
        )
        .ok();
        for stop in &gradient.stops {
            write!(
                self.defs,
                r#"<stop offset="{}" stop-color="{}"/>"#,
                stop.offset,
                escape(&stop.color)
            )
            .ok();
        }
        self.defs.push_str("</linearGradient>");
    }

    fn paint_attr(&mut self, paint: Option<&Paint>) -> String {
        match paint {
            None => "none".to_string(),
            Some(Paint::Color(css)) => escape(css),
            Some(Paint::Gradient(g)) => {
                self.gradient_def(g);
                format!("url(#{})", escape(&g.id))
            }
        }
    }

    fn paint_attrs(&mut self, item: &Item) -> String {
        let fill = self.paint_attr(item.fill.as_ref());
        let stroke = self.paint_attr(item.stroke.as_ref());
        let mut attrs = format!(
            r#"fill="{}" stroke="{}" opacity="{}""#,
            fill,
            stroke,
            item.opacity()
        );
        if let Some(o) = item.fill_opacity {
            write!(attrs, r#" fill-opacity="{}""#, o).ok();
        }
        if let Some(o) = item.stroke_opacity {
            write!(attrs, r#" stroke-opacity="{}""#, o).ok();
        }
        write!(attrs, r#" stroke-width="{}""#, item.stroke_width.unwrap_or(1.0)).ok();
        if let Some(cap) = &item.stroke_cap {
            write!(attrs, r#" stroke-linecap="{}""#, escape(cap)).ok();
        }
        attrs
    }

    pub fn rect(&mut self, item: &Item) {
        let attrs = self.paint_attrs(item);
        write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}" {}/>"#,
            item.x(),
            item.y(),
            item.width(),
            item.height(),
            item.corner_radius.unwrap_or(0.0),
            attrs
        )
        .ok();
        self.elements += 1;
    }

    pub fn symbol(&mut self, item: &Item) {
        let attrs = self.paint_attrs(item);
        let d = symbol_path(item.shape.as_deref(), item.size.unwrap_or(DEFAULT_SYMBOL_SIZE));
        write!(
            self.body,
            r#"<path transform="translate({},{})" d="{}" {}/>"#,
            item.x(),
            item.y(),
            d,
            attrs
        )
        .ok();
        self.elements += 1;
    }

    /// Text needs a fill; items without one draw nothing.
    pub fn text(&mut self, item: &Item) {
        let Some(content) = item.text_content() else {
            return;
        };
        if item.fill.is_none() || item.opacity() <= 0.0 {
            return;
        }
        let fill = self.paint_attr(item.fill.as_ref());
        let size = item.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let mut attrs = format!(
            r#"font-family="{}" font-size="{}" fill="{}" opacity="{}" text-anchor="{}" dominant-baseline="{}""#,
            escape(item.font.as_deref().unwrap_or(DEFAULT_FONT)),
            size,
            fill,
            item.opacity(),
            text_anchor(item.align.as_deref()),
            dominant_baseline(item.baseline.as_deref()),
        );
        if let Some(o) = item.fill_opacity {
            write!(attrs, r#" fill-opacity="{}""#, o).ok();
        }
        if let Some(weight) = &item.font_weight {
            let weight = match weight {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            write!(attrs, r#" font-weight="{}""#, escape(&weight)).ok();
        }

        let mut transform = format!("translate({},{})", item.x(), item.y());
        if let Some(angle) = item.angle.filter(|a| *a != 0.0) {
            write!(transform, " rotate({})", angle).ok();
        }

        write!(self.body, r#"<text transform="{}" {}>"#, transform, attrs).ok();
        for (i, line) in content.split('\n').enumerate() {
            let dy = if i == 0 { 0.0 } else { size };
            write!(
                self.body,
                r#"<tspan x="0" dy="{}">{}</tspan>"#,
                dy,
                escape(line)
            )
            .ok();
        }
        self.body.push_str("</text>");
        self.elements += 1;
        self.has_text = true;
    }

    /// The frame's SVG document.
    pub fn document(&self) -> String {
        let logical_w = self.size.width as f64 / self.ratio;
        let logical_h = self.size.height as f64 / self.ratio;
        let mut body = self.body.clone();
        for _ in 0..self.open_groups {
            body.push_str("</g>");
        }
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}"><defs>{}</defs><g transform="translate({},{})">{}</g></svg>"#,
            self.size.width,
            self.size.height,
            logical_w,
            logical_h,
            self.defs,
            self.origin[0],
            self.origin[1],
            body
        )
    }

    fn fonts(&mut self) -> Arc<fontdb::Database> {
        self.fontdb
            .get_or_insert_with(|| {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                log::debug!("overlay loaded {} font faces", db.len());
                Arc::new(db)
            })
            .clone()
    }

    /// Rasterises the frame into a premultiplied pixmap of physical size.
    pub fn rasterize(&mut self) -> Result<Pixmap> {
        let mut pixmap = Pixmap::new(self.size.width.max(1), self.size.height.max(1))
            .ok_or_else(|| PainterError::Image("cannot allocate overlay pixmap".to_string()))?;
        pixmap.fill(Color::TRANSPARENT);
        if self.is_empty() {
            return Ok(pixmap);
        }

        let mut opt = Options::default();
        if self.has_text {
            opt.fontdb = self.fonts();
        }
        let svg = self.document();
        let tree = Tree::from_str(&svg, &opt)
            .map_err(|e| PainterError::Image(format!("overlay: {}", e)))?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        Ok(pixmap)
    }
}
