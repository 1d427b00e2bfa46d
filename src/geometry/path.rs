use crate::context::RenderContext;
use crate::geometry::simplify::simplify;
use lyon::math::point;
use lyon::path::iterator::PathIterator;
use lyon::path::{Path, PathEvent};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use std::collections::HashMap;
use std::rc::Rc;
use svgtypes::{SimplePathSegment, SimplifyingPathParser};

/// Curve flattening tolerance in logical pixels.
const FLATTEN_TOLERANCE: f32 = 0.25;

/// Triangulated form of one SVG path string, shared between every item
/// drawing that exact string.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    /// Simplified polylines, one per subpath.
    pub lines: Vec<Vec<[f32; 2]>>,
    /// xyz triples, three vertices per triangle.
    pub triangles: Vec<f32>,
    pub closed: bool,
    pub z: f32,
    pub key: String,
}

impl PathGeometry {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 9
    }
}

/// Path strings to geometry. Cleared wholesale once it reaches its limit.
#[derive(Debug)]
pub struct PathCache {
    map: HashMap<String, Rc<PathGeometry>>,
    limit: usize,
}

impl PathCache {
    pub fn new(limit: usize) -> Self {
        Self {
            map: HashMap::new(),
            limit: limit.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<Rc<PathGeometry>> {
        self.map.get(key).cloned()
    }

    pub fn insert(&mut self, geometry: Rc<PathGeometry>) {
        if self.map.len() >= self.limit {
            log::debug!("path cache full ({} entries), clearing", self.map.len());
            self.map.clear();
        }
        self.map.insert(geometry.key.clone(), geometry);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

fn to_lyon(text: &str) -> Result<Path, svgtypes::Error> {
    let mut builder = Path::builder();
    let mut open = false;
    let mut start = point(0.0, 0.0);
    let mut current = start;

    for segment in SimplifyingPathParser::from(text) {
        let segment = segment?;
        if let SimplePathSegment::MoveTo { x, y } = segment {
            if open {
                builder.end(false);
            }
            start = point(x as f32, y as f32);
            current = start;
            builder.begin(start);
            open = true;
            continue;
        }
        if let SimplePathSegment::ClosePath = segment {
            if open {
                builder.end(true);
                open = false;
            }
            current = start;
            continue;
        }
        if !open {
            builder.begin(current);
            start = current;
            open = true;
        }
        match segment {
            SimplePathSegment::LineTo { x, y } => {
                current = point(x as f32, y as f32);
                builder.line_to(current);
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                current = point(x as f32, y as f32);
                builder.quadratic_bezier_to(point(x1 as f32, y1 as f32), current);
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                current = point(x as f32, y as f32);
                builder.cubic_bezier_to(
                    point(x1 as f32, y1 as f32),
                    point(x2 as f32, y2 as f32),
                    current,
                );
            }
            SimplePathSegment::MoveTo { .. } | SimplePathSegment::ClosePath => {}
        }
    }
    if open {
        builder.end(false);
    }
    Ok(builder.build())
}

/// Flattened subpaths of an SVG path string, each with its closed flag.
/// Unparseable input yields the subpaths read before the error.
pub fn contours(text: &str) -> Vec<(Vec<[f32; 2]>, bool)> {
    let path = match to_lyon(text) {
        Ok(path) => path,
        Err(e) => {
            log::warn!("cannot parse path {:?}: {}", text, e);
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    let mut current: Vec<[f32; 2]> = Vec::new();
    for event in path.iter().flattened(FLATTEN_TOLERANCE) {
        match event {
            PathEvent::Begin { at } => {
                current = vec![at.to_array()];
            }
            PathEvent::Line { to, .. } => current.push(to.to_array()),
            PathEvent::End { close, .. } => {
                out.push((std::mem::take(&mut current), close));
            }
            PathEvent::Quadratic { .. } | PathEvent::Cubic { .. } => {}
        }
    }
    out
}

fn triangulate(lines: &[Vec<[f32; 2]>], z: f32) -> Result<Vec<f32>, String> {
    let mut builder = Path::builder();
    let mut any = false;
    for line in lines.iter().filter(|l| l.len() >= 3) {
        builder.begin(point(line[0][0], line[0][1]));
        for p in &line[1..] {
            builder.line_to(point(p[0], p[1]));
        }
        builder.end(true);
        any = true;
    }
    if !any {
        return Ok(Vec::new());
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::EvenOdd),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| format!("{:?}", e))?;

    let mut triangles = Vec::with_capacity(buffers.indices.len() * 3);
    for index in &buffers.indices {
        let [x, y] = buffers.vertices[*index as usize];
        triangles.extend_from_slice(&[x, y, z]);
    }
    Ok(triangles)
}

/// Parses, simplifies and triangulates `text`. Never fails: a path that
/// cannot be triangulated keeps its lines and gets no triangles.
pub fn build_path_geometry(text: &str, threshold: f32, z: f32) -> PathGeometry {
    let lines: Vec<Vec<[f32; 2]>> = contours(text)
        .into_iter()
        .map(|(line, _)| simplify(&line, threshold))
        .collect();

    let triangles = match triangulate(&lines, z) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("triangulation failed for path {:?}: {}", text, e);
            Vec::new()
        }
    };

    PathGeometry {
        lines,
        triangles,
        closed: text.trim_end().ends_with(['Z', 'z']),
        z,
        key: text.to_string(),
    }
}

/// Cached [`build_path_geometry`]. Equal strings share one geometry.
pub fn geometry_for_path(ctx: &mut RenderContext, text: &str, threshold: f32) -> Rc<PathGeometry> {
    if let Some(hit) = ctx.path_cache.get(text) {
        ctx.stats.path_hits += 1;
        return hit;
    }
    ctx.stats.path_misses += 1;
    let z = ctx.next_z();
    let geometry = Rc::new(build_path_geometry(text, threshold, z));
    ctx.path_cache.insert(geometry.clone());
    geometry
}
