use crate::color::ColorCache;
use crate::context::RenderContext;
use crate::geometry::path::PathGeometry;
use crate::gpu::BufferKey;
use crate::scene::{Item, ItemId, MarkId};
use lyon::math::point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, LineCap, LineJoin, StrokeOptions, StrokeTessellator, StrokeVertex,
    VertexBuffers,
};

/// CPU side of a mesh: xyz per vertex and rgba per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub triangles: Vec<f32>,
    pub colors: Vec<f32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 9
    }

    fn push_vertex(&mut self, x: f32, y: f32, z: f32, rgba: [f32; 4]) {
        self.triangles.extend_from_slice(&[x, y, z]);
        self.colors.extend_from_slice(&rgba);
    }
}

/// GPU buffers of one mesh drawn with the mesh program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemGeometry {
    pub triangle_buffer: BufferKey,
    pub color_buffer: BufferKey,
    pub num_triangles: u32,
    pub deleted: bool,
}

/// Owner of cached mesh geometry: a leaf item, or a nested mark drawn as
/// one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomSlot {
    Item(ItemId),
    Mark(MarkId),
}

fn line_cap(cap: Option<&str>) -> LineCap {
    match cap {
        Some("round") => LineCap::Round,
        Some("square") => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn stroke_line(line: &[[f32; 2]], closed: bool, options: &StrokeOptions) -> Vec<[f32; 2]> {
    let mut builder = Path::builder();
    builder.begin(point(line[0][0], line[0][1]));
    for p in &line[1..] {
        builder.line_to(point(p[0], p[1]));
    }
    builder.end(closed);
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let result = StrokeTessellator::new().tessellate_path(
        &path,
        options,
        &mut BuffersBuilder::new(&mut buffers, |v: StrokeVertex| v.position().to_array()),
    );
    if let Err(e) = result {
        log::warn!("stroke tessellation failed: {:?}", e);
        return Vec::new();
    }
    buffers
        .indices
        .iter()
        .map(|i| buffers.vertices[*i as usize])
        .collect()
}

/// Fill and stroke triangles for `item` drawn with `shape`.
///
/// Fill needs a non-transparent fill and positive fill alpha. Stroke needs a
/// positive width (default 1), a non-transparent stroke and positive stroke
/// alpha; it is extruded with a miter join limited to 1 and the item's cap
/// (default butt).
pub fn build_item_mesh(colors: &mut ColorCache, item: &Item, shape: &PathGeometry) -> MeshData {
    let mut mesh = MeshData::default();
    let fill_alpha = item.fill_alpha();
    let stroke_alpha = item.stroke_alpha();
    let width = item.stroke_width.unwrap_or(1.0);

    if fill_alpha > 0.0 {
        let [r, g, b] = colors.paint(item.fill.as_ref());
        let rgba = [r, g, b, fill_alpha];
        for v in shape.triangles.chunks_exact(3) {
            mesh.push_vertex(v[0], v[1], v[2], rgba);
        }
    }

    if width > 0.0 && stroke_alpha > 0.0 {
        let [r, g, b] = colors.paint(item.stroke.as_ref());
        let rgba = [r, g, b, stroke_alpha];
        let options = StrokeOptions::default()
            .with_line_width(width)
            .with_line_cap(line_cap(item.stroke_cap.as_deref()))
            .with_line_join(LineJoin::Miter)
            .with_miter_limit(1.0);
        for line in shape.lines.iter().filter(|l| l.len() >= 2) {
            for [x, y] in stroke_line(line, shape.closed, &options) {
                mesh.push_vertex(x, y, shape.z, rgba);
            }
        }
    }

    mesh
}

/// Builds and uploads the mesh of `item`, releasing whatever `slot` held
/// before.
pub fn geometry_for_item(
    ctx: &mut RenderContext,
    slot: GeomSlot,
    item: &Item,
    shape: &PathGeometry,
) -> ItemGeometry {
    let mesh = build_item_mesh(&mut ctx.colors, item, shape);
    let geometry = ItemGeometry {
        triangle_buffer: ctx
            .backend
            .create_buffer("triangles", bytemuck::cast_slice(&mesh.triangles)),
        color_buffer: ctx
            .backend
            .create_buffer("colors", bytemuck::cast_slice(&mesh.colors)),
        num_triangles: mesh.triangle_count() as u32,
        deleted: false,
    };
    if let Some(old) = ctx.geometry.insert(slot, geometry).filter(|g| !g.deleted) {
        ctx.backend.delete_buffer(old.triangle_buffer);
        ctx.backend.delete_buffer(old.color_buffer);
    }
    geometry
}
