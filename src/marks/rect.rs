use super::shape_batch;
use crate::context::RenderContext;
use crate::gpu::DrawCommand;
use crate::scene::{Item, Mark};
use crate::utils::RectVertex;

/// Two triangles covering the unit square, corner (0, 0) first at index 4.
pub const RECT_UNIT: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [1.0, 1.0],
    [1.0, 0.0],
    [1.0, 0.0],
    [0.0, 0.0],
    [0.0, 1.0],
];

pub fn rect_vertex(ctx: &mut RenderContext, item: &Item, offset: [f32; 2]) -> RectVertex {
    RectVertex {
        pos: [item.x() + offset[0], item.y() + offset[1], 0.0],
        size: [item.width(), item.height()],
        fill_color: ctx.colors.paint(item.fill.as_ref()),
        stroke_color: ctx.colors.paint(item.stroke.as_ref()),
        fill_opacity: item.fill_alpha(),
        stroke_width: item.shader_stroke_width(),
        stroke_opacity: item.stroke_alpha(),
        corner_radius: item.corner_radius.unwrap_or(0.0),
    }
}

/// All items of the mark in one draw. A gradient anywhere in the mark
/// sends every item to the overlay instead.
pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    if mark.items.iter().any(Item::has_gradient) {
        ctx.free_batch(mark.id);
        for item in &mark.items {
            ctx.overlay.rect(item);
        }
        return;
    }

    let offset = ctx.offset();
    let batch = shape_batch(ctx, mark, offset, &RECT_UNIT, |ctx| {
        let mut vertices = Vec::with_capacity(mark.items.len() * RECT_UNIT.len());
        for item in &mark.items {
            let v = rect_vertex(ctx, item, offset);
            vertices.extend(std::iter::repeat(v).take(RECT_UNIT.len()));
        }
        bytemuck::cast_slice(&vertices).to_vec()
    });
    if batch.count == 0 {
        return;
    }
    let uniform = ctx.uniform([0.0, 0.0]);
    ctx.queue.push(DrawCommand::Rect {
        unit: batch.unit,
        attributes: batch.attributes,
        vertex_count: (batch.count * RECT_UNIT.len()) as u32,
        uniform,
    });
}
