use super::shape_batch;
use crate::context::RenderContext;
use crate::geometry::symbols::{shape_index, DEFAULT_SYMBOL_SIZE};
use crate::gpu::DrawCommand;
use crate::scene::{Item, Mark};
use crate::utils::SymbolVertex;

const SQRT_3: f32 = 1.732_050_8;

/// Equilateral triangle around the symbol centre; the shader scales it to
/// cover the shape.
pub const SYMBOL_UNIT: [[f32; 2]; 3] = [[0.0, -2.0], [-SQRT_3, 1.0], [SQRT_3, 1.0]];

pub fn symbol_vertex(ctx: &mut RenderContext, item: &Item, offset: [f32; 2]) -> SymbolVertex {
    SymbolVertex {
        pos: [item.x() + offset[0], item.y() + offset[1], 0.0],
        fill_color: ctx.colors.paint(item.fill.as_ref()),
        stroke_color: ctx.colors.paint(item.stroke.as_ref()),
        fill_opacity: item.fill_alpha(),
        stroke_width: item.shader_stroke_width(),
        size: item.size.unwrap_or(DEFAULT_SYMBOL_SIZE),
        shape: shape_index(item.shape.as_deref()),
        stroke_opacity: item.stroke_alpha(),
    }
}

pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    if mark.items.is_empty() {
        return;
    }
    if mark.items.iter().any(Item::has_gradient) {
        ctx.free_batch(mark.id);
        for item in &mark.items {
            ctx.overlay.symbol(item);
        }
        return;
    }

    let offset = ctx.offset();
    let batch = shape_batch(ctx, mark, offset, &SYMBOL_UNIT, |ctx| {
        let mut vertices = Vec::with_capacity(mark.items.len() * SYMBOL_UNIT.len());
        for item in &mark.items {
            let v = symbol_vertex(ctx, item, offset);
            vertices.extend(std::iter::repeat(v).take(SYMBOL_UNIT.len()));
        }
        bytemuck::cast_slice(&vertices).to_vec()
    });
    let uniform = ctx.uniform([0.0, 0.0]);
    ctx.queue.push(DrawCommand::Symbol {
        unit: batch.unit,
        attributes: batch.attributes,
        vertex_count: (batch.count * SYMBOL_UNIT.len()) as u32,
        uniform,
    });
}
