//! Per-marktype drawers. Each appends draw commands to the context queue
//! (or elements to the overlay) for one mark of the scene.

pub mod area;
pub mod group;
pub mod image;
pub mod path;
pub mod rect;
pub mod rule;
pub mod symbol;
pub mod text;

use crate::context::{RenderContext, ShapeBatch};
use crate::error::Result;
use crate::geometry::{geometry_for_item, geometry_for_path, GeomSlot};
use crate::gpu::DrawCommand;
use crate::loader::ResourceLoader;
use crate::scene::{Item, Mark, MarkType};

pub fn draw_mark(ctx: &mut RenderContext, mark: &Mark, loader: &dyn ResourceLoader) -> Result<()> {
    match mark.marktype {
        MarkType::Rect => rect::draw(ctx, mark),
        MarkType::Symbol => symbol::draw(ctx, mark),
        MarkType::Path => path::draw(ctx, mark),
        MarkType::Rule => rule::draw(ctx, mark),
        MarkType::Area | MarkType::Line => area::draw(ctx, mark),
        MarkType::Group => group::draw(ctx, mark, loader)?,
        MarkType::Text => text::draw(ctx, mark),
        MarkType::Image => image::draw(ctx, mark, loader)?,
        MarkType::Unsupported => {}
    }
    Ok(())
}

/// Cached geometry is reused unless this is a full redraw, the owner is
/// dirty, nothing is cached, or the cached buffers were released.
pub fn needs_rebuild(ctx: &RenderContext, slot: GeomSlot, dirty: bool) -> bool {
    ctx.full_redraw || dirty || ctx.geometry.get(&slot).map_or(true, |g| g.deleted)
}

/// Queues the mesh of `path` styled by `style`, rebuilding it when needed.
/// `offset` moves path coordinates into canvas coordinates.
pub(crate) fn draw_shape(
    ctx: &mut RenderContext,
    slot: GeomSlot,
    dirty: bool,
    style: &Item,
    path: &str,
    offset: [f32; 2],
) {
    let cached = if needs_rebuild(ctx, slot, dirty) {
        None
    } else {
        ctx.geometry.get(&slot).copied()
    };
    let geometry = match cached {
        Some(geometry) => {
            ctx.stats.item_hits += 1;
            geometry
        }
        None => {
            ctx.stats.item_misses += 1;
            let threshold = ctx.simplify_threshold;
            let shape = geometry_for_path(ctx, path, threshold);
            geometry_for_item(ctx, slot, style, &shape)
        }
    };
    if geometry.num_triangles == 0 {
        return;
    }
    let uniform = ctx.uniform(offset);
    ctx.queue.push(DrawCommand::Mesh {
        triangles: geometry.triangle_buffer,
        colors: geometry.color_buffer,
        vertex_count: geometry.num_triangles * 3,
        uniform,
    });
}

/// Returns the mark's rect or symbol batch. Buffers are kept when nothing
/// in the mark changed since they were built; otherwise the attributes are
/// rebuilt with `attributes`, and the unit buffer survives if the item
/// count did not change.
pub(crate) fn shape_batch<F>(
    ctx: &mut RenderContext,
    mark: &Mark,
    offset: [f32; 2],
    unit: &[[f32; 2]],
    attributes: F,
) -> ShapeBatch
where
    F: FnOnce(&mut RenderContext) -> Vec<u8>,
{
    let count = mark.items.len();
    let dirty = mark.items.iter().any(|i| ctx.is_dirty(i.id));
    if let Some(batch) = ctx.batches.get(&mark.id).copied() {
        if !ctx.full_redraw && !dirty && batch.count == count && batch.offset == offset {
            ctx.stats.shape_hits += 1;
            return batch;
        }
    }
    ctx.stats.shape_misses += 1;

    let previous = ctx.batches.remove(&mark.id);
    let unit_buffer = match previous {
        Some(old) if old.count == count => old.unit,
        other => {
            if let Some(old) = other {
                ctx.backend.delete_buffer(old.unit);
            }
            let data: Vec<[f32; 2]> = unit
                .iter()
                .copied()
                .cycle()
                .take(unit.len() * count)
                .collect();
            ctx.backend.create_buffer("unit", bytemuck::cast_slice(&data))
        }
    };
    if let Some(old) = previous {
        ctx.backend.delete_buffer(old.attributes);
    }
    let data = attributes(ctx);
    let batch = ShapeBatch {
        unit: unit_buffer,
        attributes: ctx.backend.create_buffer("attributes", &data),
        count,
        offset,
    };
    ctx.batches.insert(mark.id, batch);
    batch
}
