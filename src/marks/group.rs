use super::{draw_mark, draw_shape};
use crate::context::RenderContext;
use crate::error::Result;
use crate::geometry::GeomSlot;
use crate::loader::ResourceLoader;
use crate::scene::{Item, Mark};
use crate::utils::Rectangle;

fn background_path(item: &Item) -> String {
    let (w, h) = (item.width(), item.height());
    format!("M0,0L{w},0L{w},{h}L0,{h}Z", w = w, h = h)
}

fn has_background(item: &Item) -> bool {
    item.fill_alpha() > 0.0 || item.stroke_alpha() > 0.0
}

/// Draws each group item's background, then its child marks translated by
/// the item's position and clipped to its box when `clip` is set.
pub fn draw(ctx: &mut RenderContext, mark: &Mark, loader: &dyn ResourceLoader) -> Result<()> {
    for item in &mark.items {
        let (x, y) = (item.x(), item.y());

        if item.has_gradient() {
            ctx.overlay.rect(item);
        } else if has_background(item) {
            let [ox, oy] = ctx.offset();
            let dirty = ctx.is_dirty(item.id);
            let path = background_path(item);
            draw_shape(ctx, GeomSlot::Item(item.id), dirty, item, &path, [ox + x, oy + y]);
        }

        ctx.tx += x;
        ctx.ty += y;
        let local = Rectangle::new(0.0, 0.0, item.width(), item.height());
        if item.clip {
            let [ox, oy] = ctx.offset();
            ctx.push_clip(local.translate(ox, oy));
        }
        ctx.overlay.push_group(x, y, item.clip.then_some(local));

        let mut result = Ok(());
        for child in &item.items {
            result = draw_mark(ctx, child, loader);
            if result.is_err() {
                break;
            }
        }

        ctx.overlay.pop_group();
        if item.clip {
            ctx.pop_clip();
        }
        ctx.tx -= x;
        ctx.ty -= y;
        result?;
    }
    Ok(())
}
