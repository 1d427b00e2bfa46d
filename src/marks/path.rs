use super::draw_shape;
use crate::context::RenderContext;
use crate::geometry::GeomSlot;
use crate::scene::Mark;

/// One mesh per item, placed at the item's `x`/`y`.
pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    let [ox, oy] = ctx.offset();
    for item in &mark.items {
        let Some(path) = item.path.as_deref() else {
            continue;
        };
        let dirty = ctx.is_dirty(item.id);
        draw_shape(
            ctx,
            GeomSlot::Item(item.id),
            dirty,
            item,
            path,
            [ox + item.x(), oy + item.y()],
        );
    }
}
