use super::draw_shape;
use crate::context::RenderContext;
use crate::geometry::GeomSlot;
use crate::scene::{Item, Mark};

/// Segment from the item's origin to its `x2`/`y2`, in item coordinates.
pub fn rule_path(item: &Item) -> String {
    let dx = item.x2.unwrap_or(item.x()) - item.x();
    let dy = item.y2.unwrap_or(item.y()) - item.y();
    format!("M0,0L{},{}", dx, dy)
}

pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    let [ox, oy] = ctx.offset();
    for item in &mark.items {
        let dirty = ctx.is_dirty(item.id);
        let path = rule_path(item);
        draw_shape(
            ctx,
            GeomSlot::Item(item.id),
            dirty,
            item,
            &path,
            [ox + item.x(), oy + item.y()],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_end_collapses_to_the_start() {
        let mut item = Item::at(5.0, 5.0);
        assert_eq!(rule_path(&item), "M0,0L0,0");
        item.x2 = Some(15.0);
        item.y2 = Some(2.0);
        assert_eq!(rule_path(&item), "M0,0L10,-3");
    }
}
