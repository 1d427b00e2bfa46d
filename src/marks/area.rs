use super::draw_shape;
use crate::context::RenderContext;
use crate::geometry::GeomSlot;
use crate::scene::{Item, Mark, MarkType};
use std::fmt::Write;

fn defined_runs(items: &[Item]) -> Vec<&[Item]> {
    items
        .split(|item| item.defined == Some(false))
        .filter(|run| !run.is_empty())
        .collect()
}

/// Polyline through the items, broken where `defined` is false.
pub fn line_path(items: &[Item]) -> String {
    let mut out = String::new();
    for run in defined_runs(items) {
        for (i, item) in run.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            write!(out, "{}{},{}", cmd, item.x(), item.y()).ok();
        }
    }
    out
}

/// Closed band between the items' `y` and `y2` (or `x` and `x2` when the
/// first item is oriented horizontally).
pub fn area_path(items: &[Item]) -> String {
    let horizontal = items
        .first()
        .and_then(|i| i.orient.as_deref())
        .is_some_and(|o| o == "horizontal");
    let mut out = String::new();
    for run in defined_runs(items) {
        for (i, item) in run.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            write!(out, "{}{},{}", cmd, item.x(), item.y()).ok();
        }
        for item in run.iter().rev() {
            let (x, y) = if horizontal {
                (item.x2.unwrap_or(0.0), item.y())
            } else {
                (item.x(), item.y2.unwrap_or(0.0))
            };
            write!(out, "L{},{}", x, y).ok();
        }
        out.push('Z');
    }
    out
}

/// Nested marks: one shape for the whole mark, styled by its first item.
pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    let Some(style) = mark.items.first() else {
        return;
    };
    let path = match mark.marktype {
        MarkType::Area => area_path(&mark.items),
        _ => line_path(&mark.items),
    };
    if path.is_empty() {
        return;
    }
    let dirty = mark.items.iter().any(|i| ctx.is_dirty(i.id));
    let offset = ctx.offset();
    draw_shape(ctx, GeomSlot::Mark(mark.id), dirty, style, &path, offset);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> Item {
        let mut item = Item::at(x, y);
        item.y2 = Some(100.0);
        item
    }

    #[test]
    fn line_breaks_on_undefined() {
        let mut gap = point(2.0, 2.0);
        gap.defined = Some(false);
        let items = vec![point(0.0, 0.0), point(1.0, 1.0), gap, point(3.0, 3.0)];
        assert_eq!(line_path(&items), "M0,0L1,1M3,3");
    }

    #[test]
    fn area_closes_along_the_baseline() {
        let items = vec![point(0.0, 10.0), point(10.0, 20.0)];
        assert_eq!(area_path(&items), "M0,10L10,20L10,100L0,100Z");
    }
}
