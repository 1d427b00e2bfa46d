//! Hit testing and bounds over the scenegraph. Every query walks the scene;
//! there is no spatial index.

use crate::geometry::contours;
use crate::geometry::symbols::{symbol_path, DEFAULT_SYMBOL_SIZE};
use crate::marks::area::{area_path, line_path};
use crate::marks::rule::rule_path;
use crate::scene::{Item, ItemId, Mark, MarkType, Scene};
use crate::utils::{Position, Rectangle};

type Contour = (Vec<[f32; 2]>, bool);

fn point_in_contours(contours: &[Contour], x: f32, y: f32) -> bool {
    let mut inside = false;
    for (points, _) in contours {
        let n = points.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = points[i];
            let [xj, yj] = points[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

fn segment_distance(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt()
}

fn near_contours(contours: &[Contour], x: f32, y: f32, tolerance: f32) -> bool {
    contours.iter().any(|(points, closed)| {
        let mut segments: Vec<([f32; 2], [f32; 2])> =
            points.windows(2).map(|w| (w[0], w[1])).collect();
        if *closed && points.len() > 2 {
            segments.push((points[points.len() - 1], points[0]));
        }
        if points.len() == 1 {
            segments.push((points[0], points[0]));
        }
        segments
            .iter()
            .any(|(a, b)| segment_distance([x, y], *a, *b) <= tolerance)
    })
}

fn stroke_tolerance(item: &Item) -> f32 {
    (item.shader_stroke_width() / 2.0).max(1.0)
}

/// Fill-or-stroke test of an outline given in item-local coordinates.
fn hit_outline(item: &Item, outline: &str, x: f32, y: f32) -> bool {
    let shape = contours(outline);
    (item.fill_alpha() > 0.0 && point_in_contours(&shape, x, y))
        || (item.stroke_alpha() > 0.0 && near_contours(&shape, x, y, stroke_tolerance(item)))
}

/// Rough text extent: 0.6 em per character, one line height per line.
fn text_bounds(item: &Item) -> Rectangle {
    let size = item.font_size.unwrap_or(11.0);
    let text = item.text_content().unwrap_or_default();
    let lines: Vec<&str> = text.split('\n').collect();
    let chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = chars as f32 * size * 0.6;
    let height = size * lines.len() as f32;
    let x = match item.align.as_deref() {
        Some("center") => item.x() - width / 2.0,
        Some("right") => item.x() - width,
        _ => item.x(),
    };
    let y = match item.baseline.as_deref() {
        Some("top") => item.y(),
        Some("middle") => item.y() - height / 2.0,
        Some("bottom") => item.y() - height,
        _ => item.y() - size * 0.8,
    };
    Rectangle::new(x, y, width, height)
}

fn outline_bounds(outline: &str, dx: f32, dy: f32, pad: f32) -> Option<Rectangle> {
    let shape = contours(outline);
    let mut points = shape.iter().flat_map(|(p, _)| p.iter());
    let first = points.next()?;
    let mut b = Rectangle::new(first[0], first[1], 0.0, 0.0);
    for p in points {
        b = b.union(&Rectangle::new(p[0], p[1], 0.0, 0.0));
    }
    Some(Rectangle::new(
        b.x + dx - pad,
        b.y + dy - pad,
        b.width + 2.0 * pad,
        b.height + 2.0 * pad,
    ))
}

/// Bounds of one item in its group's coordinates.
pub fn item_bounds(marktype: MarkType, item: &Item) -> Rectangle {
    let pad = item.shader_stroke_width() / 2.0;
    let point = Rectangle::new(item.x(), item.y(), 0.0, 0.0);
    match marktype {
        MarkType::Rect | MarkType::Group | MarkType::Image => {
            Rectangle::from_corners(item.x(), item.y(), item.x() + item.width(), item.y() + item.height())
        }
        MarkType::Symbol => {
            let outline = symbol_path(item.shape.as_deref(), item.size.unwrap_or(DEFAULT_SYMBOL_SIZE));
            outline_bounds(&outline, item.x(), item.y(), pad).unwrap_or(point)
        }
        MarkType::Path => item
            .path
            .as_deref()
            .and_then(|p| outline_bounds(p, item.x(), item.y(), pad))
            .unwrap_or(point),
        MarkType::Rule => outline_bounds(&rule_path(item), item.x(), item.y(), pad).unwrap_or(point),
        MarkType::Area => {
            let base = if item.orient.as_deref() == Some("horizontal") {
                Rectangle::new(item.x2.unwrap_or(0.0), item.y(), 0.0, 0.0)
            } else {
                Rectangle::new(item.x(), item.y2.unwrap_or(0.0), 0.0, 0.0)
            };
            point.union(&base)
        }
        MarkType::Text => text_bounds(item),
        MarkType::Line | MarkType::Unsupported => point,
    }
}

/// Union of the item bounds of `mark`, in its group's coordinates.
pub fn mark_bounds(mark: &Mark) -> Option<Rectangle> {
    mark.items
        .iter()
        .map(|item| item_bounds(mark.marktype, item))
        .reduce(|a, b| a.union(&b))
}

fn hit_item(marktype: MarkType, item: &Item, x: f32, y: f32) -> bool {
    match marktype {
        MarkType::Rect | MarkType::Image => item_bounds(marktype, item).contains(Position::new(x, y)),
        MarkType::Group => {
            (item.fill_alpha() > 0.0 || item.stroke_alpha() > 0.0)
                && item_bounds(marktype, item).contains(Position::new(x, y))
        }
        MarkType::Symbol => {
            let outline = symbol_path(item.shape.as_deref(), item.size.unwrap_or(DEFAULT_SYMBOL_SIZE));
            hit_outline(item, &outline, x - item.x(), y - item.y())
        }
        MarkType::Path => item
            .path
            .as_deref()
            .is_some_and(|p| hit_outline(item, p, x - item.x(), y - item.y())),
        MarkType::Rule => {
            let shape = contours(&rule_path(item));
            near_contours(&shape, x - item.x(), y - item.y(), stroke_tolerance(item))
        }
        MarkType::Text => text_bounds(item).contains(Position::new(x, y)),
        MarkType::Area | MarkType::Line | MarkType::Unsupported => false,
    }
}

fn pick_mark(mark: &Mark, x: f32, y: f32) -> Option<ItemId> {
    if !mark.interactive || mark.items.is_empty() {
        return None;
    }
    match mark.marktype {
        MarkType::Area => {
            let style = &mark.items[0];
            hit_outline(style, &area_path(&mark.items), x, y).then_some(style.id)
        }
        MarkType::Line => {
            let style = &mark.items[0];
            let shape = contours(&line_path(&mark.items));
            near_contours(&shape, x, y, stroke_tolerance(style)).then_some(style.id)
        }
        MarkType::Group => mark.items.iter().rev().find_map(|item| {
            let (gx, gy) = (x - item.x(), y - item.y());
            let local = Rectangle::new(0.0, 0.0, item.width(), item.height());
            if item.clip && !local.contains(Position::new(gx, gy)) {
                return None;
            }
            item.items
                .iter()
                .rev()
                .find_map(|child| pick_mark(child, gx, gy))
                .or_else(|| hit_item(MarkType::Group, item, x, y).then_some(item.id))
        }),
        marktype => mark
            .items
            .iter()
            .rev()
            .find(|item| hit_item(marktype, item, x, y))
            .map(|item| item.id),
    }
}

/// Topmost interactive item under `(x, y)`, in scene coordinates.
pub fn pick(scene: &Scene, x: f32, y: f32) -> Option<ItemId> {
    pick_mark(&scene.root, x, y)
}

/// Visits every mark with the canvas offset of its group.
pub fn visit_marks_with_offset<F: FnMut(&Mark, [f32; 2])>(scene: &Scene, mut f: F) {
    fn walk<F: FnMut(&Mark, [f32; 2])>(mark: &Mark, offset: [f32; 2], f: &mut F) {
        f(mark, offset);
        for item in &mark.items {
            let inner = [offset[0] + item.x(), offset[1] + item.y()];
            for child in &item.items {
                walk(child, inner, f);
            }
        }
    }
    walk(&scene.root, [0.0, 0.0], &mut f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Paint;

    fn filled(mut item: Item) -> Item {
        item.fill = Some(Paint::color("steelblue"));
        item
    }

    fn scene() -> Scene {
        let mut a = filled(Item::at(10.0, 10.0));
        a.width = Some(20.0);
        a.height = Some(20.0);
        let mut b = filled(Item::at(20.0, 20.0));
        b.width = Some(20.0);
        b.height = Some(20.0);
        let rects = Mark::new(MarkType::Rect, vec![a, b]);
        let dot = filled(Item::at(100.0, 100.0));
        let symbols = Mark::new(MarkType::Symbol, vec![dot]);
        let mut group = Item::at(5.0, 5.0);
        group.width = Some(200.0);
        group.height = Some(200.0);
        group.items = vec![rects, symbols];
        Scene::new(Mark::new(MarkType::Group, vec![group]))
    }

    #[test]
    fn topmost_item_wins() {
        let scene = scene();
        let rects = &scene.root.items[0].items[0];
        assert_eq!(pick(&scene, 30.0, 30.0), Some(rects.items[1].id));
        assert_eq!(pick(&scene, 16.0, 16.0), Some(rects.items[0].id));
        assert_eq!(pick(&scene, 1.0, 1.0), None);
    }

    #[test]
    fn symbols_hit_inside_their_outline() {
        let scene = scene();
        let dot = scene.root.items[0].items[1].items[0].id;
        assert_eq!(pick(&scene, 105.0, 105.0), Some(dot));
        assert_eq!(pick(&scene, 107.0, 107.0), Some(dot));
        assert_eq!(pick(&scene, 105.0, 115.0), None);
    }

    #[test]
    fn non_interactive_marks_are_skipped() {
        let mut scene = scene();
        scene.root.items[0].items[0].interactive = false;
        assert_eq!(pick(&scene, 30.0, 30.0), None);
    }

    #[test]
    fn even_odd_holes() {
        let ring = vec![
            (vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]], true),
            (vec![[3.0, 3.0], [7.0, 3.0], [7.0, 7.0], [3.0, 7.0]], true),
        ];
        assert!(point_in_contours(&ring, 1.0, 1.0));
        assert!(!point_in_contours(&ring, 5.0, 5.0));
    }

    #[test]
    fn mark_bounds_union_items() {
        let scene = scene();
        let rects = &scene.root.items[0].items[0];
        assert_eq!(mark_bounds(rects), Some(Rectangle::new(10.0, 10.0, 30.0, 30.0)));
    }
}
