//! Symbol shapes: the index the symbol shader switches on, and SVG outlines
//! for the overlay and for picking.

use std::f32::consts::{PI, SQRT_2};
use std::fmt::Write;

pub const DEFAULT_SYMBOL_SIZE: f32 = 64.0;

const HALF_SQRT3: f32 = 0.866_025_4;

/// Shader shape index; unknown names fall back to circle.
pub fn shape_index(shape: Option<&str>) -> f32 {
    match shape.unwrap_or("circle") {
        "circle" => 0.0,
        "cross" => 1.0,
        "diamond" => 2.0,
        "square" => 3.0,
        "star" => 4.0,
        "triangle" | "triangle-up" => 5.0,
        "triangle-right" => 6.0,
        "triangle-down" => 7.0,
        "triangle-left" => 8.0,
        "wye" => 9.0,
        _ => 0.0,
    }
}

/// Radius of the circle enclosing a symbol of area `size`.
pub fn bounding_radius(shape: Option<&str>, size: f32) -> f32 {
    let r = size.max(0.0).sqrt() / 2.0;
    match shape_index(shape) as u32 {
        3 => r * SQRT_2,
        4 => (size.max(0.0) * STAR_KA).sqrt(),
        9 => r * 1.2,
        _ => r,
    }
}

const STAR_KA: f32 = 0.890_813_1;

fn polygon(points: &[(f32, f32)]) -> String {
    let mut out = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        write!(out, "{}{},{}", cmd, x, y).ok();
    }
    out.push('Z');
    out
}

/// Outline centred on the origin, for a symbol of area `size`.
pub fn symbol_path(shape: Option<&str>, size: f32) -> String {
    let size = size.max(0.0);
    let r = size.sqrt() / 2.0;
    match shape_index(shape) as u32 {
        1 => {
            let s = r / 2.5;
            polygon(&[
                (-r, -s),
                (-r, s),
                (-s, s),
                (-s, r),
                (s, r),
                (s, s),
                (r, s),
                (r, -s),
                (s, -s),
                (s, -r),
                (-s, -r),
                (-s, -s),
            ])
        }
        2 => polygon(&[(-r, 0.0), (0.0, -r), (r, 0.0), (0.0, r)]),
        3 => polygon(&[(-r, -r), (r, -r), (r, r), (-r, r)]),
        4 => {
            let kr = (PI / 10.0).sin() / (7.0 * PI / 10.0).sin();
            let kx = (2.0 * PI / 10.0).sin() * kr;
            let ky = -(2.0 * PI / 10.0).cos() * kr;
            let outer = (size * STAR_KA).sqrt();
            let (x, y) = (kx * outer, ky * outer);
            let mut points = vec![(0.0, -outer), (x, y)];
            for i in 1..5 {
                let a = 2.0 * PI * i as f32 / 5.0;
                let (s, c) = a.sin_cos();
                points.push((s * outer, -c * outer));
                points.push((c * x - s * y, s * x + c * y));
            }
            polygon(&points)
        }
        5 => {
            let h = HALF_SQRT3 * r;
            polygon(&[(0.0, -h), (-r, h), (r, h)])
        }
        6 => {
            let h = HALF_SQRT3 * r;
            polygon(&[(h, 0.0), (-h, -r), (-h, r)])
        }
        7 => {
            let h = HALF_SQRT3 * r;
            polygon(&[(0.0, h), (-r, -h), (r, -h)])
        }
        8 => {
            let h = HALF_SQRT3 * r;
            polygon(&[(-h, 0.0), (h, -r), (h, r)])
        }
        9 => {
            let k = 1.0 / 12f32.sqrt();
            let a = (k / 2.0 + 1.0) * 3.0;
            let rr = (size / a).sqrt();
            let (x0, y0) = (rr / 2.0, rr * k);
            let (x1, y1) = (x0, rr * k + rr);
            let (x2, y2) = (-x1, y1);
            let (c, s) = (-0.5, HALF_SQRT3);
            polygon(&[
                (x0, y0),
                (x1, y1),
                (x2, y2),
                (c * x0 - s * y0, s * x0 + c * y0),
                (c * x1 - s * y1, s * x1 + c * y1),
                (c * x2 - s * y2, s * x2 + c * y2),
                (c * x0 + s * y0, c * y0 - s * x0),
                (c * x1 + s * y1, c * y1 - s * x1),
                (c * x2 + s * y2, c * y2 - s * x2),
            ])
        }
        _ => format!(
            "M{r},0A{r},{r},0,1,1,{n},0A{r},{r},0,1,1,{r},0Z",
            r = r,
            n = -r
        ),
    }
}
