//! Polyline simplification: a radial-distance pass followed by
//! Douglas-Peucker, both against a squared tolerance.

type Point = [f32; 2];

fn sq_dist(a: Point, b: Point) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn sq_seg_dist(p: Point, a: Point, b: Point) -> f32 {
    let (mut x, mut y) = (a[0], a[1]);
    let (dx, dy) = (b[0] - x, b[1] - y);
    if dx != 0.0 || dy != 0.0 {
        let t = ((p[0] - x) * dx + (p[1] - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b[0];
            y = b[1];
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }
    sq_dist(p, [x, y])
}

fn radial(points: &[Point], sq_tolerance: f32) -> Vec<Point> {
    let mut prev = points[0];
    let mut out = vec![prev];
    let mut last = prev;
    for &p in &points[1..] {
        last = p;
        if sq_dist(p, prev) > sq_tolerance {
            out.push(p);
            prev = p;
        }
    }
    if prev != last {
        out.push(last);
    }
    out
}

fn douglas_peucker(points: &[Point], sq_tolerance: f32) -> Vec<Point> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((first, end)) = stack.pop() {
        let mut max_sq = sq_tolerance;
        let mut index = None;
        for i in first + 1..end {
            let d = sq_seg_dist(points[i], points[first], points[end]);
            if d > max_sq {
                max_sq = d;
                index = Some(i);
            }
        }
        if let Some(i) = index {
            keep[i] = true;
            stack.push((first, i));
            stack.push((i, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplifies `points` so no dropped vertex lies further than `tolerance`
/// from the result. Endpoints are always kept.
pub fn simplify(points: &[Point], tolerance: f32) -> Vec<Point> {
    if points.len() <= 2 || tolerance <= 0.0 {
        return points.to_vec();
    }
    let sq = tolerance * tolerance;
    let reduced = radial(points, sq);
    if reduced.len() <= 2 {
        return reduced;
    }
    douglas_peucker(&reduced, sq)
}
