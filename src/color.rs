use crate::scene::Paint;
use std::collections::HashMap;
use std::str::FromStr;

/// Memoised CSS color to `[r, g, b]` conversion, channels in `0..=1`.
/// Owned by the render context and dropped with it.
#[derive(Debug, Default)]
pub struct ColorCache {
    map: HashMap<String, [f32; 3]>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unparseable strings come back black.
    pub fn rgb(&mut self, css: &str) -> [f32; 3] {
        if let Some(c) = self.map.get(css) {
            return *c;
        }
        let c = parse_rgb(css).unwrap_or([0.0, 0.0, 0.0]);
        self.map.insert(css.to_string(), c);
        c
    }

    /// Gradients resolve to their first stop.
    pub fn paint(&mut self, paint: Option<&Paint>) -> [f32; 3] {
        match paint {
            Some(Paint::Color(css)) => self.rgb(css),
            Some(Paint::Gradient(g)) => match g.stops.first() {
                Some(stop) => self.rgb(&stop.color),
                None => [0.0, 0.0, 0.0],
            },
            None => [0.0, 0.0, 0.0],
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn parse_rgb(css: &str) -> Option<[f32; 3]> {
    let c = svgtypes::Color::from_str(css.trim()).ok()?;
    Some([
        c.red as f32 / 255.0,
        c.green as f32 / 255.0,
        c.blue as f32 / 255.0,
    ])
}
