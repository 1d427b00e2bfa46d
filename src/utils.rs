#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct DrawUniform {
    pub transform: [[f32; 4]; 4], // 4x4 column-major projection matrix
    pub clip: [f32; 4],           // x0, y0, x1, y1 in logical pixels
    pub offset: [f32; 2],
    pub z_factor: f32,
    pub _padding: f32,
}

/// Per-vertex attributes of the symbol shader. Three vertices per symbol.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct SymbolVertex {
    pub pos: [f32; 3],
    pub fill_color: [f32; 3],
    pub stroke_color: [f32; 3],
    pub fill_opacity: f32,
    pub stroke_width: f32,
    pub size: f32,
    pub shape: f32,
    pub stroke_opacity: f32,
}

/// Per-vertex attributes of the rect shader. Six vertices per rect.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, Default, PartialEq)]
pub struct RectVertex {
    pub pos: [f32; 3],
    pub size: [f32; 2],
    pub fill_color: [f32; 3],
    pub stroke_color: [f32; 3],
    pub fill_opacity: f32,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
    pub corner_radius: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis aligned box, also used as the bounds type for item selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from two corners in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.x
            && position.x <= self.x + self.width
            && position.y >= self.y
            && position.y <= self.y + self.height
    }

    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        Rectangle::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Rectangle::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Clip rectangle in the `[x0, y0, x1, y1]` layout the shaders expect.
    pub fn to_clip(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn from_clip(clip: [f32; 4]) -> Self {
        Rectangle::from_corners(clip[0], clip[1], clip[2], clip[3])
    }
}
