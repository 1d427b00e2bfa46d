use crate::context::RenderContext;
use crate::utils::Rectangle;
use winit::dpi::{LogicalSize, PhysicalSize};

/// The host element the painter draws into. A detached canvas renders at a
/// device pixel ratio of 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub attached: bool,
    pub device_pixel_ratio: f64,
}

impl Canvas {
    pub fn attached(device_pixel_ratio: f64) -> Self {
        Self {
            attached: true,
            device_pixel_ratio,
        }
    }

    pub fn detached() -> Self {
        Self {
            attached: false,
            device_pixel_ratio: 1.0,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.attached && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::detached()
    }
}

/// Resizes the render target and the overlay to `width` x `height` logical
/// pixels and recomputes the clip rectangle the shaders discard against.
pub fn resize(
    ctx: &mut RenderContext,
    canvas: &Canvas,
    width: f32,
    height: f32,
    origin: [f32; 2],
) -> PhysicalSize<u32> {
    let ratio = canvas.ratio();
    let physical: PhysicalSize<u32> =
        LogicalSize::new(width.max(1.0) as f64, height.max(1.0) as f64).to_physical(ratio);
    let physical = PhysicalSize::new(physical.width.max(1), physical.height.max(1));

    ctx.backend.resize(physical);
    ctx.overlay.resize(physical, ratio, origin);
    ctx.ratio = ratio;
    ctx.origin = origin;
    ctx.bounds = Rectangle::new(
        0.0,
        0.0,
        (physical.width as f64 / ratio) as f32,
        (physical.height as f64 / ratio) as f32,
    );
    ctx.clip = ctx.bounds;
    log::debug!(
        "resized to {}x{} (ratio {}, physical {}x{})",
        width,
        height,
        ratio,
        physical.width,
        physical.height
    );
    physical
}
