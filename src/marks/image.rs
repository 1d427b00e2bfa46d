use crate::context::RenderContext;
use crate::error::Result;
use crate::gpu::{DrawCommand, TextureKey};
use crate::loader::ResourceLoader;
use crate::matrix;
use crate::scene::{Item, Mark};
use crate::utils::Rectangle;
use image::RgbaImage;

/// Straight alpha to premultiplied, as the image program blends.
pub fn premultiply(image: &RgbaImage) -> Vec<u8> {
    let mut out = image.as_raw().clone();
    for px in out.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    out
}

/// Places `texture` over `bounds` (canvas coordinates).
pub fn image_command(ctx: &RenderContext, texture: TextureKey, bounds: Rectangle) -> DrawCommand {
    let mut uniform = ctx.uniform([0.0, 0.0]);
    let placement = matrix::multiply(
        &matrix::translate(bounds.x, bounds.y, 0.0),
        &matrix::scale(bounds.width, bounds.height, 1.0),
    );
    uniform.transform = matrix::multiply(&ctx.matrix, &placement);
    DrawCommand::Image {
        texture,
        bounds,
        uniform,
    }
}

fn placement(item: &Item, width: f32, height: f32) -> (f32, f32) {
    let x = match item.align.as_deref() {
        Some("center") => item.x() - width / 2.0,
        Some("right") => item.x() - width,
        _ => item.x(),
    };
    let y = match item.baseline.as_deref() {
        Some("middle") => item.y() - height / 2.0,
        Some("bottom") => item.y() - height,
        _ => item.y(),
    };
    (x, y)
}

/// Each image becomes a texture that lives until the next frame. Images
/// that fail to load are skipped.
pub fn draw(ctx: &mut RenderContext, mark: &Mark, loader: &dyn ResourceLoader) -> Result<()> {
    for item in &mark.items {
        let Some(url) = item.url.as_deref() else {
            continue;
        };
        let image = match loader.load_image(url) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("skipping image {}: {}", url, e);
                continue;
            }
        };
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 {
            continue;
        }
        let texture = ctx.backend.create_texture(iw, ih, &premultiply(&image))?;
        ctx.images.push(texture);

        let width = item.width.unwrap_or(iw as f32);
        let height = item.height.unwrap_or(ih as f32);
        let (x, y) = placement(item, width, height);
        let [ox, oy] = ctx.offset();
        let command = image_command(ctx, texture, Rectangle::new(x + ox, y + oy, width, height));
        ctx.queue.push(command);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let image = RgbaImage::from_raw(2, 1, vec![255, 128, 0, 128, 10, 20, 30, 255]).unwrap();
        assert_eq!(premultiply(&image), vec![128, 64, 0, 128, 10, 20, 30, 255]);
    }

    #[test]
    fn alignment_shifts_the_box() {
        let mut item = Item::at(100.0, 50.0);
        item.align = Some("center".to_string());
        item.baseline = Some("bottom".to_string());
        assert_eq!(placement(&item, 20.0, 10.0), (90.0, 40.0));
    }
}
