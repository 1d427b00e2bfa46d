use crate::context::RenderContext;
use crate::scene::Mark;

/// Text only ever goes to the overlay.
pub fn draw(ctx: &mut RenderContext, mark: &Mark) {
    for item in &mark.items {
        ctx.overlay.text(item);
    }
}
