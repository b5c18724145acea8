//! Display surface: thumbnails, viewports and the grid framebuffer.

mod framebuffer;
mod thumbnail;

pub use framebuffer::Framebuffer;
pub use thumbnail::{Thumbnail, Viewport, color_value, pack_rgb, unpack_rgb};

use crate::error::Result;

/// Where the browser draws.
///
/// Cells are addressed by the same row-major index as population slots.
pub trait Display {
    /// Refresh one cell with `thumbnail`.
    fn paint(&mut self, index: usize, thumbnail: &Thumbnail) -> Result<()>;

    /// Present the whole grid.
    fn show(&mut self);

    /// Current contents of the grid.
    fn framebuffer(&self) -> &Framebuffer;
}
