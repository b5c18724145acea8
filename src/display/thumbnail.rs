//! Rendered genome summaries and the coordinate systems they are drawn in.

/// Pack 8-bit channels into a `0xRRGGBB` pixel.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split a `0xRRGGBB` pixel into its channels.
#[inline]
pub fn unpack_rgb(pixel: u32) -> [u8; 3] {
    [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8]
}

/// Convert a nominal 0..1 intensity to a clipped colour byte.
#[inline]
pub fn color_value(intensity: f32) -> u8 {
    // NaN casts to 0.
    (256.0 * intensity).floor().clamp(0.0, 255.0) as u8
}

/// A rendered block of pixels, row-major.
///
/// Equality is the novelty test used when breeding: two genomes are
/// considered the same if their thumbnails match pixel for pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl Thumbnail {
    /// A black thumbnail.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Wrap existing pixels. Panics if the length disagrees with the size.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        assert_eq!(pixels.len(), width * height, "thumbnail pixel count");
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build from separate red, green and blue intensity fields.
    pub fn from_fields(width: usize, height: usize, r: &[f32], g: &[f32], b: &[f32]) -> Self {
        let pixels = r
            .iter()
            .zip(g)
            .zip(b)
            .map(|((&r, &g), &b)| pack_rgb(color_value(r), color_value(g), color_value(b)))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Pixel rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.pixels.chunks(self.width.max(1))
    }
}

/// Mapping from pixel coordinates of a block to genome image space.
///
/// Image space spans `[-aspect, aspect] x [-1, 1]` for the whole picture.
/// A thumbnail shows the whole picture; a sector shows one cell's share of
/// the full-scale picture, so drawing every sector into its cell yields one
/// large image across the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    /// Image-space x of the leftmost pixel.
    pub left: f32,
    /// Image-space y of the top pixel.
    pub top: f32,
    /// Image-space width of one pixel.
    pub x_scale: f32,
    /// Image-space height of one pixel.
    pub y_scale: f32,
    /// Distinguishes blocks for position-seeded noise.
    pub tile_id: u32,
}

impl Viewport {
    /// The whole picture squeezed into one thumbnail.
    pub fn thumbnail(width: usize, height: usize) -> Self {
        let aspect = width as f32 / height as f32;
        Self {
            width,
            height,
            left: -aspect,
            top: -1.0,
            x_scale: 2.0 * aspect / width as f32,
            y_scale: 2.0 / height as f32,
            tile_id: 0,
        }
    }

    /// Cell `(col, row)` of the picture enlarged across a `cols` x `rows` grid.
    pub fn sector(
        cols: usize,
        rows: usize,
        col: usize,
        row: usize,
        width: usize,
        height: usize,
    ) -> Self {
        let aspect = width as f32 / height as f32;
        Self {
            width,
            height,
            left: -aspect + (2.0 * aspect / cols as f32) * col as f32,
            top: -1.0 + (2.0 / rows as f32) * row as f32,
            x_scale: 2.0 * aspect / (width * cols) as f32,
            y_scale: 2.0 / (height * rows) as f32,
            tile_id: 1 + (row * cols + col) as u32,
        }
    }

    /// Number of pixels covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Image-space x of pixel column `px`.
    #[inline]
    pub fn x_at(&self, px: usize) -> f32 {
        self.left + self.x_scale * px as f32
    }

    /// Image-space y of pixel row `py`.
    #[inline]
    pub fn y_at(&self, py: usize) -> f32 {
        self.top + self.y_scale * py as f32
    }

    /// Pixel containing image-space point `(x, y)`, if inside this block.
    pub fn pixel_at(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let px = ((x - self.left) / self.x_scale).floor();
        let py = ((y - self.top) / self.y_scale).floor();
        if px < 0.0 || py < 0.0 || px >= self.width as f32 || py >= self.height as f32 {
            return None;
        }
        Some((px as usize, py as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_value_clips() {
        assert_eq!(color_value(-0.5), 0);
        assert_eq!(color_value(0.0), 0);
        assert_eq!(color_value(0.5), 128);
        assert_eq!(color_value(1.0), 255);
        assert_eq!(color_value(7.0), 255);
        assert_eq!(color_value(f32::NAN), 0);
    }

    #[test]
    fn test_pack_unpack() {
        let pixel = pack_rgb(0x12, 0x34, 0x56);
        assert_eq!(pixel, 0x123456);
        assert_eq!(unpack_rgb(pixel), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_thumbnail_equality_is_pixelwise() {
        let a = Thumbnail::blank(4, 4);
        let mut pixels = vec![0; 16];
        assert_eq!(a, Thumbnail::from_pixels(4, 4, pixels.clone()));
        pixels[5] = 1;
        assert_ne!(a, Thumbnail::from_pixels(4, 4, pixels));
    }

    #[test]
    fn test_sectors_tile_the_thumbnail_space() {
        let (cols, rows, w, h) = (4, 3, 16, 16);
        let whole = Viewport::thumbnail(w, h);
        let first = Viewport::sector(cols, rows, 0, 0, w, h);
        let last = Viewport::sector(cols, rows, cols - 1, rows - 1, w, h);

        assert!((first.left - whole.left).abs() < 1e-6);
        assert!((first.top - whole.top).abs() < 1e-6);

        // The pixel after the last sector's last pixel is the far edge.
        let right = last.x_at(w);
        let bottom = last.y_at(h);
        assert!((right - (-whole.left)).abs() < 1e-5);
        assert!((bottom - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pixel_at_inverts_x_at() {
        let vp = Viewport::thumbnail(10, 10);
        for px in 0..10 {
            let x = vp.x_at(px) + vp.x_scale * 0.5;
            let y = vp.y_at(3) + vp.y_scale * 0.5;
            assert_eq!(vp.pixel_at(x, y), Some((px, 3)));
        }
        assert_eq!(vp.pixel_at(5.0, 0.0), None);
    }
}
