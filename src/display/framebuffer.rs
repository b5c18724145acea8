//! In-memory grid image and PPM output.

use std::io::{self, Write};

use super::{Display, Thumbnail};
use crate::error::{BrowseError, Result};

/// Pixels for the whole grid of thumbnails, row-major `0xRRGGBB`.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    cols: usize,
    rows: usize,
    cell_width: usize,
    cell_height: usize,
    pixels: Vec<u32>,
    /// Number of times `show` has been called.
    frames: u64,
}

impl Framebuffer {
    pub fn new(cols: usize, rows: usize, cell_width: usize, cell_height: usize) -> Self {
        Self {
            cols,
            rows,
            cell_width,
            cell_height,
            pixels: vec![0; cols * cell_width * rows * cell_height],
            frames: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cols * self.cell_width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows * self.cell_height
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Copy `thumbnail` into cell `index` (row-major).
    pub fn blit(&mut self, index: usize, thumbnail: &Thumbnail) -> Result<()> {
        let len = self.cols * self.rows;
        if index >= len {
            return Err(BrowseError::Index { index, len });
        }
        if thumbnail.size() != (self.cell_width, self.cell_height) {
            return Err(BrowseError::ThumbnailSize {
                expected: (self.cell_width, self.cell_height),
                actual: thumbnail.size(),
            });
        }

        let x0 = (index % self.cols) * self.cell_width;
        let y0 = (index / self.cols) * self.cell_height;
        let width = self.width();
        for (dy, row) in thumbnail.rows().enumerate() {
            let start = (y0 + dy) * width + x0;
            self.pixels[start..start + self.cell_width].copy_from_slice(row);
        }
        Ok(())
    }

    /// Read back cell `index` as a thumbnail.
    pub fn cell(&self, index: usize) -> Result<Thumbnail> {
        let len = self.cols * self.rows;
        if index >= len {
            return Err(BrowseError::Index { index, len });
        }
        let x0 = (index % self.cols) * self.cell_width;
        let y0 = (index / self.cols) * self.cell_height;
        let width = self.width();
        let mut pixels = Vec::with_capacity(self.cell_width * self.cell_height);
        for y in y0..y0 + self.cell_height {
            pixels.extend_from_slice(&self.pixels[y * width + x0..y * width + x0 + self.cell_width]);
        }
        Ok(Thumbnail::from_pixels(
            self.cell_width,
            self.cell_height,
            pixels,
        ))
    }

    /// Write the grid as a binary PPM (`P6`), with optional comment lines.
    pub fn write_ppm<W: Write>(&self, w: &mut W, comments: &[&str]) -> io::Result<()> {
        writeln!(w, "P6")?;
        for comment in comments {
            for line in comment.lines() {
                writeln!(w, "# {}", line)?;
            }
        }
        writeln!(w, "{} {} 255", self.width(), self.height())?;

        let mut buffer = Vec::with_capacity(self.width() * 3);
        for row in self.pixels.chunks(self.width().max(1)) {
            buffer.clear();
            for &pixel in row {
                buffer.extend_from_slice(&super::unpack_rgb(pixel));
            }
            w.write_all(&buffer)?;
        }
        Ok(())
    }
}

impl Display for Framebuffer {
    fn paint(&mut self, index: usize, thumbnail: &Thumbnail) -> Result<()> {
        self.blit(index, thumbnail)
    }

    fn show(&mut self) {
        self.frames += 1;
    }

    fn framebuffer(&self) -> &Framebuffer {
        self
    }
}
