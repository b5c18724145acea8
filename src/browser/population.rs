//! The population grid: genome slots addressed by row-major index.

use std::ops::Range;

use crate::display::{Thumbnail, Viewport};
use crate::error::{BrowseError, Result};
use crate::genome::Genome;

/// Index of the scratch slot used while breeding.
pub const PREVIEW: usize = 0;

/// A genome together with its cached thumbnail and complexity.
#[derive(Debug, Clone)]
pub struct Slot<G> {
    genome: G,
    thumbnail: Thumbnail,
    complexity: Option<u32>,
}

impl<G: Genome> Slot<G> {
    /// Render and measure `genome`.
    pub fn evaluate(genome: G, viewport: &Viewport) -> Self {
        let complexity = genome.complexity();
        let thumbnail = genome.render(viewport);
        Self {
            genome,
            thumbnail,
            complexity,
        }
    }

    /// Assemble a slot from parts that were already computed.
    pub(crate) fn from_parts(genome: G, thumbnail: Thumbnail, complexity: Option<u32>) -> Self {
        Self {
            genome,
            thumbnail,
            complexity,
        }
    }

    #[inline]
    pub fn genome(&self) -> &G {
        &self.genome
    }

    #[inline]
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }

    #[inline]
    pub fn complexity(&self) -> Option<u32> {
        self.complexity
    }
}

/// Fixed `cols` x `rows` grid of slots.
///
/// Slot `i` sits at row `i / cols`, column `i % cols`. Slot [`PREVIEW`] is
/// part of the grid but doubles as breeding scratch space.
#[derive(Debug, Clone)]
pub struct Population<G> {
    cols: usize,
    rows: usize,
    viewport: Viewport,
    slots: Vec<Slot<G>>,
}

impl<G: Genome> Population<G> {
    /// Build every slot from `init`, in index order.
    pub fn from_fn<F>(
        cols: usize,
        rows: usize,
        thumb_width: usize,
        thumb_height: usize,
        mut init: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, &Viewport) -> Result<Slot<G>>,
    {
        let viewport = Viewport::thumbnail(thumb_width, thumb_height);
        let slots = (0..cols * rows)
            .map(|index| init(index, &viewport))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            cols,
            rows,
            viewport,
            slots,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Viewport thumbnails are rendered into.
    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// All indices in row-major order. Restartable: call again for a fresh
    /// pass.
    #[inline]
    pub fn indices(&self) -> Range<usize> {
        0..self.len()
    }

    pub fn index_of(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(BrowseError::Coords {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    pub fn coords_of(&self, index: usize) -> Result<(usize, usize)> {
        self.check(index)?;
        Ok((index / self.cols, index % self.cols))
    }

    /// Slot under pixel `(x, y)` of the full grid image.
    pub fn slot_at_pixel(&self, x: usize, y: usize) -> Result<usize> {
        self.index_of(y / self.viewport.height, x / self.viewport.width)
    }

    pub fn slot(&self, index: usize) -> Result<&Slot<G>> {
        self.check(index)?;
        Ok(&self.slots[index])
    }

    #[inline]
    pub fn genome(&self, index: usize) -> Result<&G> {
        self.slot(index).map(Slot::genome)
    }

    #[inline]
    pub fn complexity(&self, index: usize) -> Result<Option<u32>> {
        self.slot(index).map(Slot::complexity)
    }

    /// Every slot in index order.
    pub fn slots(&self) -> impl Iterator<Item = &Slot<G>> {
        self.slots.iter()
    }

    /// Replace the genome at `index`, re-rendering its thumbnail.
    pub fn set(&mut self, index: usize, genome: G) -> Result<()> {
        self.check(index)?;
        self.slots[index] = Slot::evaluate(genome, &self.viewport);
        Ok(())
    }

    /// Install an already evaluated slot at `index`.
    pub fn commit(&mut self, index: usize, slot: Slot<G>) -> Result<()> {
        self.check(index)?;
        if slot.thumbnail.size() != (self.viewport.width, self.viewport.height) {
            return Err(BrowseError::ThumbnailSize {
                expected: (self.viewport.width, self.viewport.height),
                actual: slot.thumbnail.size(),
            });
        }
        self.slots[index] = slot;
        Ok(())
    }

    /// Duplicate the slot at `src` into `dst`, leaving `src` untouched.
    pub fn copy(&mut self, src: usize, dst: usize) -> Result<()> {
        self.check(src)?;
        self.check(dst)?;
        if src != dst {
            self.slots[dst] = self.slots[src].clone();
        }
        Ok(())
    }

    /// Whether two slots have pixel-identical thumbnails.
    pub fn same_thumbnail(&self, a: usize, b: usize) -> Result<bool> {
        Ok(self.slot(a)?.thumbnail == self.slot(b)?.thumbnail)
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.slots.len() {
            return Err(BrowseError::Index {
                index,
                len: self.slots.len(),
            });
        }
        Ok(())
    }
}
