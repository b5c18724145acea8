//! Genome kinds the browser can breed.
//!
//! The browser only sees genomes through the [`Genome`] trait: it can make
//! random ones, mutate them, render them into a [`Viewport`], ask for their
//! complexity, and write them as one line of text. Two kinds ship with the
//! crate:
//!
//! - [`RasterGenome`]: a stack program computing a colour for every point of
//!   the image plane. Its complexity is the size of its expression graph.
//! - [`TurtleGenome`]: a program of turtle moves drawing on a canvas. It has
//!   no complexity measure, so breeding only asks for visible novelty.

mod raster;
mod turtle;

pub use raster::{Instruction, Op, PROGRAM_LENGTH, RasterGenome};
pub use turtle::{GENOME_LENGTH, Gene, TurtleGenome, TurtleOp};

use rand::prelude::*;

use crate::display::{Thumbnail, Viewport};
use crate::error::Result;
use crate::schema::GeneWeights;

/// An evolvable unit of content.
pub trait Genome: Clone + Send + Sync + Sized {
    /// Short name used in logs.
    const KIND: &'static str;

    /// Build a fresh random genome.
    fn random(rng: &mut GenomeRng, weights: &GeneWeights) -> Self;

    /// Perturb this genome in place.
    fn mutate(&mut self, rng: &mut GenomeRng, weights: &GeneWeights);

    /// Render the region of the picture covered by `viewport`.
    fn render(&self, viewport: &Viewport) -> Thumbnail;

    /// Scalar complexity score, if this kind has one.
    fn complexity(&self) -> Option<u32>;

    /// One-line text form.
    fn encode(&self) -> String;

    /// Parse the output of [`Genome::encode`].
    fn decode(text: &str) -> Result<Self>;
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create from an optional seed, falling back to entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Uniform integer in `0..n`. `n` must be positive.
    #[inline]
    pub fn below(&mut self, n: u64) -> u64 {
        self.rng.gen_range(0..n)
    }

    /// True with probability `percent`/100.
    #[inline]
    pub fn chance(&mut self, percent: u32) -> bool {
        self.rng.gen_range(0..100) < percent
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    /// Access the underlying generator.
    #[inline]
    pub fn inner(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A cheap genome with directly controllable complexity and thumbnail.

    use super::*;
    use crate::error::BrowseError;

    /// Complexity is a number that mutation re-rolls; the thumbnail is a
    /// flat colour derived from a tag bumped by every mutation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Scripted {
        pub complexity: u32,
        pub tag: u32,
        /// When false, `complexity()` reports `None`.
        pub measured: bool,
        /// Upper bound (inclusive) for re-rolled complexity.
        pub ceiling: u32,
    }

    impl Scripted {
        pub fn new(complexity: u32, tag: u32) -> Self {
            Self {
                complexity,
                tag,
                measured: true,
                ceiling: 12,
            }
        }
    }

    impl Genome for Scripted {
        const KIND: &'static str = "scripted";

        fn random(rng: &mut GenomeRng, _weights: &GeneWeights) -> Self {
            Self::new(rng.below(13) as u32, rng.below(1 << 24) as u32)
        }

        fn mutate(&mut self, rng: &mut GenomeRng, _weights: &GeneWeights) {
            self.complexity = rng.below(self.ceiling as u64 + 1) as u32;
            self.tag = (self.tag + 1) & 0xFF_FFFF;
        }

        fn render(&self, viewport: &Viewport) -> Thumbnail {
            Thumbnail::from_pixels(
                viewport.width,
                viewport.height,
                vec![self.tag ^ viewport.tile_id; viewport.len()],
            )
        }

        fn complexity(&self) -> Option<u32> {
            self.measured.then_some(self.complexity)
        }

        fn encode(&self) -> String {
            format!("{} {}", self.complexity, self.tag)
        }

        fn decode(text: &str) -> Result<Self> {
            let mut parts = text.split_whitespace().map(|t| t.parse::<u32>());
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(complexity)), Some(Ok(tag)), None) => Ok(Self::new(complexity, tag)),
                _ => Err(BrowseError::parse(format!("expected two numbers: {text:?}"))),
            }
        }
    }
}
