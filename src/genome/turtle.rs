//! Turtle genomes: programs that steer a flock of drawing turtles.

use super::{Genome, GenomeRng};
use crate::display::{Thumbnail, Viewport, color_value, pack_rgb};
use crate::error::{BrowseError, Result};
use crate::schema::GeneWeights;

/// Genes per program.
pub const GENOME_LENGTH: usize = 100;

/// Per-gene mutation probability, in percent.
const MUTATION_RATE: u32 = 3;

const MAX_TURTLES: usize = 1 << 14;
const MAX_NESTING: usize = 20;

/// Half the side of the drawing area, in turtle steps. The area wraps
/// around at its edges.
const HALF_EXTENT: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurtleOp {
    /// Mark the patch under each active turtle with its colour.
    Plot,
    /// Move forward by the argument.
    Forward,
    /// Turn left by the argument, in degrees.
    Left,
    /// Duplicate the active turtles and make the copies active.
    Hatch,
    /// Return to the turtles active before the matching hatch.
    End,
    /// Blur the canvas.
    Diffuse,
    Red,
    Green,
    Blue,
}

impl TurtleOp {
    pub const ALL: [TurtleOp; 9] = [
        TurtleOp::Plot,
        TurtleOp::Forward,
        TurtleOp::Left,
        TurtleOp::Hatch,
        TurtleOp::End,
        TurtleOp::Diffuse,
        TurtleOp::Red,
        TurtleOp::Green,
        TurtleOp::Blue,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TurtleOp::Plot => "plot",
            TurtleOp::Forward => "fd",
            TurtleOp::Left => "lt",
            TurtleOp::Hatch => "hatch[",
            TurtleOp::End => "]",
            TurtleOp::Diffuse => "diffuse",
            TurtleOp::Red => "+r",
            TurtleOp::Green => "+g",
            TurtleOp::Blue => "+b",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    pub const fn takes_argument(self) -> bool {
        matches!(
            self,
            TurtleOp::Forward | TurtleOp::Left | TurtleOp::Red | TurtleOp::Green | TurtleOp::Blue
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gene {
    pub op: TurtleOp,
    /// In -100..100; ignored by ops without an argument.
    pub argument: i32,
}

impl Gene {
    fn random(rng: &mut GenomeRng) -> Self {
        Self {
            op: TurtleOp::ALL[rng.below(TurtleOp::ALL.len() as u64) as usize],
            argument: rng.below(200) as i32 - 100,
        }
    }
}

/// A turtle drawing program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurtleGenome {
    genes: Vec<Gene>,
}

impl TurtleGenome {
    pub fn from_genes(genes: Vec<Gene>) -> Result<Self> {
        if genes.len() != GENOME_LENGTH {
            return Err(BrowseError::parse(format!(
                "turtle program has {} genes, expected {}",
                genes.len(),
                GENOME_LENGTH
            )));
        }
        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }
}

impl Genome for TurtleGenome {
    const KIND: &'static str = "turtle";

    /// Turtle ops are drawn uniformly; the weight table does not apply.
    fn random(rng: &mut GenomeRng, _weights: &GeneWeights) -> Self {
        Self {
            genes: (0..GENOME_LENGTH).map(|_| Gene::random(rng)).collect(),
        }
    }

    fn mutate(&mut self, rng: &mut GenomeRng, _weights: &GeneWeights) {
        for gene in &mut self.genes {
            if rng.chance(MUTATION_RATE) {
                *gene = Gene::random(rng);
            }
        }
    }

    fn render(&self, viewport: &Viewport) -> Thumbnail {
        let mut canvas = Canvas::new(viewport);
        for gene in &self.genes {
            canvas.run(gene);
        }
        canvas.into_thumbnail()
    }

    fn complexity(&self) -> Option<u32> {
        None
    }

    fn encode(&self) -> String {
        let mut tokens = Vec::with_capacity(self.genes.len() * 2);
        for gene in &self.genes {
            if gene.op.takes_argument() {
                tokens.push(gene.argument.to_string());
            }
            tokens.push(gene.op.name().to_string());
        }
        tokens.join(" ")
    }

    fn decode(text: &str) -> Result<Self> {
        let mut genes = Vec::with_capacity(GENOME_LENGTH);
        let mut pending: Option<i32> = None;
        for token in text.split_whitespace() {
            if let Some(op) = TurtleOp::from_name(token) {
                let argument = match (op.takes_argument(), pending.take()) {
                    (true, Some(arg)) => arg,
                    (false, None) => 0,
                    (true, None) => {
                        return Err(BrowseError::parse(format!("{token} needs an argument")));
                    }
                    (false, Some(arg)) => {
                        return Err(BrowseError::parse(format!("stray argument {arg} before {token}")));
                    }
                };
                genes.push(Gene { op, argument });
            } else {
                if pending.is_some() {
                    return Err(BrowseError::parse(format!("two arguments in a row at {token}")));
                }
                let arg = token
                    .parse()
                    .map_err(|_| BrowseError::parse(format!("unknown turtle op {token:?}")))?;
                pending = Some(arg);
            }
        }
        if let Some(arg) = pending {
            return Err(BrowseError::parse(format!("trailing argument {arg}")));
        }
        Self::from_genes(genes)
    }
}

#[derive(Debug, Clone, Copy)]
struct Turtle {
    /// Offset from the centre, in turtle steps.
    x: f32,
    y: f32,
    /// Radians from the x axis.
    heading: f32,
    /// May stray outside 0..1; clipped when drawn.
    rgb: [f32; 3],
}

impl Default for Turtle {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            rgb: [1.0; 3],
        }
    }
}

/// Patches of colour under a viewport plus the turtles drawing on them.
struct Canvas<'a> {
    viewport: &'a Viewport,
    patches: Vec<[f32; 3]>,
    turtles: Vec<Turtle>,
    /// `turtles[first_active..]` receive commands.
    first_active: usize,
    saved: Vec<usize>,
}

impl<'a> Canvas<'a> {
    fn new(viewport: &'a Viewport) -> Self {
        Self {
            viewport,
            patches: vec![[0.0; 3]; viewport.len()],
            turtles: vec![Turtle::default()],
            first_active: 0,
            saved: Vec::new(),
        }
    }

    fn active(&mut self) -> &mut [Turtle] {
        &mut self.turtles[self.first_active..]
    }

    fn run(&mut self, gene: &Gene) {
        let arg = gene.argument as f32;
        match gene.op {
            TurtleOp::Plot => self.plot(),
            TurtleOp::Forward => {
                for t in self.active() {
                    t.x += arg * t.heading.cos();
                    t.y += arg * t.heading.sin();
                }
            }
            TurtleOp::Left => {
                for t in self.active() {
                    t.heading += arg.to_radians();
                }
            }
            TurtleOp::Hatch => self.hatch(),
            TurtleOp::End => {
                if let Some(first) = self.saved.pop() {
                    self.first_active = first;
                }
            }
            TurtleOp::Diffuse => self.diffuse(),
            TurtleOp::Red => self.tint(0, arg),
            TurtleOp::Green => self.tint(1, arg),
            TurtleOp::Blue => self.tint(2, arg),
        }
    }

    fn tint(&mut self, channel: usize, amount: f32) {
        for t in self.active() {
            t.rgb[channel] += amount / 100.0;
        }
    }

    fn plot(&mut self) {
        let span = 2.0 * HALF_EXTENT;
        for i in self.first_active..self.turtles.len() {
            let t = self.turtles[i];
            let x = (t.x + HALF_EXTENT).rem_euclid(span) - HALF_EXTENT;
            let y = (t.y + HALF_EXTENT).rem_euclid(span) - HALF_EXTENT;
            // Turtle y points up, image y points down.
            if let Some((px, py)) = self.viewport.pixel_at(x / HALF_EXTENT, -y / HALF_EXTENT) {
                self.patches[py * self.viewport.width + px] = t.rgb;
            }
        }
    }

    fn hatch(&mut self) {
        // Too deep: the hatch and its matching end are no-ops.
        if self.saved.len() >= MAX_NESTING {
            self.saved.push(self.first_active);
            return;
        }
        let count = (self.turtles.len() - self.first_active)
            .min(MAX_TURTLES.saturating_sub(self.turtles.len()));
        self.saved.push(self.first_active);
        let start = self.first_active;
        self.first_active = self.turtles.len();
        self.turtles.extend_from_within(start..start + count);
    }

    /// Five-point blur with wraparound, updated in place.
    fn diffuse(&mut self) {
        let (w, h) = (self.viewport.width, self.viewport.height);
        if w == 0 || h == 0 {
            return;
        }
        for y in 0..h {
            for x in 0..w {
                let left = y * w + (x + w - 1) % w;
                let right = y * w + (x + 1) % w;
                let up = ((y + h - 1) % h) * w + x;
                let down = ((y + 1) % h) * w + x;
                let here = y * w + x;
                for c in 0..3 {
                    self.patches[here][c] = (self.patches[left][c]
                        + self.patches[right][c]
                        + self.patches[here][c]
                        + self.patches[up][c]
                        + self.patches[down][c])
                        / 5.0;
                }
            }
        }
    }

    fn into_thumbnail(self) -> Thumbnail {
        let pixels = self
            .patches
            .iter()
            .map(|&[r, g, b]| pack_rgb(color_value(r), color_value(g), color_value(b)))
            .collect();
        Thumbnail::from_pixels(self.viewport.width, self.viewport.height, pixels)
    }
}
