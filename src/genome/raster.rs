//! Raster genomes: stack programs computing a colour for every pixel.
//!
//! A program is a fixed-length list of instructions run against a circular
//! stack of RGB intensity fields. Instead of executing it directly, the
//! program is compiled symbolically into an expression graph whose nodes are
//! hash-consed, so repeated subexpressions share a node. The graph is then
//! evaluated over the pixels of a [`Viewport`]; its size (nodes reachable from
//! the top-of-stack colour) is the genome's complexity.

use std::collections::HashMap;

use rayon::prelude::*;

use super::{Genome, GenomeRng};
use crate::display::{Thumbnail, Viewport};
use crate::error::{BrowseError, Result};
use crate::schema::GeneWeights;

/// Program length including the implicit end marker.
pub const PROGRAM_LENGTH: usize = 40;

/// Number of real instructions in a program.
const GENES: usize = PROGRAM_LENGTH - 1;

/// Per-instruction mutation probability, in percent.
const MUTATION_RATE: u32 = 15;

/// Depth of the circular stack.
const STACK_LIMIT: usize = 6;

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Constant,
    X,
    Y,
    Sprinkle,
    Abs,
    Atan,
    Cos,
    Exp,
    Floor,
    Log,
    Neg,
    Sign,
    Sin,
    Sqrt,
    Tan,
    Hwb,
    Add,
    Sub,
    Mul,
    Div,
    Average,
    Hypot,
    Max,
    Min,
    Mix,
    Mod,
    Pow,
    And,
    Or,
    Xor,
    Color,
    RotColor,
}

impl Op {
    /// Every opcode, in gene-table order.
    pub const ALL: [Op; 32] = [
        Op::Constant,
        Op::X,
        Op::Y,
        Op::Sprinkle,
        Op::Abs,
        Op::Atan,
        Op::Cos,
        Op::Exp,
        Op::Floor,
        Op::Log,
        Op::Neg,
        Op::Sign,
        Op::Sin,
        Op::Sqrt,
        Op::Tan,
        Op::Hwb,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Average,
        Op::Hypot,
        Op::Max,
        Op::Min,
        Op::Mix,
        Op::Mod,
        Op::Pow,
        Op::And,
        Op::Or,
        Op::Xor,
        Op::Color,
        Op::RotColor,
    ];

    /// Name used in the gene weight table and in saved programs.
    pub const fn name(self) -> &'static str {
        match self {
            Op::Constant => "constant",
            Op::X => "x",
            Op::Y => "y",
            Op::Sprinkle => "sprinkle",
            Op::Abs => "abs",
            Op::Atan => "atan",
            Op::Cos => "cos",
            Op::Exp => "exp",
            Op::Floor => "floor",
            Op::Log => "log",
            Op::Neg => "neg",
            Op::Sign => "sign",
            Op::Sin => "sin",
            Op::Sqrt => "sqrt",
            Op::Tan => "tan",
            Op::Hwb => "hwb",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Average => "average",
            Op::Hypot => "hypot",
            Op::Max => "max",
            Op::Min => "min",
            Op::Mix => "mix",
            Op::Mod => "mod",
            Op::Pow => "pow",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Color => "color",
            Op::RotColor => "rotcolor",
        }
    }

    pub fn from_name(name: &str) -> Option<Op> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Stack slots consumed. Every instruction pushes exactly one slot.
    const fn pops(self) -> isize {
        match self {
            Op::Constant | Op::X | Op::Y => 0,
            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Average
            | Op::Hypot
            | Op::Max
            | Op::Min
            | Op::Mix
            | Op::Mod
            | Op::Pow
            | Op::And
            | Op::Or
            | Op::Xor => 2,
            Op::Color => 3,
            _ => 1,
        }
    }

    fn unary(self, a: f32) -> f32 {
        match self {
            Op::Abs => a.abs(),
            Op::Atan => a.atan(),
            Op::Cos => a.cos(),
            Op::Exp => a.exp(),
            Op::Floor => a.floor(),
            Op::Log => a.abs().ln(),
            Op::Neg => -a,
            Op::Sign => {
                if a < 0.0 {
                    -1.0
                } else if a == 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Op::Sin => a.sin(),
            Op::Sqrt => a.abs().sqrt(),
            Op::Tan => a.tan(),
            _ => a,
        }
    }

    fn binary(self, a: f32, b: f32) -> f32 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
            Op::Average => 0.5 * (a + b),
            Op::Hypot => a.hypot(b),
            Op::Max => {
                if a > b {
                    a
                } else {
                    b
                }
            }
            Op::Min => {
                if a < b {
                    a
                } else {
                    b
                }
            }
            Op::Mod => a % b,
            Op::Pow => a.powf(b),
            // Bitwise ops on the float representation give fractal textures.
            Op::And => f32::from_bits(a.to_bits() & b.to_bits()),
            Op::Or => f32::from_bits(a.to_bits() | b.to_bits()),
            Op::Xor => f32::from_bits(a.to_bits() ^ b.to_bits()),
            _ => a,
        }
    }
}

/// Op names in `Op::ALL` order, for weighted picks.
const OP_NAMES: [&str; 32] = {
    let mut names = [""; 32];
    let mut i = 0;
    while i < names.len() {
        names[i] = Op::ALL[i].name();
        i += 1;
    }
    names
};

/// One program step. `value` is only meaningful for constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub value: f32,
}

impl Instruction {
    pub fn op(op: Op) -> Self {
        Self { op, value: 0.0 }
    }

    pub fn constant(value: f32) -> Self {
        Self {
            op: Op::Constant,
            value,
        }
    }

    fn random(rng: &mut GenomeRng, weights: &GeneWeights) -> Self {
        let op = weights
            .pick(&OP_NAMES, rng.inner())
            .map_or(Op::Constant, |i| Op::ALL[i]);
        if op == Op::Constant {
            Self::constant(rng.unit())
        } else {
            Self::op(op)
        }
    }

    fn token(&self) -> String {
        match self.op {
            Op::Constant => format!("{}", self.value),
            op => op.name().to_string(),
        }
    }

    fn parse(token: &str) -> Result<Self> {
        if let Some(op) = Op::from_name(token) {
            return Ok(Self::op(op));
        }
        token
            .parse::<f32>()
            .map(Self::constant)
            .map_err(|_| BrowseError::parse(format!("unknown instruction {token:?}")))
    }
}

/// An image-generating stack program.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGenome {
    program: Vec<Instruction>,
}

impl RasterGenome {
    /// Build from explicit instructions. There must be exactly
    /// `PROGRAM_LENGTH - 1` of them.
    pub fn from_program(program: Vec<Instruction>) -> Result<Self> {
        if program.len() != GENES {
            return Err(BrowseError::parse(format!(
                "program has {} instructions, expected {}",
                program.len(),
                GENES
            )));
        }
        Ok(Self { program })
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    fn compile(&self) -> Compiled {
        Compiled::new(&self.program)
    }
}

impl Genome for RasterGenome {
    const KIND: &'static str = "raster";

    fn random(rng: &mut GenomeRng, weights: &GeneWeights) -> Self {
        Self {
            program: (0..GENES)
                .map(|_| Instruction::random(rng, weights))
                .collect(),
        }
    }

    fn mutate(&mut self, rng: &mut GenomeRng, weights: &GeneWeights) {
        for ins in &mut self.program {
            if !rng.chance(MUTATION_RATE) {
                continue;
            }
            if ins.op == Op::Constant && rng.chance(50) {
                ins.value += (rng.unit() - 0.5) / 10.0;
            } else {
                *ins = Instruction::random(rng, weights);
            }
        }
    }

    fn render(&self, viewport: &Viewport) -> Thumbnail {
        let [r, g, b] = self.compile().evaluate(viewport);
        Thumbnail::from_fields(viewport.width, viewport.height, &r, &g, &b)
    }

    fn complexity(&self) -> Option<u32> {
        Some(self.compile().reachable_count() as u32)
    }

    fn encode(&self) -> String {
        let mut out = GENES.to_string();
        for ins in &self.program {
            out.push(' ');
            out.push_str(&ins.token());
        }
        out
    }

    fn decode(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let count: usize = tokens
            .next()
            .ok_or_else(|| BrowseError::parse("empty program"))?
            .parse()
            .map_err(|_| BrowseError::parse("missing instruction count"))?;
        if count != GENES {
            return Err(BrowseError::parse(format!(
                "incompatible program length {count}, expected {GENES}"
            )));
        }
        let program = tokens
            .map(Instruction::parse)
            .collect::<Result<Vec<_>>>()?;
        Self::from_program(program)
    }
}

type NodeId = usize;
type Field = Vec<f32>;

/// Expression graph node. Arguments always have smaller ids than their
/// users, so ascending id order is a valid evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    /// Constant stored as raw bits so nodes stay hashable.
    Constant(u32),
    Coord(Op),
    Unary(Op, NodeId),
    Binary(Op, NodeId, NodeId),
    Mix { step: usize, a: NodeId, b: NodeId },
    Sprinkle { step: usize, a: NodeId },
    Hwb(NodeId, NodeId, NodeId),
    /// Green or blue output (1 or 2) of an `Hwb` node.
    Part(NodeId, usize),
}

impl Node {
    fn for_each_arg(&self, mut f: impl FnMut(NodeId)) {
        match *self {
            Node::Constant(_) | Node::Coord(_) => {}
            Node::Unary(_, a) | Node::Sprinkle { a, .. } | Node::Part(a, _) => f(a),
            Node::Binary(_, a, b) | Node::Mix { a, b, .. } => {
                f(a);
                f(b);
            }
            Node::Hwb(a, b, c) => {
                f(a);
                f(b);
                f(c);
            }
        }
    }
}

/// Hash-consed expression graph plus the RGB roots of the final stack top.
struct Compiled {
    nodes: Vec<Node>,
    interned: HashMap<Node, NodeId>,
    roots: [NodeId; 3],
}

#[inline]
fn bump(ptr: usize, increment: isize) -> usize {
    (ptr as isize + increment).rem_euclid(STACK_LIMIT as isize) as usize
}

impl Compiled {
    fn new(program: &[Instruction]) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            interned: HashMap::new(),
            roots: [0; 3],
        };
        let zero = graph.intern(Node::Constant(0.0f32.to_bits()));
        let mut stack = [[zero; 3]; STACK_LIMIT];
        let mut sp = 0;

        for (step, ins) in program.iter().enumerate() {
            sp = bump(sp, -ins.op.pops());
            let tos = stack[sp];
            let nos = stack[bump(sp, 1)];
            let pos = stack[bump(sp, 2)];

            let result = match ins.op {
                Op::Constant => [graph.intern(Node::Constant(ins.value.to_bits())); 3],
                Op::X | Op::Y => [graph.intern(Node::Coord(ins.op)); 3],
                Op::Sprinkle => [graph.intern(Node::Sprinkle { step, a: tos[0] }); 3],
                Op::Color => [tos[0], nos[1], pos[2]],
                Op::RotColor => [tos[1], tos[2], tos[0]],
                Op::Hwb => {
                    let h = graph.intern(Node::Hwb(tos[0], tos[1], tos[2]));
                    [h, graph.intern(Node::Part(h, 1)), graph.intern(Node::Part(h, 2))]
                }
                Op::Mix => std::array::from_fn(|c| {
                    graph.intern(Node::Mix {
                        step,
                        a: tos[c],
                        b: nos[c],
                    })
                }),
                op if op.pops() == 1 => std::array::from_fn(|c| graph.intern(Node::Unary(op, tos[c]))),
                op => std::array::from_fn(|c| graph.intern(Node::Binary(op, tos[c], nos[c]))),
            };

            stack[sp] = result;
            sp = bump(sp, 1);
        }

        graph.roots = stack[bump(sp, -1)];
        graph
    }

    fn intern(&mut self, node: Node) -> NodeId {
        if let Some(&id) = self.interned.get(&node) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(node);
        self.interned.insert(node, id);
        id
    }

    fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut pending: Vec<NodeId> = self.roots.to_vec();
        while let Some(id) = pending.pop() {
            if seen[id] {
                continue;
            }
            seen[id] = true;
            self.nodes[id].for_each_arg(|arg| pending.push(arg));
        }
        seen
    }

    /// Size of the graph actually contributing to the picture.
    fn reachable_count(&self) -> usize {
        self.reachable().into_iter().filter(|&r| r).count()
    }

    /// Evaluate the root colour over every pixel of `viewport`.
    fn evaluate(&self, viewport: &Viewport) -> [Field; 3] {
        let n = viewport.len();
        let width = viewport.width.max(1);
        let tile = viewport.tile_id;
        let reachable = self.reachable();
        let mut fields: Vec<Option<Field>> = vec![None; self.nodes.len()];
        let mut hwb_parts: HashMap<NodeId, [Field; 2]> = HashMap::new();

        fn arg(fields: &[Option<Field>], id: NodeId) -> &[f32] {
            fields[id].as_deref().unwrap_or_default()
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if !reachable[id] {
                continue;
            }
            let field: Field = match *node {
                Node::Constant(bits) => vec![f32::from_bits(bits); n],
                Node::Coord(op) => (0..n)
                    .into_par_iter()
                    .map(|j| {
                        if op == Op::X {
                            viewport.x_at(j % width)
                        } else {
                            viewport.y_at(j / width)
                        }
                    })
                    .collect(),
                Node::Unary(op, a) => arg(&fields, a).par_iter().map(|&v| op.unary(v)).collect(),
                Node::Binary(op, a, b) => arg(&fields, a)
                    .par_iter()
                    .zip(arg(&fields, b).par_iter())
                    .map(|(&x, &y)| op.binary(x, y))
                    .collect(),
                Node::Mix { step, a, b } => {
                    let (a, b) = (arg(&fields, a), arg(&fields, b));
                    (0..n)
                        .into_par_iter()
                        .map(|j| {
                            if pixel_noise(step, tile, j) & 1 == 0 {
                                a[j]
                            } else {
                                b[j]
                            }
                        })
                        .collect()
                }
                Node::Sprinkle { step, a } => {
                    let a = arg(&fields, a);
                    (0..n)
                        .into_par_iter()
                        .map(|j| {
                            let u = (pixel_noise(step, tile, j) >> 40) as f32 / (1u64 << 24) as f32;
                            if u < a[j] { 1.0 } else { 0.0 }
                        })
                        .collect()
                }
                Node::Hwb(h, w, b) => {
                    let (h, w, b) = (arg(&fields, h), arg(&fields, w), arg(&fields, b));
                    let rgb: Vec<[f32; 3]> = h
                        .par_iter()
                        .zip(w.par_iter())
                        .zip(b.par_iter())
                        .map(|((&h, &w), &b)| hwb_to_rgb(h, w, b))
                        .collect();
                    hwb_parts.insert(
                        id,
                        [
                            rgb.iter().map(|c| c[1]).collect(),
                            rgb.iter().map(|c| c[2]).collect(),
                        ],
                    );
                    rgb.iter().map(|c| c[0]).collect()
                }
                Node::Part(h, k) => hwb_parts
                    .get(&h)
                    .map(|parts| parts[k - 1].clone())
                    .unwrap_or_else(|| vec![0.0; n]),
            };
            fields[id] = Some(field);
        }

        self.roots
            .map(|root| fields[root].clone().unwrap_or_else(|| vec![0.0; n]))
    }
}

/// Deterministic per-pixel noise so that `mix` and `sprinkle` render the
/// same picture every time.
#[inline]
fn pixel_noise(step: usize, tile: u32, pixel: usize) -> u64 {
    let mut z = ((step as u64) << 48) ^ ((tile as u64) << 32) ^ pixel as u64;
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Interpret `(h, w, b)` as hue-whiteness-blackness and convert to RGB.
fn hwb_to_rgb(h: f32, w: f32, b: f32) -> [f32; 3] {
    let mut h = h % 6.0;
    if h < 0.0 {
        h += 6.0;
    }
    let w = w.fract();
    let v = 1.0 - b.fract();
    let sector = h.floor();
    let mut f = h - sector;
    let sector = sector as i32;
    if sector & 1 != 0 {
        f = 1.0 - f;
    }
    let n = w + f * (v - w);
    match sector {
        1 => [n, v, w],
        2 => [w, v, n],
        3 => [w, n, v],
        4 => [n, w, v],
        5 => [v, w, n],
        _ => [v, n, w],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `tail` preceded by enough constants to fill a program.
    fn program_ending_with(tail: &[Instruction]) -> RasterGenome {
        let mut program = vec![Instruction::constant(0.25); GENES - tail.len()];
        program.extend_from_slice(tail);
        RasterGenome::from_program(program).unwrap()
    }

    #[test]
    fn test_shared_subexpressions_count_once() {
        let genome = RasterGenome::from_program(vec![Instruction::op(Op::X); GENES]).unwrap();
        assert_eq!(genome.complexity(), Some(1));
    }

    #[test]
    fn test_binary_op_complexity() {
        let genome = program_ending_with(&[
            Instruction::op(Op::X),
            Instruction::op(Op::Y),
            Instruction::op(Op::Add),
        ]);
        // + node over x and y; the padding constants are unreachable.
        assert_eq!(genome.complexity(), Some(3));
    }

    #[test]
    fn test_hwb_counts_its_parts() {
        let genome = program_ending_with(&[Instruction::op(Op::X), Instruction::op(Op::Hwb)]);
        // hwb, part1, part2 and x.
        assert_eq!(genome.complexity(), Some(4));
    }

    #[test]
    fn test_rotcolor_adds_no_nodes() {
        let genome = program_ending_with(&[
            Instruction::op(Op::X),
            Instruction::op(Op::Sin),
            Instruction::op(Op::RotColor),
        ]);
        assert_eq!(genome.complexity(), Some(2));
    }

    #[test]
    fn test_x_renders_left_to_right_gradient() {
        let genome = program_ending_with(&[Instruction::op(Op::X)]);
        let thumb = genome.render(&Viewport::thumbnail(16, 16));
        let left = thumb.get(0, 8);
        let right = thumb.get(15, 8);
        assert_eq!(left, 0);
        assert!(right >> 16 > 200, "right edge red = {}", right >> 16);
        // Every row is identical for a pure x gradient.
        assert_eq!(thumb.get(15, 0), thumb.get(15, 15));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let mut rng = GenomeRng::new(5);
        let weights = GeneWeights::default().with("mix", 10).with("sprinkle", 10);
        let genome = RasterGenome::random(&mut rng, &weights);
        let vp = Viewport::thumbnail(12, 12);
        assert_eq!(genome.render(&vp), genome.render(&vp));
    }

    #[test]
    fn test_sectors_match_scaled_thumbnail_corner() {
        let genome = program_ending_with(&[
            Instruction::op(Op::X),
            Instruction::op(Op::Y),
            Instruction::op(Op::Mul),
        ]);
        let sector = genome.render(&Viewport::sector(2, 2, 0, 0, 8, 8));
        let whole = genome.render(&Viewport::thumbnail(16, 16));
        // Sector (0, 0) of a 2x2 enlargement is the top-left quarter.
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(sector.get(x, y), whole.get(x, y));
            }
        }
    }

    #[test]
    fn test_hwb_primary_hues() {
        assert_eq!(hwb_to_rgb(0.0, 0.0, 0.0), [1.0, 0.0, 0.0]);
        assert_eq!(hwb_to_rgb(2.0, 0.0, 0.0), [0.0, 1.0, 0.0]);
        assert_eq!(hwb_to_rgb(4.0, 0.0, 0.0), [0.0, 0.0, 1.0]);
        // Negative hues wrap around.
        assert_eq!(hwb_to_rgb(-2.0, 0.0, 0.0), hwb_to_rgb(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_random_genomes_reach_min_complexity() {
        let mut rng = GenomeRng::new(11);
        let weights = GeneWeights::default();
        let complex = (0..200)
            .filter(|_| RasterGenome::random(&mut rng, &weights).complexity() > Some(5))
            .count();
        assert!(complex > 0);
    }

    #[test]
    fn test_mutation_respects_weights() {
        let mut rng = GenomeRng::new(2);
        let weights = GeneWeights::empty().with("sin", 1);
        let mut genome = RasterGenome::random(&mut rng, &weights);
        for _ in 0..20 {
            genome.mutate(&mut rng, &weights);
        }
        assert!(genome.program().iter().all(|ins| ins.op == Op::Sin));
    }

    #[test]
    fn test_text_form() {
        let genome = program_ending_with(&[Instruction::op(Op::X), Instruction::op(Op::Sub)]);
        let text = genome.encode();
        assert!(text.starts_with("39 0.25 "));
        assert!(text.ends_with(" x -"));
        assert_eq!(RasterGenome::decode(&text).unwrap(), genome);
    }

    #[test]
    fn test_decode_rejects_bad_data() {
        assert!(RasterGenome::decode("").is_err());
        assert!(RasterGenome::decode("12 x y").is_err());
        let mut text = program_ending_with(&[]).encode();
        text.push_str(" bogus");
        assert!(RasterGenome::decode(&text).is_err());
        let text = format!("39{}", " wobble".repeat(GENES));
        assert!(matches!(
            RasterGenome::decode(&text),
            Err(BrowseError::Parse { .. })
        ));
    }
}
