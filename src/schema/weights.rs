//! Gene weight table biasing random genome construction.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weights observed to give a good mix of smooth gradients and detail.
const DEFAULT_WEIGHTS: &[(&str, u32)] = &[
    ("constant", 5),
    ("x", 12),
    ("y", 12),
    ("sprinkle", 0),
    ("abs", 1),
    ("atan", 1),
    ("cos", 1),
    ("exp", 1),
    ("floor", 1),
    ("log", 1),
    ("neg", 1),
    ("sign", 1),
    ("sin", 1),
    ("sqrt", 1),
    ("tan", 1),
    ("hwb", 1),
    ("+", 1),
    ("-", 1),
    ("*", 1),
    ("/", 1),
    ("average", 1),
    ("hypot", 1),
    ("max", 1),
    ("min", 1),
    ("mix", 1),
    ("mod", 1),
    ("pow", 1),
    ("and", 1),
    ("or", 1),
    ("xor", 1),
    ("color", 5),
    ("rotcolor", 2),
];

/// Mapping from operator name to a non-negative weight.
///
/// Names the generator does not know are ignored; operators missing from
/// the table weigh zero and are never chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneWeights {
    weights: BTreeMap<String, u32>,
}

impl Default for GeneWeights {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|&(name, weight)| (name.to_string(), weight))
                .collect(),
        }
    }
}

impl GeneWeights {
    /// A table with every weight zero.
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, name: &str, weight: u32) -> Self {
        self.weights.insert(name.to_string(), weight);
        self
    }

    /// Weight of `name`, zero if absent.
    #[inline]
    pub fn get(&self, name: &str) -> u32 {
        self.weights.get(name).copied().unwrap_or(0)
    }

    /// Sum of all weights.
    pub fn total(&self) -> u64 {
        self.weights.values().map(|&w| w as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.weights.iter().map(|(name, &w)| (name.as_str(), w))
    }

    /// Pick an index into `names` with probability proportional to weight.
    ///
    /// Returns `None` when every listed name weighs zero.
    pub fn pick<R: Rng + ?Sized>(&self, names: &[&str], rng: &mut R) -> Option<usize> {
        let sum: u64 = names.iter().map(|name| self.get(name) as u64).sum();
        if sum == 0 {
            return None;
        }
        let mut target = rng.gen_range(0..sum);
        for (i, name) in names.iter().enumerate() {
            let weight = self.get(name) as u64;
            if target < weight {
                return Some(i);
            }
            target -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_table() {
        let weights = GeneWeights::default();
        assert_eq!(weights.get("constant"), 5);
        assert_eq!(weights.get("x"), 12);
        assert_eq!(weights.get("y"), 12);
        assert_eq!(weights.get("sin"), 1);
        assert_eq!(weights.get("xor"), 1);
        assert_eq!(weights.get("color"), 5);
        assert_eq!(weights.get("rotcolor"), 2);
        assert_eq!(weights.get("sprinkle"), 0);
        assert_eq!(weights.get("no-such-op"), 0);
    }

    #[test]
    fn test_pick_skips_zero_weights() {
        let weights = GeneWeights::empty().with("a", 0).with("b", 3);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(weights.pick(&["a", "b"], &mut rng), Some(1));
        }
        assert_eq!(weights.pick(&["a", "missing"], &mut rng), None);
    }

    #[test]
    fn test_pick_is_roughly_proportional() {
        let weights = GeneWeights::empty().with("rare", 1).with("common", 9);
        let mut rng = StdRng::seed_from_u64(42);
        let common = (0..10_000)
            .filter(|_| weights.pick(&["rare", "common"], &mut rng) == Some(1))
            .count();
        assert!((8_500..9_500).contains(&common), "common picked {common} times");
    }

    #[test]
    fn test_json_is_a_plain_map() {
        let weights: GeneWeights = serde_json::from_str(r#"{"x": 4, "sin": 2}"#).unwrap();
        assert_eq!(weights.get("x"), 4);
        assert_eq!(weights.get("sin"), 2);
        assert_eq!(weights.total(), 6);
    }
}
