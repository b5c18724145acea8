//! Configuration types for a browsing session.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::GeneWeights;

/// Minimum complexity a freshly generated genome must exceed.
pub const MIN_COMPLEXITY: u32 = 5;

fn default_min_complexity() -> u32 {
    MIN_COMPLEXITY
}

fn default_state_path() -> PathBuf {
    PathBuf::from("evo-state")
}

fn default_saved_path() -> PathBuf {
    PathBuf::from("evo-saved")
}

fn default_image_pattern() -> String {
    "evo{}.ppm".to_string()
}

/// Top-level browser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Grid width in thumbnails.
    pub cols: usize,
    /// Grid height in thumbnails.
    pub rows: usize,
    /// Thumbnail width in pixels.
    pub thumb_width: usize,
    /// Thumbnail height in pixels.
    pub thumb_height: usize,
    /// A fresh genome is kept only if its complexity exceeds this.
    #[serde(default = "default_min_complexity")]
    pub min_complexity: u32,
    /// Breeding search limits.
    #[serde(default)]
    pub search: SearchConfig,
    /// Operator weights used when constructing random genomes.
    #[serde(default)]
    pub weights: GeneWeights,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Whole-population snapshot written by `s` and read by `r`.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Append-only genome collection written by `a`/`1` and sampled by `v`.
    #[serde(default = "default_saved_path")]
    pub saved_path: PathBuf,
    /// File name pattern for saved images; `{}` is replaced by a counter.
    #[serde(default = "default_image_pattern")]
    pub image_pattern: String,
    /// If set, the grid is mirrored to this PPM file on every redraw.
    #[serde(default)]
    pub live_image: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 6,
            thumb_width: 128,
            thumb_height: 128,
            min_complexity: MIN_COMPLEXITY,
            search: SearchConfig::default(),
            weights: GeneWeights::default(),
            random_seed: None,
            state_path: default_state_path(),
            saved_path: default_saved_path(),
            image_pattern: default_image_pattern(),
            live_image: None,
        }
    }
}

impl BrowserConfig {
    /// Number of slots in the population, preview slot included.
    #[inline]
    pub fn population_size(&self) -> usize {
        self.cols * self.rows
    }

    /// Full grid width in pixels.
    #[inline]
    pub fn image_width(&self) -> usize {
        self.cols * self.thumb_width
    }

    /// Full grid height in pixels.
    #[inline]
    pub fn image_height(&self) -> usize {
        self.rows * self.thumb_height
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 || self.thumb_width == 0 || self.thumb_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.population_size() < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size()));
        }
        if self.weights.total() == 0 {
            return Err(ConfigError::EmptyWeights);
        }
        if self.search.max_attempts == Some(0) {
            return Err(ConfigError::ZeroAttempts);
        }
        if !self.image_pattern.contains("{}") {
            return Err(ConfigError::ImagePattern(self.image_pattern.clone()));
        }
        Ok(())
    }
}

/// Limits on the mutate-evaluate-accept retry loop.
///
/// The defaults reproduce the classic behaviour: the search neither gives up
/// nor looks at pending input, so a long search delays every command
/// (including quit) until it finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Give up with `SearchExhausted` after this many rejected attempts.
    #[serde(default)]
    pub max_attempts: Option<u64>,
    /// Abandon the search as soon as an input event is pending.
    #[serde(default)]
    pub interruptible: bool,
}

impl SearchConfig {
    /// Whether `attempts` has reached the configured cap.
    #[inline]
    pub fn exhausted(&self, attempts: u64) -> bool {
        self.max_attempts.is_some_and(|cap| attempts >= cap)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid and thumbnail dimensions must be non-zero")]
    InvalidDimensions,
    #[error("Population of {0} slots leaves nothing besides the preview slot")]
    PopulationTooSmall(usize),
    #[error("Gene weight table has no positive weight")]
    EmptyWeights,
    #[error("Search attempt cap must be positive")]
    ZeroAttempts,
    #[error("Image pattern {0:?} has no `{{}}` placeholder")]
    ImagePattern(String),
}
