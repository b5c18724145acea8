//! Error type shared by the browser core, genomes and persistence.

use crate::schema::ConfigError;

/// Errors raised while browsing.
///
/// All of them are local to the command that triggered them: population
/// state is only written after a genome has been fully accepted or decoded.
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("Slot index {index} out of range for population of {len}")]
    Index { index: usize, len: usize },

    #[error("Cell (row {row}, col {col}) outside {rows}x{cols} grid")]
    Coords {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Breeding search gave up after {attempts} attempts")]
    SearchExhausted { attempts: u64 },

    #[error("Thumbnail is {actual:?}, display cells are {expected:?}")]
    ThumbnailSize {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Input source closed")]
    InputClosed,

    #[error("Bad genome data on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BrowseError {
    /// Shorthand for a parse error without a known line.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            line: 0,
            message: message.into(),
        }
    }

    /// Attach a 1-based line number to a parse error.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Parse { message, .. } => Self::Parse { line, message },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BrowseError>;
