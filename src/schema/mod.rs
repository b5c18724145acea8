//! Schema module - Configuration types for the evolution browsers.

mod config;
mod weights;

pub use config::*;
pub use weights::*;
