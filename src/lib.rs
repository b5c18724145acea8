//! Evo Browse - breed pictures by picking the ones you like.
//!
//! A grid of thumbnails shows a population of evolved genomes. Clicking one
//! breeds a new population of its mutants, each accepted only if it looks
//! different from its parent and, for genomes with a complexity measure, is
//! substantially more complex.
//!
//! # Architecture
//!
//! - `schema`: Configuration types and the gene weight table
//! - `genome`: The genome capability and the raster and turtle kinds
//! - `browser`: Population grid, mailbox, gridding loop, acceptance,
//!   breeding and command dispatch
//! - `display`: Thumbnails, viewports and the grid framebuffer
//! - `persist`: Population files and image output
//!
//! # Example
//!
//! ```rust,no_run
//! use evo_browse::{
//!     browser::{Browser, Session, channel},
//!     display::Framebuffer,
//!     genome::RasterGenome,
//!     schema::BrowserConfig,
//! };
//!
//! let config = BrowserConfig::default();
//! let display = Framebuffer::new(config.cols, config.rows, config.thumb_width, config.thumb_height);
//! let browser: Browser<RasterGenome, _> = Browser::new(config, display)?;
//!
//! let (events, input) = channel();
//! let mut session = Session::new(browser, input);
//! drop(events);
//! session.run()?;
//! # Ok::<(), evo_browse::BrowseError>(())
//! ```

pub mod browser;
pub mod display;
pub mod error;
pub mod genome;
pub mod persist;
pub mod schema;

// Re-export commonly used types
pub use browser::{Browser, Event, Session, SessionExit};
pub use error::{BrowseError, Result};
pub use genome::{Genome, RasterGenome, TurtleGenome};
pub use schema::BrowserConfig;
