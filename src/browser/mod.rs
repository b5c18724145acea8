//! The breed-by-selection core.
//!
//! A [`Population`] of genomes is shown as a grid. The user either issues a
//! keyboard [`Command`] or clicks a cell; a click makes the [`Browser`] breed
//! new genomes from the chosen one, accepting mutants through an
//! [`AcceptancePolicy`]. Long passes over the grid run under [`gridding`],
//! which stops as soon as the [`Mailbox`] holds a new event. The
//! [`Session`] ties input to commands.

mod acceptance;
mod controller;
mod dispatcher;
mod driver;
mod mailbox;
mod population;

pub use acceptance::{AcceptancePolicy, Search, fresh_slot, more_complex};
pub use controller::Browser;
pub use dispatcher::{Command, DispatchState, Session, SessionExit};
pub use driver::{Gridding, gridding};
pub use mailbox::{ChannelInput, Event, EventSender, InputSource, Mailbox, channel};
pub use population::{PREVIEW, Population, Slot};
