//! Turning input events into browser commands.

use log::{debug, info, warn};

use super::controller::Browser;
use super::driver::Gridding;
use super::mailbox::{Event, InputSource, Mailbox};
use super::population::PREVIEW;
use crate::display::Display;
use crate::error::{BrowseError, Result};
use crate::genome::Genome;
use crate::persist;

/// Keyboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// New random population.
    Fresh,
    /// Show every slot's thumbnail.
    Grid,
    /// Show the preview genome at full scale.
    Big,
    /// Write the grid image to a new file.
    SaveImage,
    SaveState,
    /// Load the state file, then show the grid.
    Restore,
    /// Sample the saved collection into the population, then show the grid.
    LoadRandom,
    /// Add the whole population to the saved collection.
    AppendAll,
    /// Add the preview genome to the saved collection.
    AppendPreview,
    Quit,
    /// Hand control back to the host's command loop.
    CommandLoop,
}

const KEY_TABLE: [(char, Command); 11] = [
    ('f', Command::Fresh),
    ('g', Command::Grid),
    ('b', Command::Big),
    ('i', Command::SaveImage),
    ('s', Command::SaveState),
    ('r', Command::Restore),
    ('v', Command::LoadRandom),
    ('a', Command::AppendAll),
    ('1', Command::AppendPreview),
    ('q', Command::Quit),
    ('!', Command::CommandLoop),
];

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        KEY_TABLE
            .iter()
            .find(|&&(k, _)| k == key)
            .map(|&(_, command)| command)
    }

    pub fn key(self) -> char {
        KEY_TABLE
            .iter()
            .find(|&&(_, command)| command == self)
            .map_or('?', |&(k, _)| k)
    }
}

/// Where the dispatcher is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Not running its loop.
    Idle,
    Reacting,
    /// Terminal.
    Quit,
}

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    CommandLoop,
    InputClosed,
}

/// A browser wired to an input mailbox.
pub struct Session<G, I, D> {
    browser: Browser<G, D>,
    mailbox: Mailbox<I>,
    state: DispatchState,
}

impl<G: Genome, I: InputSource, D: Display> Session<G, I, D> {
    pub fn new(browser: Browser<G, D>, input: I) -> Self {
        Self {
            browser,
            mailbox: Mailbox::new(input),
            state: DispatchState::Idle,
        }
    }

    #[inline]
    pub fn browser(&self) -> &Browser<G, D> {
        &self.browser
    }

    #[inline]
    pub fn browser_mut(&mut self) -> &mut Browser<G, D> {
        &mut self.browser
    }

    #[inline]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    #[inline]
    pub fn mailbox(&self) -> &Mailbox<I> {
        &self.mailbox
    }

    /// React to events until quit, a command-loop request, or the end of
    /// input.
    ///
    /// Each event is removed from the mailbox before it is acted on, so an
    /// event arriving mid-command stays held and is handled next. Errors
    /// from a single command are logged and the loop carries on.
    pub fn run(&mut self) -> Result<SessionExit> {
        if self.state == DispatchState::Quit {
            return Ok(SessionExit::Quit);
        }
        self.state = DispatchState::Reacting;
        loop {
            let event = if self.mailbox.held().is_none() {
                match self.mailbox.wait_for_change() {
                    Ok(event) => event,
                    Err(BrowseError::InputClosed) => {
                        self.state = DispatchState::Idle;
                        return Ok(SessionExit::InputClosed);
                    }
                    Err(e) => return Err(e),
                }
            } else {
                self.mailbox.take()
            };

            let exit = match self.react(event) {
                Ok(exit) => exit,
                Err(e) => {
                    warn!("{event:?} failed: {e}");
                    None
                }
            };
            self.browser.display_mut().show();
            if let Some(exit) = exit {
                return Ok(exit);
            }
        }
    }

    /// Handle one event.
    pub fn react(&mut self, event: Event) -> Result<Option<SessionExit>> {
        match event {
            Event::None => Ok(None),
            Event::Keyboard(key) => match Command::from_key(key) {
                Some(command) => self.execute(command),
                None => {
                    println!("{} ?", key as u32);
                    debug!("Unknown key {key:?}");
                    Ok(None)
                }
            },
            Event::Mouse { x, y } => {
                let index = self
                    .browser
                    .population()
                    .slot_at_pixel(x as usize, y as usize)?;
                let gridding = self.browser.choose(index, &mut self.mailbox)?;
                self.report(gridding);
                Ok(None)
            }
        }
    }

    /// Run one command.
    pub fn execute(&mut self, command: Command) -> Result<Option<SessionExit>> {
        info!("Command {:?} ({})", command, command.key());
        let browser = &mut self.browser;
        let mailbox = &mut self.mailbox;
        let gridding = match command {
            Command::Fresh => browser.fresh(mailbox)?,
            Command::Grid => browser.redisplay(mailbox)?,
            Command::Big => browser.big(mailbox)?,
            Command::SaveImage => {
                let genome = browser.population().genome(PREVIEW)?.encode();
                persist::save_image(
                    &browser.config().image_pattern,
                    browser.display().framebuffer(),
                    &[genome.as_str()],
                )?;
                Gridding::Completed
            }
            Command::SaveState => {
                persist::save_state(&browser.config().state_path, browser.population())?;
                Gridding::Completed
            }
            Command::Restore => {
                let path = browser.config().state_path.clone();
                persist::restore_state(path, browser.population_mut())?;
                browser.redisplay(mailbox)?
            }
            Command::LoadRandom => {
                let path = browser.config().saved_path.clone();
                let (population, rng) = browser.population_and_rng();
                persist::load_random(path, population, rng)?;
                browser.redisplay(mailbox)?
            }
            Command::AppendAll => {
                let population = browser.population();
                persist::append_genomes(
                    &browser.config().saved_path,
                    population.slots().map(|slot| slot.genome()),
                )?;
                Gridding::Completed
            }
            Command::AppendPreview => {
                persist::append_genomes(
                    &browser.config().saved_path,
                    [browser.population().genome(PREVIEW)?],
                )?;
                Gridding::Completed
            }
            Command::Quit => {
                self.state = DispatchState::Quit;
                return Ok(Some(SessionExit::Quit));
            }
            Command::CommandLoop => {
                self.state = DispatchState::Idle;
                return Ok(Some(SessionExit::CommandLoop));
            }
        };
        self.report(gridding);
        Ok(None)
    }

    fn report(&self, gridding: Gridding) {
        if let Gridding::Interrupted { at } = gridding {
            debug!("Stopped at slot {at} for {:?}", self.mailbox.held());
        }
    }
}
