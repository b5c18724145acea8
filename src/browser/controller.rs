//! Whole-grid operations and breeding from a chosen slot.

use log::{debug, info};

use super::acceptance::{AcceptancePolicy, Search, fresh_slot};
use super::driver::{Gridding, gridding};
use super::mailbox::{InputSource, Mailbox};
use super::population::{PREVIEW, Population};
use crate::display::{Display, Viewport};
use crate::error::Result;
use crate::genome::{Genome, GenomeRng};
use crate::schema::BrowserConfig;

/// A population of genomes shown on a display.
pub struct Browser<G, D> {
    config: BrowserConfig,
    population: Population<G>,
    display: D,
    rng: GenomeRng,
}

impl<G: Genome, D: Display> Browser<G, D> {
    /// Validate `config`, seed every slot and paint the grid.
    pub fn new(config: BrowserConfig, display: D) -> Result<Self> {
        config.validate()?;
        let mut rng = GenomeRng::from_seed(config.random_seed);
        let population = Population::from_fn(
            config.cols,
            config.rows,
            config.thumb_width,
            config.thumb_height,
            |_, viewport| {
                fresh_slot(
                    viewport,
                    &config.weights,
                    config.min_complexity,
                    &config.search,
                    &mut rng,
                )
            },
        )?;
        info!(
            "Browsing {} genomes on a {}x{} grid",
            G::KIND,
            config.cols,
            config.rows
        );

        let mut browser = Self {
            config,
            population,
            display,
            rng,
        };
        for index in browser.population.indices() {
            browser.paint(index)?;
        }
        browser.display.show();
        Ok(browser)
    }

    #[inline]
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    #[inline]
    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    /// Direct access for commands that load genomes from elsewhere. Call
    /// [`Browser::redisplay`] afterwards.
    #[inline]
    pub fn population_mut(&mut self) -> &mut Population<G> {
        &mut self.population
    }

    #[inline]
    pub fn display(&self) -> &D {
        &self.display
    }

    #[inline]
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    #[inline]
    pub fn rng(&mut self) -> &mut GenomeRng {
        &mut self.rng
    }

    /// Population and generator together, for commands that need both.
    #[inline]
    pub fn population_and_rng(&mut self) -> (&mut Population<G>, &mut GenomeRng) {
        (&mut self.population, &mut self.rng)
    }

    /// Rule applied when breeding from the preview genome.
    pub fn policy(&self) -> AcceptancePolicy {
        self.population
            .slots()
            .next()
            .map_or(AcceptancePolicy::NoveltyOnly, AcceptancePolicy::for_slot)
    }

    fn paint(&mut self, index: usize) -> Result<()> {
        let slot = self.population.slot(index)?;
        self.display.paint(index, slot.thumbnail())
    }

    /// Replace every slot with a new random genome.
    pub fn fresh<I: InputSource>(&mut self, mailbox: &mut Mailbox<I>) -> Result<Gridding> {
        let Self {
            config,
            population,
            display,
            rng,
            ..
        } = self;
        let range = population.indices();
        gridding(mailbox, range, |index, _| {
            let slot = fresh_slot(
                population.viewport(),
                &config.weights,
                config.min_complexity,
                &config.search,
                rng,
            )?;
            display.paint(index, slot.thumbnail())?;
            population.commit(index, slot)
        })
    }

    /// Paint every slot's thumbnail.
    pub fn redisplay<I: InputSource>(&mut self, mailbox: &mut Mailbox<I>) -> Result<Gridding> {
        let range = self.population.indices();
        gridding(mailbox, range, |index, _| self.paint(index))
    }

    /// Render the preview genome at full scale across the whole grid.
    pub fn big<I: InputSource>(&mut self, mailbox: &mut Mailbox<I>) -> Result<Gridding> {
        let Self {
            config,
            population,
            display,
            ..
        } = self;
        let genome = population.genome(PREVIEW)?;
        gridding(mailbox, population.indices(), |index, _| {
            let (row, col) = population.coords_of(index)?;
            let viewport = Viewport::sector(
                config.cols,
                config.rows,
                col,
                row,
                config.thumb_width,
                config.thumb_height,
            );
            display.paint(index, &genome.render(&viewport))
        })
    }

    /// Breed from the genome at `index`.
    ///
    /// The chosen genome is copied into the preview slot and bred there
    /// until a mutant is accepted. Then every slot after the preview gets
    /// its own accepted mutant of the chosen genome, one slot at a time
    /// under [`gridding`]. Returns how that propagation ended; a search
    /// abandoned for input reports `Interrupted` at the slot it was
    /// filling.
    pub fn choose<I: InputSource>(&mut self, index: usize, mailbox: &mut Mailbox<I>) -> Result<Gridding> {
        self.population.copy(index, PREVIEW)?;
        self.paint(PREVIEW)?;
        self.display.show();
        info!(
            "Breeding from slot {index}, complexity {:?}",
            self.population.complexity(PREVIEW)?
        );

        let Self {
            config,
            population,
            display,
            rng,
        } = self;
        let ancestor = population.slot(PREVIEW)?.clone();
        let policy = AcceptancePolicy::for_slot(&ancestor);

        match policy.search(
            &ancestor,
            population.viewport(),
            &config.weights,
            &config.search,
            rng,
            mailbox,
        )? {
            Search::Accepted { slot, .. } => {
                display.paint(PREVIEW, slot.thumbnail())?;
                population.commit(PREVIEW, slot)?;
                display.show();
            }
            Search::Interrupted { .. } => return Ok(Gridding::Interrupted { at: PREVIEW }),
        }

        let mut abandoned = None;
        let range = PREVIEW + 1..population.len();
        let result = gridding(mailbox, range, |slot_index, mailbox| {
            match policy.search(
                &ancestor,
                population.viewport(),
                &config.weights,
                &config.search,
                rng,
                mailbox,
            )? {
                Search::Accepted { slot, attempts } => {
                    debug!("Slot {slot_index} bred in {attempts} attempts");
                    display.paint(slot_index, slot.thumbnail())?;
                    population.commit(slot_index, slot)
                }
                Search::Interrupted { .. } => {
                    // The held event ends the pass at the next poll.
                    abandoned.get_or_insert(slot_index);
                    Ok(())
                }
            }
        })?;
        Ok(match (result, abandoned) {
            (_, Some(at)) => Gridding::Interrupted { at },
            (result, None) => result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::acceptance::more_complex;
    use crate::browser::mailbox::testing::ScriptedInput;
    use crate::browser::mailbox::{Event, channel};
    use crate::display::Framebuffer;
    use crate::error::BrowseError;
    use crate::genome::testing::Scripted;
    use crate::schema::SearchConfig;

    fn config(cols: usize, rows: usize) -> BrowserConfig {
        BrowserConfig {
            cols,
            rows,
            thumb_width: 4,
            thumb_height: 4,
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn browser(cols: usize, rows: usize) -> Browser<Scripted, Framebuffer> {
        Browser::new(config(cols, rows), Framebuffer::new(cols, rows, 4, 4)).unwrap()
    }

    #[test]
    fn test_new_fills_and_paints_every_slot() {
        let browser = browser(12, 12);
        let population = browser.population();
        assert_eq!(population.len(), 144);
        for (index, slot) in population.slots().enumerate() {
            assert!(slot.complexity().unwrap() > 5);
            assert_eq!(&browser.display().cell(index).unwrap(), slot.thumbnail());
        }
        assert_eq!(browser.policy(), AcceptancePolicy::ComplexityAndNovelty);
    }

    #[test]
    fn test_fresh_replaces_all_slots() {
        let mut browser = browser(12, 12);
        let before: Vec<_> = browser.population().slots().map(|s| s.genome().clone()).collect();
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);

        assert_eq!(browser.fresh(&mut mailbox).unwrap(), Gridding::Completed);
        let population = browser.population();
        assert!(population.slots().all(|s| s.complexity().unwrap() > 5));
        let changed = population
            .slots()
            .zip(&before)
            .filter(|(slot, old)| slot.genome() != *old)
            .count();
        assert!(changed > 100);
    }

    #[test]
    fn test_fresh_stops_on_input() {
        let mut browser = browser(3, 3);
        let before: Vec<_> = browser.population().slots().map(|s| s.genome().clone()).collect();
        let input = ScriptedInput::default().listen_at(2, Event::Keyboard('g'));
        let mut mailbox = Mailbox::new(input);

        assert_eq!(
            browser.fresh(&mut mailbox).unwrap(),
            Gridding::Interrupted { at: 2 }
        );
        for index in 2..9 {
            assert_eq!(browser.population().genome(index).unwrap(), &before[index]);
        }
    }

    #[test]
    fn test_big_tiles_preview_across_grid() {
        let mut browser = browser(3, 2);
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        browser.big(&mut mailbox).unwrap();

        // Scripted genomes tag pixels with the sector's tile id.
        let tag = browser.population().genome(PREVIEW).unwrap().tag;
        for index in 0..6 {
            let cell = browser.display().cell(index).unwrap();
            assert_eq!(cell.get(0, 0), tag ^ (index as u32 + 1));
        }

        browser.redisplay(&mut mailbox).unwrap();
        assert_eq!(
            &browser.display().cell(0).unwrap(),
            browser.population().slot(PREVIEW).unwrap().thumbnail()
        );
    }

    #[test]
    fn test_choose_breeds_whole_population_from_chosen() {
        let mut browser = browser(12, 12);
        browser.population_mut().set(37, Scripted::new(6, 500)).unwrap();
        let original = browser.population().slot(37).unwrap().clone();
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);

        assert_eq!(browser.choose(37, &mut mailbox).unwrap(), Gridding::Completed);
        let population = browser.population();
        for index in [PREVIEW, 1, 37, 143] {
            let slot = population.slot(index).unwrap();
            assert!(more_complex(6, slot.complexity().unwrap()));
            assert_ne!(slot.thumbnail(), original.thumbnail());
            // One mutation away from the chosen genome.
            assert_eq!(slot.genome().tag, 501);
            assert_eq!(&browser.display().cell(index).unwrap(), slot.thumbnail());
        }
    }

    #[test]
    fn test_choose_out_of_range() {
        let mut browser = browser(2, 2);
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        assert!(matches!(
            browser.choose(4, &mut mailbox),
            Err(BrowseError::Index { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_choose_propagation_is_interruptible() {
        let mut browser = browser(3, 3);
        let before: Vec<_> = browser.population().slots().map(|s| s.genome().clone()).collect();
        // Listen 0 is the propagation poll before slot 1, listen 1 before slot 2.
        let input = ScriptedInput::default().listen_at(1, Event::Keyboard('b'));
        let mut mailbox = Mailbox::new(input);

        assert_eq!(
            browser.choose(4, &mut mailbox).unwrap(),
            Gridding::Interrupted { at: 2 }
        );
        assert_ne!(browser.population().genome(1).unwrap(), &before[1]);
        for index in 2..9 {
            assert_eq!(browser.population().genome(index).unwrap(), &before[index]);
        }
        assert_eq!(mailbox.held(), Event::Keyboard('b'));
    }

    #[test]
    fn test_interruptible_choose_abandons_search() {
        let mut config = config(3, 3);
        config.search = SearchConfig {
            max_attempts: None,
            interruptible: true,
        };
        let mut browser: Browser<Scripted, _> =
            Browser::new(config, Framebuffer::new(3, 3, 4, 4)).unwrap();
        let chosen = browser.population().genome(5).unwrap().clone();
        let input = ScriptedInput::default().listen_at(0, Event::Keyboard('q'));
        let mut mailbox = Mailbox::new(input);

        assert_eq!(
            browser.choose(5, &mut mailbox).unwrap(),
            Gridding::Interrupted { at: PREVIEW }
        );
        // The preview still holds the unbred copy.
        assert_eq!(browser.population().genome(PREVIEW).unwrap(), &chosen);
    }
}
