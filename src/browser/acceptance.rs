//! Deciding whether a mutant may replace its ancestor, and the retry loop
//! that keeps mutating until one does.

use log::{debug, trace};

use super::mailbox::{InputSource, Mailbox};
use super::population::Slot;
use crate::display::Viewport;
use crate::error::{BrowseError, Result};
use crate::genome::{Genome, GenomeRng};
use crate::schema::{GeneWeights, SearchConfig};

/// Whether `candidate` is at least half again as complex as `base`.
#[inline]
pub fn more_complex(base: u32, candidate: u32) -> bool {
    2 * u64::from(base) < 3 * u64::from(candidate)
}

/// Acceptance rule for bred genomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptancePolicy {
    /// The mutant must be more complex by the 3:2 ratio and look different.
    ComplexityAndNovelty,
    /// The mutant only has to look different.
    NoveltyOnly,
}

/// Result of a breeding search that did not fail.
#[derive(Debug, Clone)]
pub enum Search<G> {
    Accepted { slot: Slot<G>, attempts: u64 },
    /// Input arrived before a mutant was accepted.
    Interrupted { attempts: u64 },
}

impl AcceptancePolicy {
    /// The rule that fits genomes like `sample`: complexity-aware when the
    /// kind reports a complexity.
    pub fn for_slot<G: Genome>(sample: &Slot<G>) -> Self {
        match sample.complexity() {
            Some(_) => AcceptancePolicy::ComplexityAndNovelty,
            None => AcceptancePolicy::NoveltyOnly,
        }
    }

    /// The complexity half of the rule. Vacuous when either side is
    /// unmeasured.
    pub fn complex_enough(&self, base: Option<u32>, candidate: Option<u32>) -> bool {
        match (self, base, candidate) {
            (AcceptancePolicy::NoveltyOnly, _, _) => true,
            (AcceptancePolicy::ComplexityAndNovelty, Some(base), Some(candidate)) => {
                more_complex(base, candidate)
            }
            (AcceptancePolicy::ComplexityAndNovelty, _, _) => true,
        }
    }

    /// Whether `candidate` may replace `ancestor`.
    pub fn accepts<G: Genome>(&self, ancestor: &Slot<G>, candidate: &Slot<G>) -> bool {
        self.complex_enough(ancestor.complexity(), candidate.complexity())
            && ancestor.thumbnail() != candidate.thumbnail()
    }

    /// Mutate copies of `ancestor` until one is accepted.
    ///
    /// Every attempt starts again from the ancestor, which is never
    /// modified. With the default [`SearchConfig`] there is no attempt cap
    /// and pending input is ignored, so the search may run indefinitely.
    pub fn search<G, I>(
        &self,
        ancestor: &Slot<G>,
        viewport: &Viewport,
        weights: &GeneWeights,
        limits: &SearchConfig,
        rng: &mut GenomeRng,
        mailbox: &mut Mailbox<I>,
    ) -> Result<Search<G>>
    where
        G: Genome,
        I: InputSource,
    {
        let mut attempts = 0u64;
        loop {
            if limits.interruptible && !mailbox.poll().is_none() {
                debug!("Breeding abandoned after {attempts} attempts");
                return Ok(Search::Interrupted { attempts });
            }
            if limits.exhausted(attempts) {
                return Err(BrowseError::SearchExhausted { attempts });
            }
            attempts += 1;

            let mut genome = ancestor.genome().clone();
            genome.mutate(rng, weights);

            // Complexity is cheap next to rendering, so it is checked first.
            let complexity = genome.complexity();
            if !self.complex_enough(ancestor.complexity(), complexity) {
                trace!("Attempt {attempts}: complexity {complexity:?} too low");
                continue;
            }
            let thumbnail = genome.render(viewport);
            if &thumbnail == ancestor.thumbnail() {
                trace!("Attempt {attempts}: no visible change");
                continue;
            }

            debug!(
                "Accepted mutant after {attempts} attempts, complexity {:?} -> {:?}",
                ancestor.complexity(),
                complexity
            );
            return Ok(Search::Accepted {
                slot: Slot::from_parts(genome, thumbnail, complexity),
                attempts,
            });
        }
    }
}

/// Generate random genomes until one is complex enough to keep.
///
/// Genomes without a complexity measure are kept at once.
pub fn fresh_slot<G: Genome>(
    viewport: &Viewport,
    weights: &GeneWeights,
    min_complexity: u32,
    limits: &SearchConfig,
    rng: &mut GenomeRng,
) -> Result<Slot<G>> {
    let mut attempts = 0u64;
    loop {
        if limits.exhausted(attempts) {
            return Err(BrowseError::SearchExhausted { attempts });
        }
        attempts += 1;
        let genome = G::random(rng, weights);
        if genome.complexity().is_none_or(|c| c > min_complexity) {
            return Ok(Slot::evaluate(genome, viewport));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mailbox::testing::ScriptedInput;
    use crate::browser::mailbox::{Event, channel};
    use crate::genome::testing::Scripted;

    fn slot(complexity: u32, tag: u32) -> Slot<Scripted> {
        Slot::evaluate(Scripted::new(complexity, tag), &Viewport::thumbnail(2, 2))
    }

    #[test]
    fn test_ratio_examples() {
        assert!(more_complex(6, 9));
        assert!(more_complex(6, 8));
        assert!(more_complex(6, 5));
        assert!(!more_complex(10, 6));
        assert!(!more_complex(6, 4));
        assert!(more_complex(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_accepts_needs_both_tests() {
        let policy = AcceptancePolicy::ComplexityAndNovelty;
        let base = slot(6, 1);
        assert!(policy.accepts(&base, &slot(9, 2)));
        assert!(policy.accepts(&base, &slot(5, 2)));
        // Same look.
        assert!(!policy.accepts(&base, &slot(9, 1)));
        // Not complex enough, however novel.
        assert!(!policy.accepts(&slot(10, 1), &slot(6, 2)));
    }

    #[test]
    fn test_novelty_only_ignores_complexity() {
        let policy = AcceptancePolicy::NoveltyOnly;
        assert!(policy.accepts(&slot(10, 1), &slot(0, 2)));
        assert!(!policy.accepts(&slot(0, 1), &slot(10, 1)));

        let mut unmeasured = Scripted::new(3, 3);
        unmeasured.measured = false;
        let unmeasured = Slot::evaluate(unmeasured, &Viewport::thumbnail(2, 2));
        assert_eq!(
            AcceptancePolicy::for_slot(&unmeasured),
            AcceptancePolicy::NoveltyOnly
        );
        assert_eq!(
            AcceptancePolicy::for_slot(&slot(3, 3)),
            AcceptancePolicy::ComplexityAndNovelty
        );
    }

    #[test]
    fn test_search_accepts_and_leaves_ancestor() {
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        let mut rng = GenomeRng::new(11);
        let ancestor = slot(6, 100);

        let result = AcceptancePolicy::ComplexityAndNovelty
            .search(
                &ancestor,
                &Viewport::thumbnail(2, 2),
                &GeneWeights::default(),
                &SearchConfig::default(),
                &mut rng,
                &mut mailbox,
            )
            .unwrap();
        let Search::Accepted { slot: bred, attempts } = result else {
            panic!("search was not interrupted");
        };
        assert!(attempts >= 1);
        assert!(more_complex(6, bred.complexity().unwrap()));
        assert_ne!(bred.thumbnail(), ancestor.thumbnail());
        assert_eq!(ancestor.genome(), &Scripted::new(6, 100));
        // Attempts restart from the ancestor rather than compounding.
        assert_eq!(bred.genome().tag, 101);
    }

    #[test]
    fn test_search_cap_raises_exhausted() {
        let (_tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        let mut rng = GenomeRng::new(2);
        // Mutants never exceed complexity 5, so 10 can never be beaten.
        let mut stuck = Scripted::new(10, 0);
        stuck.ceiling = 5;
        let ancestor = Slot::evaluate(stuck, &Viewport::thumbnail(2, 2));
        let limits = SearchConfig {
            max_attempts: Some(50),
            interruptible: false,
        };

        let result = AcceptancePolicy::ComplexityAndNovelty.search(
            &ancestor,
            &Viewport::thumbnail(2, 2),
            &GeneWeights::default(),
            &limits,
            &mut rng,
            &mut mailbox,
        );
        assert!(matches!(
            result,
            Err(BrowseError::SearchExhausted { attempts: 50 })
        ));
    }

    #[test]
    fn test_interruptible_search_yields_to_input() {
        let input = ScriptedInput::default().listen_at(3, Event::Keyboard('q'));
        let mut mailbox = Mailbox::new(input);
        let mut rng = GenomeRng::new(2);
        let mut stuck = Scripted::new(10, 0);
        stuck.ceiling = 5;
        let ancestor = Slot::evaluate(stuck, &Viewport::thumbnail(2, 2));
        let limits = SearchConfig {
            max_attempts: None,
            interruptible: true,
        };

        let result = AcceptancePolicy::ComplexityAndNovelty
            .search(
                &ancestor,
                &Viewport::thumbnail(2, 2),
                &GeneWeights::default(),
                &limits,
                &mut rng,
                &mut mailbox,
            )
            .unwrap();
        assert!(matches!(result, Search::Interrupted { attempts: 3 }));
        assert_eq!(mailbox.held(), Event::Keyboard('q'));
    }

    #[test]
    fn test_fresh_slot_meets_minimum() {
        let mut rng = GenomeRng::new(5);
        for _ in 0..50 {
            let fresh: Slot<Scripted> = fresh_slot(
                &Viewport::thumbnail(2, 2),
                &GeneWeights::default(),
                5,
                &SearchConfig::default(),
                &mut rng,
            )
            .unwrap();
            assert!(fresh.complexity().unwrap() > 5);
        }
    }

    #[test]
    fn test_fresh_slot_respects_cap() {
        let mut rng = GenomeRng::new(5);
        let limits = SearchConfig {
            max_attempts: Some(4),
            interruptible: false,
        };
        // Scripted genomes top out at 12.
        let result: Result<Slot<Scripted>> = fresh_slot(
            &Viewport::thumbnail(2, 2),
            &GeneWeights::default(),
            100,
            &limits,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(BrowseError::SearchExhausted { attempts: 4 })
        ));
    }
}
