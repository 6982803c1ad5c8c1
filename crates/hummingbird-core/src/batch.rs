use crate::agent::{Action, Observation};
use crate::arena::{Arena, ArenaError, EpisodeSummary, StepOutcome};
use crate::config::ArenaConfig;
use crate::field::FieldLayout;
use rayon::prelude::*;

/// Independent training arenas stepped in parallel.
///
/// Arena `i` is seeded with `config.seed + i`, so a batch is reproducible
/// regardless of thread scheduling.
pub struct ArenaBatch {
    arenas: Vec<Arena>,
    finished: Vec<EpisodeSummary>,
}

impl ArenaBatch {
    pub fn new(config: &ArenaConfig, layout: &FieldLayout, count: usize) -> Result<Self, ArenaError> {
        let mut arenas = Vec::with_capacity(count);
        for i in 0..count {
            let arena_config = ArenaConfig {
                seed: config.seed.wrapping_add(i as u64),
                ..config.clone()
            };
            let mut arena = Arena::try_new(arena_config, layout)?;
            arena.try_begin_episode()?;
            arenas.push(arena);
        }
        Ok(Self {
            arenas,
            finished: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.arenas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arenas.is_empty()
    }

    pub fn arenas(&self) -> &[Arena] {
        &self.arenas
    }

    pub fn observe_all(&self) -> Vec<Vec<Observation>> {
        self.arenas.iter().map(Arena::observe_all).collect()
    }

    /// Step every arena with its own action set.
    ///
    /// Arenas whose episode ended are summarized and restarted; their
    /// outcome carries the first observations of the new episode with
    /// `done` still set.
    pub fn step(&mut self, actions: &[Vec<Action>]) -> Result<Vec<StepOutcome>, ArenaError> {
        if actions.len() != self.arenas.len() {
            return Err(ArenaError::ActionCountMismatch {
                expected: self.arenas.len(),
                actual: actions.len(),
            });
        }
        let results: Vec<Result<(StepOutcome, Option<EpisodeSummary>), ArenaError>> = self
            .arenas
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(arena, acts)| {
                let mut outcome = arena.try_step(acts)?;
                if !outcome.done {
                    return Ok((outcome, None));
                }
                let summary = arena.episode_summary();
                outcome.observations = arena.try_begin_episode()?;
                Ok((outcome, Some(summary)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            let (outcome, summary) = result?;
            self.finished.extend(summary);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Summaries of episodes finished since the last drain, in arena order
    /// per step.
    pub fn drain_finished(&mut self) -> Vec<EpisodeSummary> {
        std::mem::take(&mut self.finished)
    }
}
