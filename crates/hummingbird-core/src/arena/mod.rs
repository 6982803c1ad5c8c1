pub mod lifecycle;
pub mod metrics;
#[cfg(test)]
mod tests;

pub use lifecycle::StepOutcome;
pub use metrics::*;

use crate::agent::{Agent, Observation, PlacementError};
use crate::config::{ArenaConfig, ConfigError};
use crate::field::{FieldError, FieldLayout, FlowerField};
use crate::physics::Bounds;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

/// One flower field plus the agents foraging in it.
pub struct Arena {
    pub(crate) config: ArenaConfig,
    pub(crate) field: FlowerField,
    pub(crate) agents: Vec<Agent>,
    pub(crate) bounds: Bounds,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) episode: usize,
    pub(crate) step_index: usize,
    pub(crate) episode_rewards: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArenaError {
    Config(ConfigError),
    Field(FieldError),
    Placement(PlacementError),
    ActionCountMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::Config(e) => write!(f, "{}", e),
            ArenaError::Field(e) => write!(f, "{}", e),
            ArenaError::Placement(e) => write!(f, "{}", e),
            ArenaError::ActionCountMismatch { expected, actual } => write!(
                f,
                "received {actual} actions for {expected} agents"
            ),
        }
    }
}

impl From<ConfigError> for ArenaError {
    fn from(err: ConfigError) -> Self {
        ArenaError::Config(err)
    }
}

impl From<FieldError> for ArenaError {
    fn from(err: FieldError) -> Self {
        ArenaError::Field(err)
    }
}

impl From<PlacementError> for ArenaError {
    fn from(err: PlacementError) -> Self {
        ArenaError::Placement(err)
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArenaError::Config(e) => Some(e),
            ArenaError::Field(e) => Some(e),
            ArenaError::Placement(e) => Some(e),
            ArenaError::ActionCountMismatch { .. } => None,
        }
    }
}

impl Arena {
    pub fn new(config: ArenaConfig, layout: &FieldLayout) -> Self {
        Self::try_new(config, layout).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build the field and agents. Agents are unplaced until the first
    /// `begin_episode`.
    pub fn try_new(config: ArenaConfig, layout: &FieldLayout) -> Result<Self, ArenaError> {
        config.validate()?;
        let field = FlowerField::try_new(layout)?;
        let agents = (0..config.num_agents)
            .map(|id| Agent::new(id, config.agent.clone(), config.training))
            .collect();
        Ok(Self {
            bounds: Bounds::new(config.bounds_min, config.bounds_max),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            episode_rewards: vec![0.0; config.num_agents],
            config,
            field,
            agents,
            episode: 0,
            step_index: 0,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn field(&self) -> &FlowerField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut FlowerField {
        &mut self.field
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: usize) -> &Agent {
        &self.agents[id]
    }

    pub fn agent_mut(&mut self, id: usize) -> &mut Agent {
        &mut self.agents[id]
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Episodes started so far, counting the current one.
    pub fn episode(&self) -> usize {
        self.episode
    }

    /// Steps taken in the current episode.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn observe_all(&self) -> Vec<Observation> {
        self.agents.iter().map(|a| a.observe(&self.field)).collect()
    }

    pub fn episode_summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            episode: self.episode,
            steps: self.step_index,
            agents: self
                .agents
                .iter()
                .zip(&self.episode_rewards)
                .map(|(a, &reward)| AgentTally {
                    agent: a.id(),
                    nectar: a.nectar_obtained(),
                    reward,
                })
                .collect(),
            flowers_depleted: self.field.depleted_count(),
            flowers_total: self.field.len(),
        }
    }
}
