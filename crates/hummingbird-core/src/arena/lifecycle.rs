use super::{Arena, ArenaError};
use crate::agent::{Action, Observation};
use crate::physics;
use crate::spatial::ColliderIndex;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub observations: Vec<Observation>,
    /// Reward earned by each agent during this step; zero without events.
    pub rewards: Vec<f32>,
    /// A training episode reached its step horizon.
    pub done: bool,
}

impl Arena {
    pub fn begin_episode(&mut self) -> Vec<Observation> {
        self.try_begin_episode().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Refill and re-orient the field, then respawn agents one by one so
    /// that each spawn also avoids the agents placed before it.
    pub fn try_begin_episode(&mut self) -> Result<Vec<Observation>, ArenaError> {
        self.field.reset_flowers(&mut self.rng);
        for i in 0..self.agents.len() {
            let placed: Vec<_> = self.agents[..i].iter().map(|a| (a.id(), a.body())).collect();
            let colliders = ColliderIndex::build(&self.field, placed);
            self.agents[i].try_reset_for_episode(&self.field, &colliders, &mut self.rng)?;
        }
        self.episode += 1;
        self.step_index = 0;
        self.episode_rewards.fill(0.0);
        debug!(episode = self.episode, agents = self.agents.len(), "episode started");
        Ok(self.observe_all())
    }

    pub fn step(&mut self, actions: &[Action]) -> StepOutcome {
        self.try_step(actions).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Advance one fixed timestep.
    ///
    /// Target reselection after depletion finishes before observations are
    /// taken, so no agent ever observes an empty flower.
    pub fn try_step(&mut self, actions: &[Action]) -> Result<StepOutcome, ArenaError> {
        if actions.len() != self.agents.len() {
            return Err(ArenaError::ActionCountMismatch {
                expected: self.agents.len(),
                actual: actions.len(),
            });
        }
        let dt = self.config.dt;
        self.step_motion_phase(actions, dt);
        self.step_contact_phase();
        for agent in &mut self.agents {
            agent.refresh_target(&self.field);
        }
        self.step_index = self.step_index.saturating_add(1);

        let rewards: Vec<f32> = self.agents.iter_mut().map(|a| a.take_reward()).collect();
        for (total, r) in self.episode_rewards.iter_mut().zip(&rewards) {
            *total += r;
        }
        let done = self.config.training
            && self.config.max_episode_steps > 0
            && self.step_index >= self.config.max_episode_steps;
        Ok(StepOutcome {
            observations: self.observe_all(),
            rewards,
            done,
        })
    }

    fn step_motion_phase(&mut self, actions: &[Action], dt: f64) {
        for (agent, action) in self.agents.iter_mut().zip(actions) {
            agent.act(action, dt);
            agent.integrate(dt);
        }
    }

    /// Boundary hits fire once on entry; feeding contacts fire every step
    /// the beak stays in a zone.
    fn step_contact_phase(&mut self) {
        for agent in &mut self.agents {
            let touching = agent.confine(&self.bounds);
            if agent.update_boundary_contact(touching) {
                agent.on_boundary_contact();
            }
            if agent.is_frozen() {
                continue;
            }
            let probe = agent.beak_tip();
            let reach = agent.config().body_radius;
            for zone in physics::feeding_contacts(&self.field, &probe, reach) {
                agent.on_feeding_contact(zone, &mut self.field);
            }
        }
    }
}
